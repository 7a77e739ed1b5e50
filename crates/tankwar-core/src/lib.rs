//! Tankwar Core - Shared data model for the tankwar client
//!
//! This crate provides the types every other tankwar crate speaks in:
//! - Generation-tagged entity identifiers (`EntityId`)
//! - Component kinds and their decoded values (`ComponentKind`, `ComponentValue`)
//! - Per-entity records with component merge policy (`EntityRecord`)
//! - The thread-safe, lazily populated entity state store (`EntityStates`)
//!
//! ## Merge policy
//!
//! Every observation sample is applied to a record exactly once. Rewards
//! accumulate, everything else overwrites:
//!
//! ```rust
//! use tankwar_core::{ComponentValue, EntityId, EntityStates};
//!
//! let states = EntityStates::new();
//! let tank = EntityId::new(3, 0);
//!
//! states.apply(tank, ComponentValue::Reward(1.0));
//! states.apply(tank, ComponentValue::Reward(2.5));
//! assert_eq!(states.pop_reward(tank), 3.5);
//! assert_eq!(states.pop_reward(tank), 0.0);
//! ```

mod component;
mod entity;
mod error;
mod identity;

pub use component::{
    ComponentKind, ComponentValue, Controls, Image, TankControls, TurretControls, Vec2,
};
pub use entity::{ComponentMap, EntityRecord, EntityStates};
pub use error::{Error, Result};
pub use identity::EntityId;
