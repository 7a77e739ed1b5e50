//! Tankwar Client - Drive tanks in a remote battle simulation
//!
//! A [`GameClient`] holds one TCP connection to the simulation. A background
//! ingestion thread applies everything the server sends to local state;
//! callers acquire tanks, send controls and read the latest observations
//! without ever blocking on the network (apart from `acquire_entity`, which
//! waits for a bounded time).
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tankwar_client::{GameClient, ObservationKind, TankControls};
//!
//! let client = GameClient::connect_to("127.0.0.1:7878")?;
//! if let Some(tank) = client.acquire_entity(Duration::from_secs(1))? {
//!     client.subscribe(tank, ObservationKind::Reward, None)?;
//!     client.send_tank_controls(tank, TankControls::new(1.0, 1.0))?;
//!     println!("reward so far: {}", client.pop_reward(tank));
//! }
//! client.close()?;
//! # Ok::<(), tankwar_client::Error>(())
//! ```

mod assignment;
mod client;
mod config;
mod error;
mod ingest;

pub use assignment::AssignmentQueue;
pub use client::GameClient;
pub use config::{ClientConfig, DEFAULT_ADDRESS, DEFAULT_MAX_FRAME_LEN};
pub use error::{Error, Result};
pub use ingest::{LoopExit, LoopState, TURRETS_KEY};

pub use tankwar_core::{
    ComponentKind, ComponentValue, Controls, EntityId, EntityRecord, Image, TankControls,
    TurretControls, Vec2,
};
pub use tankwar_db::{RecorderConfig, Sample, SessionRecorder};
pub use tankwar_netcode::ObservationKind;
