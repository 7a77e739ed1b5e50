//! Error types for tankwar-core

use crate::{ComponentKind, EntityId};
use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The entity exists (or was lazily created) but never received this component
    #[error("component `{kind}` has not been recorded for entity {entity}")]
    ComponentMissing { entity: EntityId, kind: ComponentKind },

    #[error("component `{kind}` holds a {got} value")]
    TypeError { kind: ComponentKind, got: &'static str },

    #[error("unknown component kind: {0}")]
    UnknownComponent(String),

    /// Raw RGBA buffer does not match the declared dimensions
    #[error("image buffer holds {got} bytes, expected {expected} for {width}x{height} RGBA")]
    ImageSize {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },

    /// Declared dimensions do not fit in memory
    #[error("image dimensions {width}x{height} are too large")]
    ImageTooLarge { width: u32, height: u32 },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
