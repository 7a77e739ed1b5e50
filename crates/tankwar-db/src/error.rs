//! Error types for session recording and storage.

use tankwar_core::{ComponentKind, EntityId};
use thiserror::Error;

/// Errors that can occur while recording or reading a session.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No sample was ever recorded for this (component, entity) pair.
    #[error("No {component} table recorded for entity {entity}")]
    TableNotFound {
        entity: EntityId,
        component: ComponentKind,
    },

    /// Value does not fit the table's fixed schema.
    #[error("Cannot store a {got} value in a {component} table")]
    SchemaMismatch {
        component: ComponentKind,
        got: ComponentKind,
    },

    /// Recorder settings out of range.
    #[error("Invalid recorder config: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
