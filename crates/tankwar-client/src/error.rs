//! Error types for tankwar-client

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tankwar-client
#[derive(Debug, Error)]
pub enum Error {
    /// The ingestion loop has stopped; the connection is unusable
    #[error("client is not running")]
    NotRunning,

    /// Wire or transport error
    #[error("netcode error: {0}")]
    Netcode(#[from] tankwar_netcode::Error),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] tankwar_core::Error),

    /// Session recorder or store error
    #[error("recorder error: {0}")]
    Db(#[from] tankwar_db::Error),

    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ron::error::SpannedError> for Error {
    fn from(err: ron::error::SpannedError) -> Self {
        Error::Config(err.to_string())
    }
}
