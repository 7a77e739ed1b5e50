//! Error types for tankwar-netcode

use std::io;
use thiserror::Error;

/// Netcode error type
#[derive(Debug, Error)]
pub enum Error {
    /// The peer closed the stream in the middle of (or before) a frame
    #[error("Stream closed by peer while reading {0}")]
    TruncatedStream(&'static str),

    /// Length prefix ran past the widest possible varint
    #[error("Malformed frame length prefix")]
    MalformedLength,

    /// Frame exceeds the caller-configured sanity limit
    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: u64, max: usize },

    /// Underlying I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Message could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Image payload uses an encoding this client cannot decode
    #[error("Unsupported image encoding: {0}")]
    UnsupportedImage(&'static str),

    /// Image payload could not be decoded
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Decoded payload violates a core invariant
    #[error("Invalid payload: {0}")]
    Core(#[from] tankwar_core::Error),

    /// Connection already closed locally
    #[error("Connection closed")]
    Closed,
}

impl Error {
    /// Whether the error means the peer is gone rather than the data is bad
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::TruncatedStream(_) | Error::Closed => true,
            Error::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
