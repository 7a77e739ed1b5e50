//! Tankwar DB - Session recording for later replay
//!
//! Provides:
//! - The session recorder: one append-only growth buffer per
//!   (component, entity) pair, plus per-entity metadata
//! - The persistent session store (native_db) the recorder writes through to
//! - Raw table listing and read-back over a stored session

mod error;
mod models;
mod queries;
mod recorder;
mod store;

pub use error::{Error, Result};
pub use models::Metadata;
pub use queries::TableInfo;
pub use recorder::{
    RecorderConfig, Sample, SessionRecorder, TableView, DEFAULT_PERSIST_BATCH_SIZE,
};
pub use store::{SessionStore, DEFAULT_IMAGE_COMPRESSION_LEVEL};
