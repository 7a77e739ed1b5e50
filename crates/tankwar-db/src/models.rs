//! Database models for persistent session storage.
//!
//! Layout:
//! - one `StoredSample` row per observation sample, keyed
//!   `{component}/{entity:016x}/{seq:020}` so a prefix scan over a table
//!   yields its samples in append order
//! - one `StoredTable` row per (component, entity) table with its length
//! - one `StoredEntityMeta` row per entity holding static attributes

use indexmap::IndexMap;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use tankwar_core::{ComponentKind, ComponentValue, EntityId};

/// Static per-entity attributes, overwritten in place.
pub type Metadata = IndexMap<String, ComponentValue>;

/// One timestamped sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredSample {
    /// Primary key - table id plus zero-padded sequence number.
    #[primary_key]
    pub key: String,
    /// Server timestamp of the sample.
    pub timestamp: u64,
    /// Whether `value` is zstd-compressed.
    pub compressed: bool,
    /// Serialized component value.
    pub value: Vec<u8>,
}

/// Table header for one (component, entity) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredTable {
    /// Primary key - `{component}/{entity:016x}`.
    #[primary_key]
    pub id: String,
    /// Component name.
    #[secondary_key]
    pub component: String,
    /// Raw entity id.
    pub entity: u64,
    /// Number of samples appended.
    pub len: u64,
}

/// Static attributes of one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredEntityMeta {
    /// Primary key - raw entity id.
    #[primary_key]
    pub entity: u64,
    /// Serialized `Metadata`.
    pub attributes: Vec<u8>,
}

/// Key of the table for (component, entity).
pub(crate) fn table_id(component: ComponentKind, entity: EntityId) -> String {
    format!("{}/{:016x}", component.name(), entity.raw())
}

/// Key of the `seq`-th sample of a table.
pub(crate) fn sample_key(table_id: &str, seq: u64) -> String {
    format!("{}/{:020}", table_id, seq)
}
