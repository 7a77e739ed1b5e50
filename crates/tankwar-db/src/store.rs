//! Persistent session store.

use crate::error::{Error, Result};
use crate::models::{sample_key, table_id, Metadata, StoredEntityMeta, StoredSample, StoredTable};
use native_db::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tankwar_core::{ComponentKind, ComponentValue, EntityId};

/// zstd level used for image samples unless configured otherwise.
pub const DEFAULT_IMAGE_COMPRESSION_LEVEL: i32 = 4;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models
        .define::<StoredSample>()
        .expect("StoredSample model definition");
    models
        .define::<StoredTable>()
        .expect("StoredTable model definition");
    models
        .define::<StoredEntityMeta>()
        .expect("StoredEntityMeta model definition");
    models
});

/// Database store for recorded sessions.
pub struct SessionStore {
    pub(crate) db: Database<'static>,
    path: Option<PathBuf>,
    image_compression_level: i32,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.path)
            .field("image_compression_level", &self.image_compression_level)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Open or create a session file at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Builder::new()
            .create(&MODELS, path)
            .map_err(|e| Error::Database(e.to_string()))?;
        log::info!("Opened session store {}", path.display());
        Ok(Self {
            db,
            path: Some(path.to_path_buf()),
            image_compression_level: DEFAULT_IMAGE_COMPRESSION_LEVEL,
        })
    }

    /// Create an in-memory session store.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self {
            db,
            path: None,
            image_compression_level: DEFAULT_IMAGE_COMPRESSION_LEVEL,
        })
    }

    /// Create a session file inside `dir`, creating the directory if needed.
    ///
    /// Without a file name a fresh `session_<local time>.db` name is picked.
    pub fn create_in(dir: impl AsRef<Path>, file_name: Option<&str>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = match file_name {
            Some(name) => dir.join(name),
            None => unique_session_path(dir),
        };
        Self::open(path)
    }

    /// Set the zstd level used for image samples.
    pub fn with_image_compression_level(mut self, level: i32) -> Self {
        self.image_compression_level = level;
        self
    }

    /// Location of the session file, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one sample to the (component, entity) table.
    ///
    /// Returns the sample's sequence number within its table.
    pub fn append_sample(
        &self,
        entity: EntityId,
        component: ComponentKind,
        timestamp: u64,
        value: &ComponentValue,
    ) -> Result<u64> {
        let seqs = self.append_samples([(entity, component, timestamp, value)])?;
        Ok(seqs[0])
    }

    /// Append a batch of samples in a single transaction.
    ///
    /// Either every sample is stored or none is. Returns each sample's
    /// sequence number within its table, in input order.
    pub fn append_samples<'a>(
        &self,
        samples: impl IntoIterator<Item = (EntityId, ComponentKind, u64, &'a ComponentValue)>,
    ) -> Result<Vec<u64>> {
        let mut rows = Vec::new();
        for (entity, component, timestamp, value) in samples {
            if value.kind() != component {
                return Err(Error::SchemaMismatch {
                    component,
                    got: value.kind(),
                });
            }
            let (compressed, bytes) = self.encode_value(value)?;
            rows.push((entity, component, timestamp, compressed, bytes));
        }

        let rw = self.db.rw_transaction()?;
        let mut tables: HashMap<String, StoredTable> = HashMap::new();
        let mut seqs = Vec::with_capacity(rows.len());
        for (entity, component, timestamp, compressed, value) in rows {
            let id = table_id(component, entity);
            let table = match tables.entry(id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let stored: Option<StoredTable> = rw.get().primary(entry.key().clone())?;
                    let len = stored.map(|t| t.len).unwrap_or(0);
                    let id = entry.key().clone();
                    entry.insert(StoredTable {
                        id,
                        component: component.name().to_string(),
                        entity: entity.raw(),
                        len,
                    })
                }
            };
            let seq = table.len;
            rw.insert(StoredSample {
                key: sample_key(&table.id, seq),
                timestamp,
                compressed,
                value,
            })?;
            table.len += 1;
            seqs.push(seq);
        }
        for table in tables.into_values() {
            rw.upsert(table)?;
        }
        rw.commit()?;
        Ok(seqs)
    }

    /// Load every sample of a table in append order.
    pub fn read_table(
        &self,
        entity: EntityId,
        component: ComponentKind,
    ) -> Result<Vec<(u64, ComponentValue)>> {
        let id = table_id(component, entity);
        let r = self.db.r_transaction()?;
        if r.get().primary::<StoredTable>(id.clone())?.is_none() {
            return Err(Error::TableNotFound { entity, component });
        }

        let prefix = format!("{}/", id);
        let scan = r.scan().primary::<StoredSample>()?;
        let iter = scan.start_with(prefix.as_str())?;
        let rows: std::result::Result<Vec<StoredSample>, _> = iter.collect();
        let rows = rows.map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| Ok((row.timestamp, decode_value(&row)?)))
            .collect()
    }

    /// Number of samples in a table, `0` if it does not exist.
    pub fn table_len(&self, entity: EntityId, component: ComponentKind) -> Result<u64> {
        let r = self.db.r_transaction()?;
        let table: Option<StoredTable> = r.get().primary(table_id(component, entity))?;
        Ok(table.map(|t| t.len).unwrap_or(0))
    }

    /// Overwrite one static attribute of an entity.
    pub fn set_metadata(&self, entity: EntityId, key: &str, value: &ComponentValue) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let mut metadata = match rw.get().primary::<StoredEntityMeta>(entity.raw())? {
            Some(stored) => bincode::deserialize::<Metadata>(&stored.attributes)?,
            None => Metadata::new(),
        };
        metadata.insert(key.to_string(), value.clone());
        rw.upsert(StoredEntityMeta {
            entity: entity.raw(),
            attributes: bincode::serialize(&metadata)?,
        })?;
        rw.commit()?;
        Ok(())
    }

    /// Load the static attributes of an entity (empty if none were stored).
    pub fn metadata(&self, entity: EntityId) -> Result<Metadata> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredEntityMeta> = r.get().primary(entity.raw())?;
        match stored {
            Some(stored) => Ok(bincode::deserialize(&stored.attributes)?),
            None => Ok(Metadata::new()),
        }
    }

    fn encode_value(&self, value: &ComponentValue) -> Result<(bool, Vec<u8>)> {
        let bytes = bincode::serialize(value)?;
        if value.kind() == ComponentKind::Image {
            let packed = zstd::bulk::compress(&bytes, self.image_compression_level)?;
            return Ok((true, packed));
        }
        Ok((false, bytes))
    }
}

fn decode_value(row: &StoredSample) -> Result<ComponentValue> {
    if row.compressed {
        let bytes = zstd::stream::decode_all(row.value.as_slice())?;
        return Ok(bincode::deserialize(&bytes)?);
    }
    Ok(bincode::deserialize(&row.value)?)
}

/// Pick a session file name that does not exist yet.
fn unique_session_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let mut path = dir.join(format!("session_{}.db", stamp));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("session_{}_{}.db", stamp, n));
        n += 1;
    }
    path
}

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}
