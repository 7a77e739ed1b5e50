//! In-memory session recorder with optional write-through persistence.

use crate::error::{Error, Result};
use crate::models::Metadata;
use crate::queries::TableInfo;
use crate::store::{SessionStore, DEFAULT_IMAGE_COMPRESSION_LEVEL};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tankwar_core::{ComponentKind, ComponentValue, EntityId};
use tankwar_growth_buffer::{GrowthBuffer, Iter};

/// Samples written to the store per transaction unless configured otherwise.
pub const DEFAULT_PERSIST_BATCH_SIZE: usize = 32;

/// Recorder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Record observations at all.
    pub enabled: bool,
    /// Per-table sample limit; tables wrap once it is reached.
    pub max_capacity: Option<usize>,
    /// Directory for the session file. `None` keeps the session in memory only.
    pub session_dir: Option<PathBuf>,
    /// Session file name inside `session_dir`. Generated when `None`.
    pub file_name: Option<String>,
    /// zstd level for persisted image samples.
    pub image_compression_level: i32,
    /// Samples buffered before they are committed to the store together.
    pub persist_batch_size: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: None,
            session_dir: None,
            file_name: None,
            image_compression_level: DEFAULT_IMAGE_COMPRESSION_LEVEL,
            persist_batch_size: DEFAULT_PERSIST_BATCH_SIZE,
        }
    }
}

impl RecorderConfig {
    /// Reject settings the recorder cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_capacity == Some(0) {
            return Err(Error::InvalidConfig(
                "max_capacity must be at least 1".to_string(),
            ));
        }
        if self.persist_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "persist_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One recorded (timestamp, value) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: u64,
    pub value: ComponentValue,
}

/// Read-only view over the live samples of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    buffer: &'a GrowthBuffer<Sample>,
}

impl<'a> TableView<'a> {
    /// Samples from oldest to newest. Each call starts over.
    pub fn iter(&self) -> Iter<'a, Sample> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn last(&self) -> Option<&'a Sample> {
        self.buffer.last()
    }

    /// Samples ever appended, including ones a bounded table dropped.
    pub fn total_appended(&self) -> u64 {
        self.buffer.total_appended()
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.buffer.to_vec()
    }
}

impl<'a> IntoIterator for TableView<'a> {
    type Item = &'a Sample;
    type IntoIter = Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records every observation sample into per-(component, entity) tables.
///
/// Tables live in growth buffers. When a store is attached each sample is
/// also queued for it and committed in batches; the store keeps the full
/// history even when the in-memory tables are bounded. Pending samples are
/// committed by [`flush`](Self::flush) and on drop.
#[derive(Debug)]
pub struct SessionRecorder {
    tables: HashMap<(ComponentKind, EntityId), GrowthBuffer<Sample>>,
    metadata: HashMap<EntityId, Metadata>,
    store: Option<SessionStore>,
    pending: Vec<(EntityId, ComponentKind, Sample)>,
    persist_batch_size: usize,
    max_capacity: Option<usize>,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
            metadata: HashMap::new(),
            store: None,
            pending: Vec::new(),
            persist_batch_size: DEFAULT_PERSIST_BATCH_SIZE,
            max_capacity: None,
        }
    }
}

impl SessionRecorder {
    /// Unbounded, memory-only recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every table to `max_capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `max_capacity` is `Some(0)`.
    pub fn with_max_capacity(mut self, max_capacity: Option<usize>) -> Self {
        assert_ne!(max_capacity, Some(0), "max_capacity must be at least 1");
        self.max_capacity = max_capacity;
        self
    }

    /// Commit to the store every `size` samples (`1` commits each one).
    pub fn with_persist_batch_size(mut self, size: usize) -> Self {
        self.persist_batch_size = size.max(1);
        self
    }

    /// Persist samples and metadata to `store` as well.
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Build a recorder (and its session file, if configured).
    pub fn from_config(config: &RecorderConfig) -> Result<Self> {
        config.validate()?;
        let recorder = Self::new()
            .with_max_capacity(config.max_capacity)
            .with_persist_batch_size(config.persist_batch_size);
        match &config.session_dir {
            Some(dir) => {
                let store = SessionStore::create_in(dir, config.file_name.as_deref())?
                    .with_image_compression_level(config.image_compression_level);
                Ok(recorder.with_store(store))
            }
            None => Ok(recorder),
        }
    }

    /// Append a sample to the (component, entity) table, creating it on first use.
    ///
    /// The in-memory table is written before the store, so a persistence
    /// error still leaves the sample readable through [`read`](Self::read).
    /// An error from a batch commit means that batch was not persisted.
    pub fn append(
        &mut self,
        entity: EntityId,
        component: ComponentKind,
        value: ComponentValue,
        timestamp: u64,
    ) -> Result<()> {
        if value.kind() != component {
            return Err(Error::SchemaMismatch {
                component,
                got: value.kind(),
            });
        }

        let max_capacity = self.max_capacity;
        let table = self
            .tables
            .entry((component, entity))
            .or_insert_with(|| GrowthBuffer::bounded(max_capacity));

        let sample = Sample { timestamp, value };
        if self.store.is_none() {
            table.push(sample);
            return Ok(());
        }
        table.push(sample.clone());
        self.pending.push((entity, component, sample));
        if self.pending.len() >= self.persist_batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit every pending sample to the store.
    pub fn flush(&mut self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        store.append_samples(
            batch
                .iter()
                .map(|(entity, component, s)| (*entity, *component, s.timestamp, &s.value)),
        )?;
        Ok(())
    }

    /// Samples waiting for the next store commit.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// View the recorded samples of one table.
    pub fn read(&self, entity: EntityId, component: ComponentKind) -> Result<TableView<'_>> {
        self.tables
            .get(&(component, entity))
            .map(|buffer| TableView { buffer })
            .ok_or(Error::TableNotFound { entity, component })
    }

    /// Overwrite a static attribute of an entity.
    pub fn set_metadata(&mut self, entity: EntityId, key: &str, value: ComponentValue) -> Result<()> {
        if let Some(store) = &self.store {
            store.set_metadata(entity, key, &value)?;
        }
        self.metadata
            .entry(entity)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Static attributes of an entity, if any were set.
    pub fn metadata(&self, entity: EntityId) -> Option<&Metadata> {
        self.metadata.get(&entity)
    }

    /// Entities with a table for `component`, sorted.
    pub fn entities_with(&self, component: ComponentKind) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .tables
            .keys()
            .filter(|(kind, _)| *kind == component)
            .map(|(_, entity)| *entity)
            .collect();
        ids.sort();
        ids
    }

    /// Every in-memory table with its live length.
    pub fn tables(&self) -> Vec<TableInfo> {
        let mut infos: Vec<TableInfo> = self
            .tables
            .iter()
            .map(|(&(component, entity), buffer)| TableInfo {
                component,
                entity,
                len: buffer.len() as u64,
            })
            .collect();
        infos.sort_by_key(|info| (info.component, info.entity));
        infos
    }

    /// The attached store, if any.
    pub fn store(&self) -> Option<&SessionStore> {
        self.store.as_ref()
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        let pending = self.pending.len();
        if let Err(e) = self.flush() {
            log::warn!("Failed to persist {} pending samples: {}", pending, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TANK: EntityId = EntityId::new(3, 0);

    fn record_rewards(recorder: &mut SessionRecorder, n: u64) {
        for ts in 0..n {
            recorder
                .append(TANK, ComponentKind::Reward, ComponentValue::Reward(ts as f64), ts)
                .unwrap();
        }
    }

    fn timestamps(view: TableView<'_>) -> Vec<u64> {
        view.iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn test_no_samples_means_no_table() {
        let recorder = SessionRecorder::new();
        assert!(matches!(
            recorder.read(TANK, ComponentKind::Reward),
            Err(Error::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_read_back_in_append_order() {
        // 1 sample, a full capacity step (8) and one past it (9)
        for n in [1u64, 8, 9] {
            let mut recorder = SessionRecorder::new();
            record_rewards(&mut recorder, n);

            let view = recorder.read(TANK, ComponentKind::Reward).unwrap();
            assert_eq!(view.len() as u64, n);
            assert_eq!(timestamps(view), (0..n).collect::<Vec<_>>());
            // Restartable
            assert_eq!(view.iter().count() as u64, n);
            assert_eq!(view.last().map(|s| s.timestamp), Some(n - 1));
        }
    }

    #[test]
    fn test_bounded_table_wraps() {
        let mut recorder = SessionRecorder::new().with_max_capacity(Some(4));
        record_rewards(&mut recorder, 6);

        let view = recorder.read(TANK, ComponentKind::Reward).unwrap();
        assert_eq!(timestamps(view), vec![2, 3, 4, 5]);
        assert_eq!(view.total_appended(), 6);
    }

    #[test]
    fn test_schema_is_fixed_per_component() {
        let mut recorder = SessionRecorder::new();
        let err = recorder
            .append(TANK, ComponentKind::Position, ComponentValue::Rotation(0.1), 0)
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
        assert!(recorder.read(TANK, ComponentKind::Position).is_err());
    }

    #[test]
    fn test_metadata_and_listing() {
        let mut recorder = SessionRecorder::new();
        let turrets = ComponentValue::Turrets(vec![EntityId::new(4, 0)]);
        recorder.set_metadata(TANK, "turrets", turrets.clone()).unwrap();
        assert_eq!(
            recorder.metadata(TANK).and_then(|m| m.get("turrets")),
            Some(&turrets)
        );
        assert!(recorder.tables().is_empty());

        record_rewards(&mut recorder, 2);
        recorder
            .append(TANK, ComponentKind::Rotation, ComponentValue::Rotation(1.0), 7)
            .unwrap();

        assert_eq!(recorder.entities_with(ComponentKind::Reward), vec![TANK]);
        assert!(recorder.entities_with(ComponentKind::Image).is_empty());
        let lens: Vec<u64> = recorder.tables().iter().map(|t| t.len).collect();
        assert_eq!(lens, vec![2, 1]);
    }

    #[test]
    fn test_store_keeps_full_history() {
        let store = SessionStore::in_memory().unwrap();
        let mut recorder = SessionRecorder::new()
            .with_max_capacity(Some(2))
            .with_store(store);
        record_rewards(&mut recorder, 5);
        recorder
            .set_metadata(TANK, "turrets", ComponentValue::Turrets(Vec::new()))
            .unwrap();

        assert_eq!(recorder.read(TANK, ComponentKind::Reward).unwrap().len(), 2);
        recorder.flush().unwrap();
        assert_eq!(recorder.pending(), 0);

        let store = recorder.store().unwrap();
        let stored = store.read_table(TANK, ComponentKind::Reward).unwrap();
        assert_eq!(stored.len(), 5);
        assert_eq!(stored[4], (4, ComponentValue::Reward(4.0)));
        assert!(store.metadata(TANK).unwrap().contains_key("turrets"));
    }

    #[test]
    fn test_store_commits_in_batches() {
        let store = SessionStore::in_memory().unwrap();
        let mut recorder = SessionRecorder::new()
            .with_persist_batch_size(4)
            .with_store(store);

        record_rewards(&mut recorder, 3);
        assert_eq!(recorder.pending(), 3);
        let stored = |r: &SessionRecorder| r.store().unwrap().table_len(TANK, ComponentKind::Reward).unwrap();
        assert_eq!(stored(&recorder), 0);
        // Memory is never behind the store
        assert_eq!(recorder.read(TANK, ComponentKind::Reward).unwrap().len(), 3);

        record_rewards(&mut recorder, 1);
        assert_eq!(recorder.pending(), 0);
        assert_eq!(stored(&recorder), 4);
    }

    #[test]
    fn test_drop_flushes_pending_samples() {
        let dir = std::env::temp_dir().join(format!("tankwar-recorder-test-{}", std::process::id()));
        let config = RecorderConfig {
            session_dir: Some(dir.clone()),
            file_name: Some("drop.db".to_string()),
            ..RecorderConfig::default()
        };
        {
            let mut recorder = SessionRecorder::from_config(&config).unwrap();
            record_rewards(&mut recorder, 5);
            assert_eq!(recorder.pending(), 5);
        }

        let store = SessionStore::open(dir.join("drop.db")).unwrap();
        assert_eq!(store.read_table(TANK, ComponentKind::Reward).unwrap().len(), 5);
        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config: RecorderConfig = ron::from_str("(max_capacity: Some(0))").unwrap();
        assert!(matches!(
            SessionRecorder::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));

        let config = RecorderConfig {
            persist_batch_size: 0,
            ..RecorderConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_ron() {
        let config: RecorderConfig = ron::from_str("(max_capacity: Some(16))").unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_capacity, Some(16));
        assert_eq!(config.image_compression_level, DEFAULT_IMAGE_COMPRESSION_LEVEL);

        let recorder = SessionRecorder::from_config(&config).unwrap();
        assert!(recorder.store().is_none());
    }
}
