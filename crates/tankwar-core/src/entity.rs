//! Per-entity records and the shared entity state store

use crate::{ComponentKind, ComponentValue, EntityId, Error, Image, Result, Vec2};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Latest value per component, in first-seen order
pub type ComponentMap = IndexMap<ComponentKind, ComponentValue>;

/// Everything known locally about one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// The entity this record describes
    pub id: EntityId,
    /// Latest component values
    pub components: ComponentMap,
}

impl EntityRecord {
    /// Create an empty record
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            components: ComponentMap::new(),
        }
    }

    /// Get a component value if it was ever recorded
    pub fn get(&self, kind: ComponentKind) -> Option<&ComponentValue> {
        self.components.get(&kind)
    }

    /// Get a component value, failing if it was never recorded
    pub fn component(&self, kind: ComponentKind) -> Result<&ComponentValue> {
        self.get(kind).ok_or(Error::ComponentMissing {
            entity: self.id,
            kind,
        })
    }

    /// Check if the component was ever recorded
    pub fn has(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    /// Merge one sample into the record
    ///
    /// Rewards are added to the accumulated value; every other component
    /// replaces the previous value.
    pub fn apply(&mut self, value: ComponentValue) {
        if let ComponentValue::Reward(delta) = value {
            let total = self.reward() + delta;
            self.components
                .insert(ComponentKind::Reward, ComponentValue::Reward(total));
            return;
        }
        self.components.insert(value.kind(), value);
    }

    /// Accumulated reward, `0.0` when none arrived yet
    pub fn reward(&self) -> f64 {
        self.get(ComponentKind::Reward)
            .and_then(ComponentValue::as_reward)
            .unwrap_or(0.0)
    }

    /// Return the accumulated reward and reset it to zero
    pub fn take_reward(&mut self) -> f64 {
        match self.components.get_mut(&ComponentKind::Reward) {
            Some(ComponentValue::Reward(total)) => std::mem::take(total),
            _ => 0.0,
        }
    }

    pub fn image(&self) -> Option<&Image> {
        self.get(ComponentKind::Image).and_then(ComponentValue::as_image)
    }

    pub fn position(&self) -> Option<Vec2> {
        self.get(ComponentKind::Position)
            .and_then(ComponentValue::as_position)
    }

    pub fn rotation(&self) -> Option<f32> {
        self.get(ComponentKind::Rotation)
            .and_then(ComponentValue::as_rotation)
    }

    /// Turrets mounted on this entity (empty if unknown)
    pub fn turrets(&self) -> &[EntityId] {
        self.get(ComponentKind::Turrets)
            .and_then(ComponentValue::as_turrets)
            .unwrap_or(&[])
    }
}

/// Thread-safe map from entity to its latest known record
///
/// Written by the ingestion loop, read by the caller. Lookups never fail:
/// an unknown entity gets an empty record on first reference. Records are
/// never removed, so the map grows with the number of distinct entities
/// ever seen.
#[derive(Debug, Default)]
pub struct EntityStates {
    records: RwLock<HashMap<EntityId, EntityRecord>>,
}

impl EntityStates {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EntityId, EntityRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EntityId, EntityRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the entity's record, creating an empty one if absent
    pub fn get(&self, id: EntityId) -> EntityRecord {
        if let Some(record) = self.read().get(&id) {
            return record.clone();
        }
        self.write()
            .entry(id)
            .or_insert_with(|| EntityRecord::new(id))
            .clone()
    }

    /// Latest value of one component
    ///
    /// Unlike [`EntityStates::get`] this fails with
    /// [`Error::ComponentMissing`] when no sample was ever recorded, so
    /// "no data yet" can be told apart from an unknown entity.
    pub fn component(&self, id: EntityId, kind: ComponentKind) -> Result<ComponentValue> {
        self.read()
            .get(&id)
            .and_then(|record| record.get(kind))
            .cloned()
            .ok_or(Error::ComponentMissing { entity: id, kind })
    }

    /// Apply one sample using the component's merge policy
    pub fn apply(&self, id: EntityId, value: ComponentValue) {
        self.write()
            .entry(id)
            .or_insert_with(|| EntityRecord::new(id))
            .apply(value);
    }

    /// Return the entity's accumulated reward and reset it to zero
    pub fn pop_reward(&self, id: EntityId) -> f64 {
        self.write()
            .get_mut(&id)
            .map(EntityRecord::take_reward)
            .unwrap_or(0.0)
    }

    /// Check if a record exists for the entity
    pub fn contains(&self, id: EntityId) -> bool {
        self.read().contains_key(&id)
    }

    /// Ids of every entity with a record, sorted
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
