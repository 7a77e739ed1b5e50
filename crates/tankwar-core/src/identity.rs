//! Generation-tagged entity identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a simulated entity (tank, turret, ball)
///
/// The simulation hands out 64-bit handles laid out as
/// `generation << 32 | index`. Slot indices are reused after an entity dies,
/// with the generation bumped, so two handles are only the same entity when
/// both halves match. Equality and hashing work on the whole value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Build a handle from its slot index and generation
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// Wrap a raw wire value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw wire value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Slot index (low 32 bits)
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation counter (high 32 bits)
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The handle the same slot gets once this entity is gone
    pub const fn next_generation(self) -> Self {
        Self::new(self.index(), self.generation().wrapping_add(1))
    }

    /// Whether both handles refer to the same slot, regardless of generation
    pub const fn same_slot(self, other: EntityId) -> bool {
        self.index() == other.index()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields() {
        let id = EntityId::new(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert_eq!(id.raw(), (3u64 << 32) | 7);
        assert_eq!(EntityId::from_raw(id.raw()), id);
        assert_eq!(format!("{}", id), "7v3");
    }

    #[test]
    fn test_generation_distinguishes_reused_slot() {
        let old = EntityId::new(12, 0);
        let reused = old.next_generation();

        assert_ne!(old, reused);
        assert!(old.same_slot(reused));
        assert_eq!(reused.generation(), 1);
    }

    #[test]
    fn test_generation_wraps() {
        let id = EntityId::new(1, u32::MAX);
        assert_eq!(id.next_generation(), EntityId::new(1, 0));
    }

    #[test]
    fn test_serializes_as_raw_u64() {
        let id = EntityId::new(5, 2);
        let text = ron::to_string(&id).unwrap();
        assert_eq!(text, id.raw().to_string());
        let back: EntityId = ron::from_str(&text).unwrap();
        assert_eq!(back, id);
    }
}
