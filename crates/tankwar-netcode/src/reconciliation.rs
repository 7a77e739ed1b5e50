//! Entity lifecycle tracking and server list reconciliation
//!
//! The simulation reports deaths one by one, and periodically sends the full
//! list of live tanks. When the two disagree the list wins: anything we
//! think is alive but the list omits must have died without us hearing
//! about it.

use log::warn;
use std::collections::HashSet;
use tankwar_core::EntityId;

/// Outcome of applying an authoritative entity list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Entities marked dead because the list omitted them
    pub presumed_dead: Vec<EntityId>,
    /// Entities the list introduced
    pub spawned: Vec<EntityId>,
}

impl Reconciliation {
    /// Whether local state already matched the list
    pub fn is_clean(&self) -> bool {
        self.presumed_dead.is_empty() && self.spawned.is_empty()
    }
}

/// Alive, dead and assigned sets for every entity this client has heard of
///
/// Dead is monotonic: once an id lands there it never leaves, even if a
/// later message mentions it again. A reused slot comes back with a new
/// generation, which is a different `EntityId`.
#[derive(Debug, Clone, Default)]
pub struct EntityLifecycle {
    alive: HashSet<EntityId>,
    dead: HashSet<EntityId>,
    assigned: HashSet<EntityId>,
}

impl EntityLifecycle {
    /// Create an empty lifecycle tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an entity alive
    ///
    /// Returns `false` (and changes nothing) if the id is already dead.
    pub fn spawn(&mut self, id: EntityId) -> bool {
        if self.dead.contains(&id) {
            return false;
        }
        self.alive.insert(id);
        true
    }

    /// Move an entity from alive to dead and release it from control
    ///
    /// Returns `true` if the entity was not dead before.
    pub fn kill(&mut self, id: EntityId) -> bool {
        self.alive.remove(&id);
        self.assigned.remove(&id);
        self.dead.insert(id)
    }

    /// Record that this client controls the entity
    ///
    /// Returns `false` for dead ids, which can never be controlled again.
    pub fn assign(&mut self, id: EntityId) -> bool {
        if self.dead.contains(&id) {
            return false;
        }
        self.assigned.insert(id);
        true
    }

    /// Apply an authoritative list of live entities
    ///
    /// The diff against the local alive set is taken before the set is
    /// replaced. Every entity missing from the list gets a synthesized
    /// death and a warning. Listed entities that are already dead stay dead.
    pub fn reconcile(&mut self, listed: impl IntoIterator<Item = EntityId>) -> Reconciliation {
        let listed: HashSet<EntityId> = listed.into_iter().collect();

        let mut missing: Vec<EntityId> = self.alive.difference(&listed).copied().collect();
        missing.sort();

        let mut report = Reconciliation::default();
        for id in missing {
            if self.kill(id) {
                warn!(
                    "Entity {} missing from authoritative list without a death notification; marking it dead",
                    id
                );
                report.presumed_dead.push(id);
            }
        }

        let mut fresh: Vec<EntityId> = listed
            .into_iter()
            .filter(|id| !self.dead.contains(id))
            .filter(|id| self.alive.insert(*id))
            .collect();
        fresh.sort();
        report.spawned = fresh;

        report
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    pub fn is_dead(&self, id: EntityId) -> bool {
        self.dead.contains(&id)
    }

    pub fn is_assigned(&self, id: EntityId) -> bool {
        self.assigned.contains(&id)
    }

    /// Live entities, sorted
    pub fn alive(&self) -> Vec<EntityId> {
        sorted(&self.alive)
    }

    /// Dead entities, sorted
    pub fn dead(&self) -> Vec<EntityId> {
        sorted(&self.dead)
    }

    /// Entities under this client's control, sorted
    pub fn assigned(&self) -> Vec<EntityId> {
        sorted(&self.assigned)
    }
}

fn sorted(set: &HashSet<EntityId>) -> Vec<EntityId> {
    let mut ids: Vec<_> = set.iter().copied().collect();
    ids.sort();
    ids
}
