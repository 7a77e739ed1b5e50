//! FIFO of assigned-but-unclaimed entities.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tankwar_core::EntityId;

#[derive(Debug, Default)]
struct Inner {
    ids: VecDeque<EntityId>,
    closed: bool,
}

/// Unbounded queue filled by the ingestion loop and drained by `acquire_entity`
///
/// Each pushed id is handed out exactly once. Closing wakes every waiter;
/// ids still queued can be popped after close.
#[derive(Debug, Default)]
pub struct AssignmentQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
}

impl AssignmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, id: EntityId) {
        self.lock().ids.push_back(id);
        self.ready.notify_one();
    }

    /// Pop without waiting
    pub fn try_pop(&self) -> Option<EntityId> {
        self.lock().ids.pop_front()
    }

    /// Pop, waiting up to `timeout` for an id to arrive
    ///
    /// Returns `None` on timeout, or as soon as the queue is closed and empty.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<EntityId> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if let Some(id) = inner.ids.pop_front() {
                return Some(id);
            }
            if inner.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            inner = self
                .ready
                .wait_timeout(inner, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Stop waiting; later waits return immediately once drained
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ids.is_empty()
    }
}
