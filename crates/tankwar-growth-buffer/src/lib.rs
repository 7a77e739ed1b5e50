//! Tankwar Growth Buffer - Append-only sample storage with amortized growth
//!
//! This crate provides the backing array for session recorder tables.
//!
//! # Features
//!
//! - **Amortized O(1) append**: capacity doubles (0, 1, 2, 4, ...) when full
//! - **Capacity tracked apart from length**: growth is visible and testable
//! - **Optional bound**: with a maximum capacity the buffer turns into a ring
//!   and overwrites the oldest sample once full
//! - **No garbage**: iteration only ever yields written samples, oldest first
//!
//! # Example
//!
//! ```rust
//! use tankwar_growth_buffer::GrowthBuffer;
//!
//! let mut buffer = GrowthBuffer::new();
//! for tick in 0..5u64 {
//!     buffer.push(tick);
//! }
//! assert_eq!(buffer.len(), 5);
//! assert_eq!(buffer.capacity(), 8);
//! assert_eq!(buffer.to_vec(), vec![0, 1, 2, 3, 4]);
//!
//! // Bounded: keeps the most recent samples
//! let mut ring = GrowthBuffer::with_max_capacity(3);
//! ring.extend([1, 2, 3, 4, 5]);
//! assert_eq!(ring.to_vec(), vec![3, 4, 5]);
//! ```

use std::iter::FusedIterator;
use std::slice;

/// Growth factor applied when the buffer is full
const GROWTH_FACTOR: usize = 2;

/// An append-only buffer that doubles its capacity when full
///
/// `slots` only ever holds written values. `capacity` is the logical
/// capacity the buffer has grown to; the allocation behind `slots` is
/// reserved to match it on every growth step.
#[derive(Debug, Clone)]
pub struct GrowthBuffer<T> {
    /// Written values. Once wrapped, `slots[head]` is the oldest.
    slots: Vec<T>,
    /// Logical capacity
    capacity: usize,
    /// Index of the oldest value (non-zero only after wrapping)
    head: usize,
    /// Upper bound on capacity, `None` for unbounded
    max_capacity: Option<usize>,
    /// Number of values ever appended, including overwritten ones
    total_appended: u64,
}

impl<T> GrowthBuffer<T> {
    /// Create an empty, unbounded buffer
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            capacity: 0,
            head: 0,
            max_capacity: None,
            total_appended: 0,
        }
    }

    /// Create an empty buffer that wraps once it holds `max_capacity` values
    ///
    /// # Panics
    ///
    /// Panics if `max_capacity` is zero.
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        assert!(max_capacity > 0, "Max capacity must be greater than 0");
        Self {
            max_capacity: Some(max_capacity),
            ..Self::new()
        }
    }

    /// Create a buffer from an optional bound, `None` meaning unbounded
    pub fn bounded(max_capacity: Option<usize>) -> Self {
        match max_capacity {
            Some(max) => Self::with_max_capacity(max),
            None => Self::new(),
        }
    }

    /// Append a value
    ///
    /// Grows the buffer when full. A bounded buffer at its maximum capacity
    /// overwrites the oldest value instead.
    pub fn push(&mut self, value: T) {
        self.total_appended += 1;

        if self.slots.len() == self.capacity {
            if self.at_max_capacity() {
                self.slots[self.head] = value;
                self.head = (self.head + 1) % self.capacity;
                return;
            }
            self.grow();
        }

        self.slots.push(value);
    }

    /// Double the capacity, copying the written values into a new allocation
    fn grow(&mut self) {
        let mut new_capacity = (self.capacity * GROWTH_FACTOR).max(1);
        if let Some(max) = self.max_capacity {
            new_capacity = new_capacity.min(max);
        }

        // Growth only happens before wrapping, so slots are already in order
        debug_assert_eq!(self.head, 0);
        let mut grown = Vec::with_capacity(new_capacity);
        grown.extend(self.slots.drain(..));

        self.slots = grown;
        self.capacity = new_capacity;
    }

    fn at_max_capacity(&self) -> bool {
        self.max_capacity
            .is_some_and(|max| self.capacity >= max && self.capacity > 0)
    }

    /// Number of readable values
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing was appended yet
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current logical capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configured bound, if any
    pub fn max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    /// Number of values ever appended, including overwritten ones
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Whether old values have been overwritten
    pub fn is_wrapped(&self) -> bool {
        self.total_appended > self.slots.len() as u64
    }

    /// Value at logical position `index` (0 is the oldest readable value)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.slots.len() {
            return None;
        }
        let physical = (self.head + index) % self.slots.len();
        self.slots.get(physical)
    }

    /// Oldest readable value
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Most recently appended value
    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate over readable values, oldest to newest
    pub fn iter(&self) -> Iter<'_, T> {
        let (newer, older) = self.slots.split_at(self.head);
        Iter {
            older: older.iter(),
            newer: newer.iter(),
        }
    }

    /// Get statistics about the buffer
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            capacity: self.capacity,
            len: self.slots.len(),
            max_capacity: self.max_capacity,
            total_appended: self.total_appended,
        }
    }
}

impl<T: Clone> GrowthBuffer<T> {
    /// Copy the readable values out, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Default for GrowthBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for GrowthBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> FromIterator<T> for GrowthBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut buffer = Self::new();
        buffer.extend(iter);
        buffer
    }
}

impl<'a, T> IntoIterator for &'a GrowthBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`GrowthBuffer`], oldest to newest
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    /// Slots from `head` to the end
    older: slice::Iter<'a, T>,
    /// Slots before `head` (written after wrapping)
    newer: slice::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.older.next().or_else(|| self.newer.next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.older.len() + self.newer.len();
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.newer.next_back().or_else(|| self.older.next_back())
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// Statistics about a growth buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Current logical capacity
    pub capacity: usize,
    /// Readable values
    pub len: usize,
    /// Configured bound
    pub max_capacity: Option<usize>,
    /// Values ever appended
    pub total_appended: u64,
}

impl BufferStats {
    /// Get the fill percentage (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f32 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f32 / self.capacity as f32
        }
    }

    /// Number of values lost to wraparound
    pub fn overwritten(&self) -> u64 {
        self.total_appended - self.len as u64
    }
}
