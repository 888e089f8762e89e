//! Incrementing and decrementing counter.

use crate::adder::StripedAdder;

/// A counter backed by a [`StripedAdder`].
///
/// Cheap to update from many threads at once; reads are approximate while
/// writes are in flight and exact once they quiesce.
#[derive(Debug, Default)]
pub struct Counter {
    adder: StripedAdder,
}

impl Counter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by one.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Decrement by one.
    pub fn decrement(&self) {
        self.add(-1);
    }

    /// Add `n`, which may be negative.
    pub fn add(&self, n: i64) {
        self.adder.add(n);
    }

    /// Current count.
    pub fn count(&self) -> i64 {
        self.adder.value()
    }
}
