//! Value distribution histogram.

use crate::adder::StripedAdder;
use crate::reservoir::{ExponentiallyDecayingReservoir, Reservoir};
use crate::snapshot::WeightedSnapshot;

/// A distribution of recorded values.
///
/// Pairs a striped running total with a bounded reservoir. The histogram
/// exclusively owns its reservoir; snapshots it hands out are freestanding
/// values unaffected by later updates.
pub struct Histogram {
    counter: StripedAdder,
    reservoir: Box<dyn Reservoir>,
}

impl Histogram {
    /// Create a histogram over a default exponentially-decaying reservoir.
    pub fn new() -> Self {
        Self::with_reservoir(Box::new(ExponentiallyDecayingReservoir::new()))
    }

    /// Create a histogram over an explicit reservoir.
    pub fn with_reservoir(reservoir: Box<dyn Reservoir>) -> Self {
        Self {
            counter: StripedAdder::new(),
            reservoir,
        }
    }

    /// Record a value: it is added to the running total and offered to the
    /// reservoir.
    pub fn update(&self, n: i64) {
        self.counter.add(n);
        self.reservoir.update(n);
    }

    /// The running total of all recorded values.
    pub fn count(&self) -> i64 {
        self.counter.value()
    }

    /// An immutable view of the current sample distribution.
    pub fn snapshot(&self) -> WeightedSnapshot {
        self.reservoir.snapshot()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
