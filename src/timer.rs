//! Duration timer: a histogram of elapsed nanoseconds plus a throughput
//! meter.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, default_clock};
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::reservoir::{ExponentiallyDecayingReservoir, Reservoir};
use crate::snapshot::WeightedSnapshot;

/// Measures how often an operation runs and how long it takes.
pub struct Timer {
    clock: Arc<dyn Clock>,
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    /// Create a timer over a default decaying reservoir and the process
    /// default clock.
    pub fn new() -> Self {
        Self::with_clock(default_clock().clone())
    }

    /// Create a timer reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_reservoir(
            Box::new(ExponentiallyDecayingReservoir::with_clock(
                crate::reservoir::DEFAULT_CAPACITY,
                crate::reservoir::DEFAULT_ALPHA,
                clock.clone(),
            )),
            clock,
        )
    }

    /// Create a timer over an explicit reservoir.
    pub fn with_reservoir(reservoir: Box<dyn Reservoir>, clock: Arc<dyn Clock>) -> Self {
        Self {
            histogram: Histogram::with_reservoir(reservoir),
            meter: Meter::with_clock(clock.clone()),
            clock,
        }
    }

    /// Record one timed operation.
    pub fn update(&self, elapsed: Duration) {
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.meter.mark();
        self.histogram.update(nanos);
    }

    /// Time a closure, recording its elapsed duration, and return its
    /// result.
    pub fn time<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = self.start_scope();
        f()
    }

    /// Start a scope guard that records the elapsed duration when dropped.
    pub fn start_scope(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            start: self.clock.tick(),
        }
    }

    /// Number of timed operations.
    pub fn count(&self) -> i64 {
        self.meter.count()
    }

    /// One-minute moving rate of operations per second.
    pub fn m1_rate(&self) -> f64 {
        self.meter.m1_rate()
    }

    /// Five-minute moving rate of operations per second.
    pub fn m5_rate(&self) -> f64 {
        self.meter.m5_rate()
    }

    /// Fifteen-minute moving rate of operations per second.
    pub fn m15_rate(&self) -> f64 {
        self.meter.m15_rate()
    }

    /// Lifetime mean rate of operations per second.
    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    /// An immutable view of the duration distribution, in nanoseconds.
    pub fn snapshot(&self) -> WeightedSnapshot {
        self.histogram.snapshot()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Records the elapsed time between its creation and drop into the owning
/// timer.
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    start: u64,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.timer.clock.tick().saturating_sub(self.start);
        self.timer.update(Duration::from_nanos(elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_update_records_count_and_durations() {
        let clock = Arc::new(ManualClock::new());
        let timer = Timer::with_clock(clock);

        timer.update(Duration::from_millis(10));
        timer.update(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        let snapshot = timer.snapshot();
        assert_eq!(snapshot.min(), 10_000_000);
        assert_eq!(snapshot.max(), 30_000_000);
    }

    #[test]
    fn test_time_closure_returns_result() {
        let clock = Arc::new(ManualClock::new());
        let timer = Timer::with_clock(clock.clone());

        let out = timer.time(|| {
            clock.add_millis(25);
            "done"
        });

        assert_eq!(out, "done");
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.snapshot().max(), 25_000_000);
    }

    #[test]
    fn test_scope_guard_records_on_drop() {
        let clock = Arc::new(ManualClock::new());
        let timer = Timer::with_clock(clock.clone());

        {
            let _guard = timer.start_scope();
            clock.add_seconds(1);
        }

        assert_eq!(timer.count(), 1);
        assert_eq!(timer.snapshot().max(), 1_000_000_000);
    }
}
