//! Throughput meter with one-, five-, and fifteen-minute moving rates.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::trace;

use crate::adder::StripedAdder;
use crate::clock::{Clock, NANOS_PER_SECOND, default_clock};
use crate::ewma::{Ewma, TICK_INTERVAL_NANOS};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Measures the rate of events over time.
///
/// There is no background timer: every `mark` and every rate query first
/// catches the embedded averages up to the current five-second boundary. The
/// thread that wins a compare-and-swap on the stored last-tick timestamp
/// performs the owed ticks; losers simply continue. Ticks are neither
/// duplicated nor lost, though no particular thread is guaranteed to do the
/// catch-up work.
pub struct Meter {
    clock: Arc<dyn Clock>,
    count: StripedAdder,
    start_time: u64,
    last_tick: AtomicU64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl Meter {
    /// Create a meter on the process default clock.
    pub fn new() -> Self {
        Self::with_clock(default_clock().clone())
    }

    /// Create a meter reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start_time = clock.tick();
        Self {
            clock,
            count: StripedAdder::new(),
            start_time,
            last_tick: AtomicU64::new(start_time),
            m1: Ewma::one_minute(),
            m5: Ewma::five_minutes(),
            m15: Ewma::fifteen_minutes(),
        }
    }

    /// Record one event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Record `n` events.
    pub fn mark_n(&self, n: i64) {
        self.tick_if_necessary();
        self.count.add(n);
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    fn tick_if_necessary(&self) {
        let old_tick = self.last_tick.load(Ordering::Acquire);
        let new_tick = self.clock.tick();
        let age = new_tick.saturating_sub(old_tick);
        if age > TICK_INTERVAL_NANOS {
            let interval_start = new_tick - age % TICK_INTERVAL_NANOS;
            if self
                .last_tick
                .compare_exchange(old_tick, interval_start, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let required_ticks = age / TICK_INTERVAL_NANOS;
                trace!(ticks = required_ticks, "advancing meter");
                for _ in 0..required_ticks {
                    self.m1.tick();
                    self.m5.tick();
                    self.m15.tick();
                }
            }
        }
    }

    /// Total events recorded.
    pub fn count(&self) -> i64 {
        self.count.value()
    }

    /// One-minute moving rate, events per second.
    pub fn m1_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m1.rate(ONE_SECOND)
    }

    /// Five-minute moving rate, events per second.
    pub fn m5_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m5.rate(ONE_SECOND)
    }

    /// Fifteen-minute moving rate, events per second.
    pub fn m15_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m15.rate(ONE_SECOND)
    }

    /// Lifetime mean rate, events per second, from meter creation to now.
    /// Not exponentially decayed. Zero until at least one event has been
    /// recorded and some time has elapsed.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }

        let elapsed = self.clock.tick().saturating_sub(self.start_time);
        if elapsed == 0 {
            return 0.0;
        }
        count as f64 / elapsed as f64 * NANOS_PER_SECOND as f64
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_starts_with_zero_rates_and_count() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock);

        assert_eq!(meter.count(), 0);
        assert!(meter.m1_rate().abs() < 0.001);
        assert!(meter.m5_rate().abs() < 0.001);
        assert!(meter.m15_rate().abs() < 0.001);
        assert!(meter.mean_rate().abs() < 0.001);
    }

    #[test]
    fn test_mark_updates_rates_and_counts() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock.clone());

        meter.mark();
        clock.add_seconds(10); // two tick intervals
        meter.mark_n(2);

        assert_eq!(meter.count(), 3);
        assert!((meter.mean_rate() - 0.3).abs() < 0.001);
        assert!((meter.m1_rate() - 0.1840).abs() < 0.001);
        assert!((meter.m5_rate() - 0.1966).abs() < 0.001);
        assert!((meter.m15_rate() - 0.1988).abs() < 0.001);
    }

    #[test]
    fn test_mean_rate_is_finite_before_time_advances() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock);

        // Marks with no elapsed time must not divide by zero.
        meter.mark_n(5);
        assert_eq!(meter.mean_rate(), 0.0);
    }

    #[test]
    fn test_rate_queries_catch_up_without_marks() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock.clone());

        meter.mark_n(3);
        clock.add_seconds(5);
        // First owed tick seeds the one-minute rate at 3 events per 5s.
        clock.add_nanos(1); // strictly past the boundary
        assert!((meter.m1_rate() - 0.6).abs() < 0.001);
    }
}
