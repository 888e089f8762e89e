//! Time sources for rate and decay calculations.
//!
//! Every component that needs a timestamp takes a [`Clock`] handle at
//! construction. Production code uses [`SystemClock`] (usually via
//! [`default_clock`]); tests inject a [`ManualClock`] and advance it
//! explicitly, making decay and rate behavior fully deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds per second.
pub(crate) const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// A source of nanosecond timestamps.
///
/// The epoch is arbitrary but must be consistent for the lifetime of the
/// clock. Timestamps are expected to be non-decreasing.
pub trait Clock: Send + Sync {
    /// Returns the current time in nanoseconds since the clock's epoch.
    fn tick(&self) -> u64;
}

/// Wall-clock time source backed by [`SystemTime`].
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn tick(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Returns the process-wide default clock, constructed on first use.
///
/// Constructors take this (or any other clock) explicitly; nothing in the
/// hot paths reaches for it implicitly.
pub fn default_clock() -> &'static Arc<dyn Clock> {
    static DEFAULT: OnceLock<Arc<dyn Clock>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(SystemClock))
}

/// A clock that only moves when told to.
///
/// Starts at zero. Shared freely across threads; advancing and reading are
/// both lock-free.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `nanos` nanoseconds.
    pub fn add_nanos(&self, nanos: u64) {
        self.now.fetch_add(nanos, Ordering::Release);
    }

    /// Advance the clock by `millis` milliseconds.
    pub fn add_millis(&self, millis: u64) {
        self.add_nanos(millis * 1_000_000);
    }

    /// Advance the clock by `seconds` seconds.
    pub fn add_seconds(&self, seconds: u64) {
        self.add_nanos(seconds * NANOS_PER_SECOND);
    }

    /// Advance the clock by `minutes` minutes.
    pub fn add_minutes(&self, minutes: u64) {
        self.add_seconds(minutes * 60);
    }

    /// Advance the clock by `hours` hours.
    pub fn add_hours(&self, hours: u64) {
        self.add_seconds(hours * 3600);
    }
}

impl Clock for ManualClock {
    fn tick(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.tick(), 0);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        clock.add_nanos(5);
        clock.add_millis(1);
        clock.add_seconds(1);
        clock.add_minutes(1);
        clock.add_hours(1);
        assert_eq!(clock.tick(), 5 + 1_000_000 + (1 + 60 + 3600) * NANOS_PER_SECOND);
    }

    #[test]
    fn test_system_clock_is_non_decreasing() {
        let clock = SystemClock;
        let a = clock.tick();
        let b = clock.tick();
        assert!(b >= a);
    }
}
