//! Exponentially-weighted moving average.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::NANOS_PER_SECOND;

/// Nominal interval between [`Ewma::tick`] calls, in seconds.
const TICK_INTERVAL_SECONDS: u64 = 5;

/// Nominal interval between [`Ewma::tick`] calls, in nanoseconds.
pub(crate) const TICK_INTERVAL_NANOS: u64 = TICK_INTERVAL_SECONDS * NANOS_PER_SECOND;

fn alpha_for_minutes(minutes: f64) -> f64 {
    1.0 - (-(TICK_INTERVAL_SECONDS as f64) / 60.0 / minutes).exp()
}

/// A single exponentially-weighted moving average.
///
/// `update` accumulates pending counts; `tick` folds them into the decayed
/// rate. The caller is responsible for ticking at the nominal five-second
/// interval; the named constructors' alphas only carry their one-, five-, and
/// fifteen-minute meanings under that cadence. The type does not enforce it.
pub struct Ewma {
    initialized: AtomicBool,
    pending: AtomicI64,
    /// Decayed rate in events per nanosecond, stored as f64 bits.
    rate: AtomicU64,
    alpha: f64,
    interval_nanos: f64,
}

impl Ewma {
    /// Create an average with an explicit smoothing constant and tick
    /// interval.
    pub fn new(alpha: f64, tick_interval: Duration) -> Self {
        Self {
            initialized: AtomicBool::new(false),
            pending: AtomicI64::new(0),
            rate: AtomicU64::new(0f64.to_bits()),
            alpha,
            interval_nanos: tick_interval.as_nanos() as f64,
        }
    }

    /// A one-minute moving average ticked every five seconds.
    pub fn one_minute() -> Self {
        Self::new(
            alpha_for_minutes(1.0),
            Duration::from_secs(TICK_INTERVAL_SECONDS),
        )
    }

    /// A five-minute moving average ticked every five seconds.
    pub fn five_minutes() -> Self {
        Self::new(
            alpha_for_minutes(5.0),
            Duration::from_secs(TICK_INTERVAL_SECONDS),
        )
    }

    /// A fifteen-minute moving average ticked every five seconds.
    pub fn fifteen_minutes() -> Self {
        Self::new(
            alpha_for_minutes(15.0),
            Duration::from_secs(TICK_INTERVAL_SECONDS),
        )
    }

    /// Record `n` events since the last tick.
    pub fn update(&self, n: i64) {
        self.pending.fetch_add(n, Ordering::AcqRel);
    }

    /// Consume the pending count into the decayed rate.
    ///
    /// The first tick seeds the rate directly from the instantaneous rate
    /// with no smoothing; each later tick applies
    /// `rate += alpha * (instant - rate)`.
    pub fn tick(&self) {
        let count = self.pending.swap(0, Ordering::AcqRel);
        let instant_rate = count as f64 / self.interval_nanos;
        if self.initialized.load(Ordering::Acquire) {
            let old_rate = f64::from_bits(self.rate.load(Ordering::Acquire));
            let new_rate = old_rate + self.alpha * (instant_rate - old_rate);
            self.rate.store(new_rate.to_bits(), Ordering::Release);
        } else {
            self.rate.store(instant_rate.to_bits(), Ordering::Release);
            self.initialized.store(true, Ordering::Release);
        }
    }

    /// The decayed rate scaled to events per `period`.
    pub fn rate(&self, period: Duration) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Acquire)) * period.as_nanos() as f64
    }
}
