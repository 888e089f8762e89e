//! Bounded, time-decayed random sampling.
//!
//! [`ExponentiallyDecayingReservoir`] keeps a fixed-capacity, statistically
//! representative sample of a value stream, biased toward recent values by
//! forward decay: each incoming value is assigned a synthetic weight
//! `exp(alpha * seconds_since_origin)` and a priority `weight / u` for a
//! fresh uniform draw `u` in `(0, 1)`. When full, a new sample displaces the
//! minimum-priority resident only if it outranks it.
//!
//! Because weights grow exponentially as the decay origin ages, the reservoir
//! periodically rescales: weights and priority keys are multiplied by
//! `exp(-alpha * elapsed)` and the origin is reset, preserving relative order
//! while keeping the numbers finite.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::Rng;
use tracing::debug;

use crate::clock::{Clock, NANOS_PER_SECOND, default_clock};
use crate::snapshot::{WeightedSample, WeightedSnapshot};

/// Default sample capacity, sized for a 99.9% confidence quantile estimate.
pub const DEFAULT_CAPACITY: usize = 1028;

/// Default decay constant, per second. Heavily favors the last five minutes
/// of data.
pub const DEFAULT_ALPHA: f64 = 0.015;

const RESCALE_PERIOD_NANOS: u64 = 60 * NANOS_PER_SECOND;

/// A bounded sample set that can summarize itself.
pub trait Reservoir: Send + Sync {
    /// Record a value.
    fn update(&self, value: i64);
    /// Number of samples currently retained.
    fn size(&self) -> usize;
    /// An immutable copy of the current sample set.
    fn snapshot(&self) -> WeightedSnapshot;
}

/// Priority keys are f64 but must totally order inside the sample map.
#[derive(Debug, Clone, Copy)]
struct Priority(f64);

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

struct Inner {
    /// Decay origin, nanoseconds.
    start: u64,
    /// Deadline for the next rescale, nanoseconds.
    next_rescale: u64,
    samples: BTreeMap<Priority, WeightedSample>,
}

/// A forward-decay reservoir of bounded size.
///
/// `update`, `size`, and `snapshot` are all safe to call from any thread;
/// mutation is serialized by a single internal mutex, and the critical
/// sections are short and CPU-bound.
pub struct ExponentiallyDecayingReservoir {
    clock: Arc<dyn Clock>,
    capacity: usize,
    alpha: f64,
    /// Total updates since the last rescale; may briefly exceed the retained
    /// sample count, which `size()` caps at capacity.
    count: AtomicU64,
    inner: Mutex<Inner>,
}

impl ExponentiallyDecayingReservoir {
    /// Create a reservoir with the default capacity and alpha.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CAPACITY, DEFAULT_ALPHA)
    }

    /// Create a reservoir with an explicit capacity and decay constant,
    /// using the process default clock.
    pub fn with_config(capacity: usize, alpha: f64) -> Self {
        Self::with_clock(capacity, alpha, default_clock().clone())
    }

    /// Create a reservoir reading time from `clock`.
    pub fn with_clock(capacity: usize, alpha: f64, clock: Arc<dyn Clock>) -> Self {
        let start = clock.tick();
        Self {
            clock,
            capacity,
            alpha,
            count: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                start,
                next_rescale: start + RESCALE_PERIOD_NANOS,
                samples: BTreeMap::new(),
            }),
        }
    }

    /// Rescale in place if the deadline has passed.
    ///
    /// Multiplies every retained weight and priority key by
    /// `exp(-alpha * elapsed)`. If the factor underflows to zero the whole
    /// sample set is stale and is cleared; individual samples whose rescaled
    /// weight underflows are dropped. Resets the decay origin and re-arms the
    /// deadline, then resynchronizes the update count to the retained size.
    fn rescale_if_due(&self, inner: &mut Inner, now: u64) {
        if now < inner.next_rescale {
            return;
        }

        let old_start = inner.start;
        inner.start = now;
        inner.next_rescale = now + RESCALE_PERIOD_NANOS;

        let elapsed_seconds = now.saturating_sub(old_start) as f64 / NANOS_PER_SECOND as f64;
        let factor = (-self.alpha * elapsed_seconds).exp();

        if factor == 0.0 {
            inner.samples.clear();
        } else {
            let retained = std::mem::take(&mut inner.samples);
            for (priority, mut sample) in retained {
                sample.weight *= factor;
                if sample.weight != 0.0 {
                    inner
                        .samples
                        .insert(Priority(priority.0 * factor), sample);
                }
            }
        }

        self.count
            .store(inner.samples.len() as u64, Ordering::Release);
        debug!(
            factor,
            retained = inner.samples.len(),
            "rescaled decaying reservoir"
        );
    }
}

impl Default for ExponentiallyDecayingReservoir {
    fn default() -> Self {
        Self::new()
    }
}

impl Reservoir for ExponentiallyDecayingReservoir {
    fn update(&self, value: i64) {
        let mut inner = self.inner.lock();
        let now = self.clock.tick();
        self.rescale_if_due(&mut inner, now);

        let elapsed_seconds = now.saturating_sub(inner.start) as f64 / NANOS_PER_SECOND as f64;
        let weight = (self.alpha * elapsed_seconds).exp();
        let priority = Priority(weight / uniform_draw());
        let sample = WeightedSample::new(value, weight);

        let new_count = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        if new_count as usize <= self.capacity {
            inner.samples.insert(priority, sample);
        } else if let Some(&smallest) = inner.samples.keys().next() {
            // Evict the minimum-priority resident only when the newcomer
            // outranks it, and only when the newcomer's key was actually
            // fresh. On a priority collision the colliding sample is
            // replaced; nothing else is lost.
            if smallest < priority && inner.samples.insert(priority, sample).is_none() {
                inner.samples.remove(&smallest);
            }
        }
    }

    fn size(&self) -> usize {
        (self.count.load(Ordering::Acquire) as usize).min(self.capacity)
    }

    fn snapshot(&self) -> WeightedSnapshot {
        let mut inner = self.inner.lock();
        let now = self.clock.tick();
        self.rescale_if_due(&mut inner, now);
        WeightedSnapshot::new(inner.samples.values().copied().collect())
    }
}

/// A fresh uniform draw in the open interval `(0, 1)`.
fn uniform_draw() -> f64 {
    let mut rng = rand::rng();
    loop {
        let u: f64 = rng.random();
        if u > 0.0 {
            return u;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_100_of_1000() {
        let reservoir = ExponentiallyDecayingReservoir::with_config(100, 0.99);

        for i in 0..1000 {
            reservoir.update(i);
        }

        assert_eq!(reservoir.size(), 100);

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.size(), 100);

        for value in snapshot.values() {
            assert!((0..1000).contains(&value));
        }
    }

    #[test]
    fn test_underfilled_reservoir_keeps_everything() {
        let reservoir = ExponentiallyDecayingReservoir::with_config(100, 0.015);

        for i in 0..10 {
            reservoir.update(i);
        }

        assert_eq!(reservoir.size(), 10);
        let mut values = reservoir.snapshot().values();
        values.sort_unstable();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_snapshot_is_independent_of_later_updates() {
        let reservoir = ExponentiallyDecayingReservoir::with_config(4, 0.015);
        reservoir.update(1);
        let snapshot = reservoir.snapshot();
        reservoir.update(2);
        reservoir.update(3);
        assert_eq!(snapshot.values(), vec![1]);
    }

    #[test]
    fn test_priority_total_order() {
        let mut map = BTreeMap::new();
        map.insert(Priority(2.0), ());
        map.insert(Priority(0.5), ());
        map.insert(Priority(1.0), ());
        let keys: Vec<f64> = map.keys().map(|p| p.0).collect();
        assert_eq!(keys, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_priority_equality_agrees_with_ordering() {
        // Eq must match Ord's total order, including the signed-zero and
        // NaN cases plain f64 equality gets wrong.
        assert_ne!(Priority(0.0), Priority(-0.0));
        assert_eq!(Priority(f64::NAN).cmp(&Priority(f64::NAN)), std::cmp::Ordering::Equal);
        assert_eq!(Priority(f64::NAN), Priority(f64::NAN));
        assert_eq!(Priority(1.5), Priority(1.5));
    }
}
