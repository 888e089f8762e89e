//! Name-keyed metric registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::{Clock, default_clock};
use crate::counter::Counter;
use crate::gauge::Gauge;
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::reservoir::{DEFAULT_ALPHA, DEFAULT_CAPACITY, ExponentiallyDecayingReservoir};
use crate::timer::Timer;

#[derive(Default)]
struct Inner {
    gauges: BTreeMap<String, Arc<Gauge>>,
    counters: BTreeMap<String, Arc<Counter>>,
    meters: BTreeMap<String, Arc<Meter>>,
    histograms: BTreeMap<String, Arc<Histogram>>,
    timers: BTreeMap<String, Arc<Timer>>,
}

/// Idempotent get-or-create bookkeeping for named metrics.
///
/// Repeated lookups of the same name return handles to the same shared
/// instance. Metrics created through a registry share its clock. The sorted
/// accessors give reporters a deterministic iteration order.
pub struct Registry {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl Registry {
    /// Create a registry on the process default clock.
    pub fn new() -> Self {
        Self::with_clock(default_clock().clone())
    }

    /// Create a registry whose metrics read time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Get or create the gauge named `name`.
    pub fn gauge(&self, name: &str) -> Arc<Gauge> {
        let mut inner = self.inner.lock();
        inner
            .gauges
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Gauge::new()))
            .clone()
    }

    /// Get or create the counter named `name`.
    pub fn counter(&self, name: &str) -> Arc<Counter> {
        let mut inner = self.inner.lock();
        inner
            .counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Counter::new()))
            .clone()
    }

    /// Get or create the meter named `name`.
    pub fn meter(&self, name: &str) -> Arc<Meter> {
        let mut inner = self.inner.lock();
        inner
            .meters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Meter::with_clock(self.clock.clone())))
            .clone()
    }

    /// Get or create the histogram named `name`, backed by a default
    /// decaying reservoir.
    pub fn histogram(&self, name: &str) -> Arc<Histogram> {
        let mut inner = self.inner.lock();
        inner
            .histograms
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Histogram::with_reservoir(Box::new(
                    ExponentiallyDecayingReservoir::with_clock(
                        DEFAULT_CAPACITY,
                        DEFAULT_ALPHA,
                        self.clock.clone(),
                    ),
                )))
            })
            .clone()
    }

    /// Get or create the timer named `name`.
    pub fn timer(&self, name: &str) -> Arc<Timer> {
        let mut inner = self.inner.lock();
        inner
            .timers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Timer::with_clock(self.clock.clone())))
            .clone()
    }

    /// All gauges, sorted by name.
    pub fn gauges(&self) -> BTreeMap<String, Arc<Gauge>> {
        self.inner.lock().gauges.clone()
    }

    /// All counters, sorted by name.
    pub fn counters(&self) -> BTreeMap<String, Arc<Counter>> {
        self.inner.lock().counters.clone()
    }

    /// All meters, sorted by name.
    pub fn meters(&self) -> BTreeMap<String, Arc<Meter>> {
        self.inner.lock().meters.clone()
    }

    /// All histograms, sorted by name.
    pub fn histograms(&self) -> BTreeMap<String, Arc<Histogram>> {
        self.inner.lock().histograms.clone()
    }

    /// All timers, sorted by name.
    pub fn timers(&self) -> BTreeMap<String, Arc<Timer>> {
        self.inner.lock().timers.clone()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_idempotent() {
        let registry = Registry::new();
        let a = registry.counter("requests");
        let b = registry.counter("requests");
        a.increment();
        assert_eq!(b.count(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_same_name_different_kind_is_distinct() {
        let registry = Registry::new();
        registry.counter("x").add(5);
        assert_eq!(registry.meter("x").count(), 0);
    }

    #[test]
    fn test_accessors_are_sorted_by_name() {
        let registry = Registry::new();
        registry.counter("b");
        registry.counter("a");
        registry.counter("c");
        let counters = registry.counters();
        let names: Vec<&str> = counters.keys().map(|k| k.as_str()).collect();
        // BTreeMap iteration is sorted; reporters depend on this order.
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
