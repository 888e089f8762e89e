//! Instantaneous value gauge.

use std::sync::atomic::{AtomicI64, Ordering};

/// A single settable value, read at report time.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    /// Create a gauge at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current value.
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Current value.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_set_and_get() {
        let gauge = Gauge::new();
        assert_eq!(gauge.get(), 0);
        gauge.set(42);
        assert_eq!(gauge.get(), 42);
        gauge.set(-7);
        assert_eq!(gauge.get(), -7);
    }
}
