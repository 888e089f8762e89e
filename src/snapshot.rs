//! Immutable weighted statistical snapshots.
//!
//! A [`WeightedSnapshot`] is built once from a set of `(value, weight)`
//! samples and never mutated. It answers quantile, mean, and deviation
//! queries against the normalized weight distribution. Snapshots are
//! freestanding values: once a reservoir hands one out, later reservoir
//! mutations cannot affect it.

use thiserror::Error;

/// The requested quantile was NaN or outside `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("quantile {0} must be between 0.0 and 1.0")]
pub struct QuantileError(pub f64);

/// A single sampled value with its forward-decay weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSample {
    /// The recorded value.
    pub value: i64,
    /// The synthetic weight assigned at recording time.
    pub weight: f64,
}

impl WeightedSample {
    /// Create a sample.
    pub fn new(value: i64, weight: f64) -> Self {
        Self { value, weight }
    }
}

#[derive(Debug, Clone, Copy)]
struct Element {
    value: i64,
    norm_weight: f64,
    /// Cumulative normalized weight of all preceding elements. The first
    /// element's boundary is always zero.
    quantile: f64,
}

/// An immutable point-in-time view over weighted samples.
#[derive(Debug, Clone, Default)]
pub struct WeightedSnapshot {
    elements: Vec<Element>,
}

impl WeightedSnapshot {
    /// Build a snapshot from samples, sorting them ascending by value and
    /// precomputing normalized weights and quantile boundaries.
    ///
    /// If the total weight underflows to zero, every normalized weight is
    /// zero rather than NaN.
    pub fn new(mut samples: Vec<WeightedSample>) -> Self {
        samples.sort_by(|a, b| a.value.cmp(&b.value));

        let total_weight: f64 = samples.iter().map(|s| s.weight).sum();
        let zero_weight = total_weight == 0.0;

        let mut elements: Vec<Element> = samples
            .iter()
            .map(|s| Element {
                value: s.value,
                norm_weight: if zero_weight {
                    0.0
                } else {
                    s.weight / total_weight
                },
                quantile: 0.0,
            })
            .collect();

        for ix in 1..elements.len() {
            elements[ix].quantile = elements[ix - 1].quantile + elements[ix - 1].norm_weight;
        }

        Self { elements }
    }

    /// The value at the requested quantile.
    ///
    /// Returns the value whose cumulative weight boundary is at or just
    /// before `quantile`. An empty snapshot yields `0.0`. Out-of-domain
    /// quantiles (including NaN) are an error, never clamped.
    pub fn value(&self, quantile: f64) -> Result<f64, QuantileError> {
        if quantile.is_nan() || !(0.0..=1.0).contains(&quantile) {
            return Err(QuantileError(quantile));
        }

        if self.elements.is_empty() {
            return Ok(0.0);
        }

        // First element whose boundary is not less than the request.
        let found = self.elements.partition_point(|e| e.quantile < quantile);

        if found == 0 {
            // Every boundary exceeds the request; answer with the least value.
            return Ok(self.min() as f64);
        }
        if found == self.elements.len() {
            // Every boundary is below the request; answer with the greatest.
            return Ok(self.max() as f64);
        }

        let ix = if self.elements[found].quantile == quantile {
            found
        } else {
            found - 1
        };
        Ok(self.elements[ix].value as f64)
    }

    /// Number of samples in the snapshot.
    pub fn size(&self) -> usize {
        self.elements.len()
    }

    /// The smallest sampled value, or zero if empty.
    pub fn min(&self) -> i64 {
        self.elements.first().map(|e| e.value).unwrap_or(0)
    }

    /// The largest sampled value, or zero if empty.
    pub fn max(&self) -> i64 {
        self.elements.last().map(|e| e.value).unwrap_or(0)
    }

    /// The weighted mean of the sampled values.
    pub fn mean(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| e.value as f64 * e.norm_weight)
            .sum()
    }

    /// The weighted population standard deviation of the sampled values.
    pub fn std_dev(&self) -> f64 {
        if self.elements.len() <= 1 {
            return 0.0;
        }

        let mean = self.mean();
        let variance: f64 = self
            .elements
            .iter()
            .map(|e| {
                let diff = e.value as f64 - mean;
                e.norm_weight * diff * diff
            })
            .sum();
        variance.sqrt()
    }

    /// The sampled values in ascending order.
    pub fn values(&self) -> Vec<i64> {
        self.elements.iter().map(|e| e.value).collect()
    }

    /// The value at the 50th percentile.
    pub fn median(&self) -> f64 {
        self.value(0.5).unwrap_or_default()
    }

    /// The value at the 75th percentile.
    pub fn p75(&self) -> f64 {
        self.value(0.75).unwrap_or_default()
    }

    /// The value at the 95th percentile.
    pub fn p95(&self) -> f64 {
        self.value(0.95).unwrap_or_default()
    }

    /// The value at the 98th percentile.
    pub fn p98(&self) -> f64 {
        self.value(0.98).unwrap_or_default()
    }

    /// The value at the 99th percentile.
    pub fn p99(&self) -> f64 {
        self.value(0.99).unwrap_or_default()
    }

    /// The value at the 99.9th percentile.
    pub fn p999(&self) -> f64 {
        self.value(0.999).unwrap_or_default()
    }
}
