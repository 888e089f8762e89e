//! In-process instrumentation with bounded memory.
//!
//! Application code reports counts, timings, and rates; this crate
//! aggregates them with low per-call overhead and exposes statistical
//! summaries (quantiles, moving rates) for periodic export. It is a library,
//! not a service: embed it, poll it, format it however you like.
//!
//! # Metric types
//!
//! - [`Counter`] / [`Gauge`] - simple totals and instantaneous values
//! - [`Meter`] - throughput with 1/5/15-minute moving rates
//! - [`Histogram`] - value distributions over a decaying reservoir
//! - [`Timer`] - a histogram of durations plus a meter
//!
//! # Architecture
//!
//! ```text
//! +-----------------------------------------------+
//! |                   Registry                    |
//! |        (get-or-create by metric name)         |
//! +-----------------------------------------------+
//!     |         |          |             |
//!     v         v          v             v
//!  Counter    Meter    Histogram       Timer
//!     |         |          |          /      \
//!     v         v          v         v        v
//! StripedAdder Ewma x3  Reservoir  Histogram  Meter
//!                          |
//!                          v
//!                   WeightedSnapshot
//! ```
//!
//! Hot paths are lock-free ([`StripedAdder`], [`Meter`] catch-up ticking) or
//! behind one short mutex ([`ExponentiallyDecayingReservoir`]). Snapshots
//! are immutable values with independent lifetime.
//!
//! # Example
//!
//! ```
//! use tally::Registry;
//! use std::time::Duration;
//!
//! let registry = Registry::new();
//!
//! registry.counter("requests").increment();
//! registry.meter("bytes_in").mark_n(4096);
//! registry.timer("handler").update(Duration::from_millis(7));
//!
//! let snapshot = registry.timer("handler").snapshot();
//! assert_eq!(snapshot.size(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod adder;
mod clock;
mod counter;
mod ewma;
mod gauge;
mod histogram;
mod meter;
mod registry;
mod reporter;
mod reservoir;
mod snapshot;
mod timer;

pub use adder::StripedAdder;
pub use clock::{Clock, ManualClock, SystemClock, default_clock};
pub use counter::Counter;
pub use ewma::Ewma;
pub use gauge::Gauge;
pub use histogram::Histogram;
pub use meter::Meter;
pub use registry::Registry;
pub use reporter::{Reporter, ScheduledReporter, WriteReporter};
pub use reservoir::{
    DEFAULT_ALPHA, DEFAULT_CAPACITY, ExponentiallyDecayingReservoir, Reservoir,
};
pub use snapshot::{QuantileError, WeightedSample, WeightedSnapshot};
pub use timer::{Timer, TimerGuard};
