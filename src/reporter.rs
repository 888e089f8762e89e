//! Periodic metric reporting.
//!
//! [`WriteReporter`] formats a registry's state as tab-separated
//! `name.field\tvalue` lines into any [`Write`] sink. [`ScheduledReporter`]
//! runs any [`Reporter`] on a fixed interval from a background thread, using
//! only the read-side accessors of the metrics it visits. Dropping the
//! scheduled reporter stops and joins the thread.

use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{info, warn};

use crate::registry::Registry;

/// Emits one report of current metric state.
pub trait Reporter: Send {
    /// Read and emit the current state.
    fn report(&mut self);
}

/// Formats registry state as tab-separated text.
pub struct WriteReporter<W: Write> {
    registry: Arc<Registry>,
    out: W,
}

impl<W: Write> WriteReporter<W> {
    /// Create a reporter writing `registry`'s state into `out`.
    pub fn new(registry: Arc<Registry>, out: W) -> Self {
        Self { registry, out }
    }

    /// Consume the reporter, returning its sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_report(&mut self) -> std::io::Result<()> {
        for (name, counter) in self.registry.counters() {
            writeln!(self.out, "{name}\t{}", counter.count())?;
        }

        for (name, gauge) in self.registry.gauges() {
            writeln!(self.out, "{name}\t{}", gauge.get())?;
        }

        for (name, meter) in self.registry.meters() {
            writeln!(self.out, "{name}.count\t{}", meter.count())?;
            writeln!(self.out, "{name}.mean\t{}", meter.mean_rate())?;
            writeln!(self.out, "{name}.m1\t{}", meter.m1_rate())?;
            writeln!(self.out, "{name}.m5\t{}", meter.m5_rate())?;
            writeln!(self.out, "{name}.m15\t{}", meter.m15_rate())?;
        }

        for (name, histogram) in self.registry.histograms() {
            let snapshot = histogram.snapshot();
            writeln!(self.out, "{name}.count\t{}", histogram.count())?;
            writeln!(self.out, "{name}.p75\t{}", snapshot.p75())?;
            writeln!(self.out, "{name}.p95\t{}", snapshot.p95())?;
            writeln!(self.out, "{name}.p99\t{}", snapshot.p99())?;
        }

        for (name, timer) in self.registry.timers() {
            let snapshot = timer.snapshot();
            writeln!(self.out, "{name}.count\t{}", timer.count())?;
            writeln!(self.out, "{name}.m1\t{}", timer.m1_rate())?;
            writeln!(self.out, "{name}.m5\t{}", timer.m5_rate())?;
            writeln!(self.out, "{name}.m15\t{}", timer.m15_rate())?;
            writeln!(self.out, "{name}.p75\t{}", snapshot.p75())?;
            writeln!(self.out, "{name}.p95\t{}", snapshot.p95())?;
            writeln!(self.out, "{name}.p99\t{}", snapshot.p99())?;
        }

        self.out.flush()
    }
}

impl<W: Write + Send> Reporter for WriteReporter<W> {
    fn report(&mut self) {
        if let Err(err) = self.write_report() {
            warn!(%err, "failed to write metrics report");
        }
    }
}

struct Shared {
    running: Mutex<bool>,
    wakeup: Condvar,
}

/// Drives a [`Reporter`] on a fixed interval from a background thread.
pub struct ScheduledReporter {
    shared: Arc<Shared>,
    interval: Duration,
    reporter: Option<Box<dyn Reporter>>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledReporter {
    /// Create a scheduler that will run `reporter` every `interval` once
    /// started.
    pub fn new(reporter: Box<dyn Reporter>, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                running: Mutex::new(false),
                wakeup: Condvar::new(),
            }),
            interval,
            reporter: Some(reporter),
            handle: None,
        }
    }

    /// Start the reporting thread. Later calls are no-ops.
    pub fn start(&mut self) -> std::io::Result<()> {
        let Some(mut reporter) = self.reporter.take() else {
            return Ok(());
        };

        *self.shared.running.lock() = true;

        let shared = self.shared.clone();
        let interval = self.interval;
        let handle = std::thread::Builder::new()
            .name("tally-reporter".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "scheduled reporter started");
                let mut running = shared.running.lock();
                loop {
                    if !*running {
                        break;
                    }
                    let timed_out = shared.wakeup.wait_for(&mut running, interval).timed_out();
                    if !*running {
                        break;
                    }
                    if timed_out {
                        // Report outside the lock so stop() is never delayed
                        // by a slow sink.
                        drop(running);
                        reporter.report();
                        running = shared.running.lock();
                    }
                }
                info!("scheduled reporter stopped");
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the reporting thread and wait for it to exit.
    pub fn stop(&mut self) {
        *self.shared.running.lock() = false;
        self.shared.wakeup.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ScheduledReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
