//! Striped concurrent counter.
//!
//! [`StripedAdder`] spreads increments across a fixed table of padded,
//! lazily-allocated cells so that threads hammering the same logical counter
//! do not contend on one cache line. Reads sum the base counter and every
//! allocated cell; the sum is not atomic, so a concurrent reader may see a
//! partially-applied set of in-flight adds, but no add is ever lost once the
//! writers have completed.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicPtr, AtomicU64, Ordering};

/// Padded to a cache line so adjacent cells never share one.
#[repr(align(128))]
struct CounterCell {
    value: AtomicI64,
}

impl CounterCell {
    fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }
}

static PROBE_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static PROBE: std::cell::Cell<u64> = const { std::cell::Cell::new(0) };
}

/// Returns this thread's bucket-selection probe, assigning one lazily on
/// first use. With `rehash`, the probe is scrambled (xorshift) to move the
/// thread to a different bucket after a CAS collision. A probe is never zero,
/// and xorshift keeps it that way.
fn thread_probe(rehash: bool) -> u64 {
    PROBE.with(|probe| {
        let mut h = probe.get();
        if h == 0 {
            h = PROBE_ALLOCATOR.fetch_add(1, Ordering::Relaxed);
        }
        if rehash {
            h ^= h << 13;
            h ^= h >> 17;
            h ^= h >> 5;
        }
        probe.set(h);
        h
    })
}

/// A concurrent signed 64-bit sum with per-bucket striping.
///
/// The cell table is sized at construction to the next power of two at or
/// above the machine's available parallelism and never grows. Cells are
/// allocated on first use by the bucket's first writer.
pub struct StripedAdder {
    base: AtomicI64,
    busy: AtomicBool,
    cells: Box<[AtomicPtr<CounterCell>]>,
}

impl StripedAdder {
    /// Create an adder with a zero sum.
    pub fn new() -> Self {
        let hint = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let table_size = hint.next_power_of_two();
        let cells = (0..table_size)
            .map(|_| AtomicPtr::new(std::ptr::null_mut()))
            .collect();
        Self {
            base: AtomicI64::new(0),
            busy: AtomicBool::new(false),
            cells,
        }
    }

    /// Add `n` (which may be negative) to the sum.
    pub fn add(&self, n: i64) {
        let mut collided = false;
        let mut h = thread_probe(false);
        let mask = (self.cells.len() - 1) as u64;
        loop {
            let slot = &self.cells[(h & mask) as usize];
            let ptr = slot.load(Ordering::Acquire);
            if ptr.is_null() {
                if !self.is_locked() {
                    let cell = Box::into_raw(Box::new(CounterCell::new(n)));
                    if self.try_lock() {
                        // Re-check under the lock: another thread may have
                        // published a cell here first.
                        let published = if slot.load(Ordering::Acquire).is_null() {
                            slot.store(cell, Ordering::Release);
                            true
                        } else {
                            false
                        };
                        self.unlock();
                        if published {
                            return;
                        }
                    }
                    // Lost the publication race; discard our allocation.
                    drop(unsafe { Box::from_raw(cell) });
                }
                collided = false;
            } else {
                let cell = unsafe { &*ptr };
                let current = cell.value.load(Ordering::Acquire);
                if cell
                    .value
                    .compare_exchange(
                        current,
                        current.wrapping_add(n),
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    return;
                } else if !collided {
                    collided = true;
                    h = thread_probe(true);
                } else {
                    // Still contended after rehashing: take the slow path
                    // against the shared base so the add cannot be lost.
                    let mut base = self.base.load(Ordering::Acquire);
                    loop {
                        match self.base.compare_exchange_weak(
                            base,
                            base.wrapping_add(n),
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        ) {
                            Ok(_) => return,
                            Err(observed) => base = observed,
                        }
                    }
                }
            }
        }
    }

    /// Current sum of the base counter and all allocated cells.
    ///
    /// Not atomic with respect to concurrent `add` calls; the returned value
    /// is exact once all writers have quiesced.
    pub fn value(&self) -> i64 {
        let mut sum = self.base.load(Ordering::Acquire);
        for slot in self.cells.iter() {
            let ptr = slot.load(Ordering::Acquire);
            if !ptr.is_null() {
                sum = sum.wrapping_add(unsafe { (*ptr).value.load(Ordering::Acquire) });
            }
        }
        sum
    }

    fn is_locked(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_lock(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn unlock(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl Default for StripedAdder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StripedAdder {
    fn drop(&mut self) {
        for slot in self.cells.iter() {
            let ptr = slot.load(Ordering::Relaxed);
            if !ptr.is_null() {
                drop(unsafe { Box::from_raw(ptr) });
            }
        }
    }
}

impl std::fmt::Debug for StripedAdder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripedAdder")
            .field("value", &self.value())
            .field("buckets", &self.cells.len())
            .finish()
    }
}
