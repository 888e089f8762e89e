//! Multi-threaded behavior of the striped adder, meter, and registry.

use std::sync::Arc;
use std::thread;

use tally::{Registry, StripedAdder};

#[test]
fn test_striped_adder_loses_nothing_across_threads() {
    const THREADS: usize = 8;
    const ADDS_PER_THREAD: usize = 100_000;

    let adder = Arc::new(StripedAdder::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let adder = adder.clone();
            thread::spawn(move || {
                for _ in 0..ADDS_PER_THREAD {
                    adder.add(1);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(adder.value(), (THREADS * ADDS_PER_THREAD) as i64);
}

#[test]
fn test_striped_adder_reads_during_writes_never_overcount() {
    const THREADS: usize = 4;
    const ADDS_PER_THREAD: usize = 50_000;
    const TOTAL: i64 = (THREADS * ADDS_PER_THREAD) as i64;

    let adder = Arc::new(StripedAdder::new());

    let writers: Vec<_> = (0..THREADS)
        .map(|_| {
            let adder = adder.clone();
            thread::spawn(move || {
                for _ in 0..ADDS_PER_THREAD {
                    adder.add(1);
                }
            })
        })
        .collect();

    // Transiently low values are allowed mid-run; values above the final
    // total are not, since every delta is positive.
    let reader = {
        let adder = adder.clone();
        thread::spawn(move || {
            for _ in 0..10_000 {
                let observed = adder.value();
                assert!((0..=TOTAL).contains(&observed), "observed {observed}");
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(adder.value(), TOTAL);
}

#[test]
fn test_mixed_positive_and_negative_deltas_balance() {
    let adder = Arc::new(StripedAdder::new());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let adder = adder.clone();
            let delta = if i % 2 == 0 { 3 } else { -3 };
            thread::spawn(move || {
                for _ in 0..10_000 {
                    adder.add(delta);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(adder.value(), 0);
}

#[test]
fn test_concurrent_meter_marks_are_all_counted() {
    const THREADS: usize = 8;
    const MARKS_PER_THREAD: usize = 10_000;

    let registry = Arc::new(Registry::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                let meter = registry.meter("throughput");
                for _ in 0..MARKS_PER_THREAD {
                    meter.mark();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        registry.meter("throughput").count(),
        (THREADS * MARKS_PER_THREAD) as i64
    );
}

#[test]
fn test_registry_returns_one_instance_across_threads() {
    let registry = Arc::new(Registry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || registry.counter("shared"))
        })
        .collect();

    let counters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for counter in &counters {
        assert!(Arc::ptr_eq(counter, &counters[0]));
    }
}

#[test]
fn test_concurrent_histogram_updates_and_snapshots() {
    let registry = Arc::new(Registry::new());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                let histogram = registry.histogram("latency");
                for i in 0..5_000 {
                    histogram.update((t * 5_000 + i) as i64);
                }
            })
        })
        .collect();

    let snapshotter = {
        let registry = registry.clone();
        thread::spawn(move || {
            let histogram = registry.histogram("latency");
            for _ in 0..100 {
                let snapshot = histogram.snapshot();
                for value in snapshot.values() {
                    assert!((0..20_000).contains(&value));
                }
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    snapshotter.join().unwrap();
}
