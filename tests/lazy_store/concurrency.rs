//! Concurrency Tests
//!
//! Tests for thread safety:
//! - At-most-once evaluation under contention
//! - Store-wide serialization of producers
//! - Readers on other threads wait for in-flight evaluations
//! - Writers racing readers

use crate::common::*;
use lazystore::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const NUM_THREADS: usize = 16;

#[test]
fn concurrent_reads_invoke_producer_once() {
    init_tracing();
    let counter = CallCounter::new();
    let slow_calls = Arc::new(AtomicUsize::new(0));
    let slow_counter = Arc::clone(&slow_calls);
    let store = Arc::new(
        LazyStore::<u64>::builder()
            .producer("expensive", move || {
                slow_counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                Ok(42)
            })
            .payload("counted", counter.producer(7))
            .build(),
    );

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let a = store.get("expensive").unwrap();
                let b = store.get("counted").unwrap();
                (a, b)
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap(), (42, 7));
    }
    assert_eq!(slow_calls.load(Ordering::SeqCst), 1);
    assert_eq!(counter.count(), 1);
}

#[test]
fn concurrent_reads_of_failing_producer_share_failure() {
    let counter = CallCounter::new();
    let store = Arc::new(LazyStore::<i32>::from_entries([(
        "broken",
        counter.failing("broken on purpose"),
    )]));

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.get("broken").unwrap_err()
            })
        })
        .collect();

    let errors: Vec<Error> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counter.count(), 1);

    let first = errors[0].failure().unwrap();
    assert!(errors.iter().all(|e| e.failure().unwrap().ptr_eq(first)));
}

#[test]
fn producers_never_overlap() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut builder = LazyStore::<usize>::builder();
    for i in 0..NUM_THREADS {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        builder = builder.producer(format!("key_{}", i), move || {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(i)
        });
    }
    let store = Arc::new(builder.build());

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                assert_eq!(store.get(&format!("key_{}", i)).unwrap(), i);
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[test]
fn other_thread_waits_instead_of_seeing_a_cycle() {
    let started = Arc::new(Barrier::new(2));
    let signal = Arc::clone(&started);
    let store = Arc::new(
        LazyStore::<&'static str>::builder()
            .producer("slow", move || {
                signal.wait();
                thread::sleep(Duration::from_millis(50));
                Ok("done")
            })
            .build(),
    );

    let reader = {
        let store = Arc::clone(&store);
        let started = Arc::clone(&started);
        thread::spawn(move || {
            // Only starts once the producer is running on the other thread.
            started.wait();
            store.get("slow")
        })
    };

    assert_eq!(store.get("slow").unwrap(), "done");
    assert_eq!(reader.join().unwrap().unwrap(), "done");
}

#[test]
fn dependents_evaluated_once_across_threads() {
    let base = CallCounter::new();
    let derived_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&derived_calls);

    let store = Arc::new(
        LazyStore::<i64>::builder()
            .payload("base", base.producer(21))
            .dependent("derived", move |s| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(s.get("base")? * 2)
            })
            .build(),
    );

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let key = if i % 2 == 0 { "derived" } else { "base" };
                store.get(key).unwrap()
            })
        })
        .collect();

    for (i, h) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { 42 } else { 21 };
        assert_eq!(h.join().unwrap(), expected);
    }
    assert_eq!(base.count(), 1);
    assert_eq!(derived_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn racing_writers_on_write_once_store() {
    let store = Arc::new(LazyStore::<usize>::new());
    store.set("slot", 0).unwrap();

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if i == 0 {
                    store.get("slot").map(|_| ())
                } else {
                    store.set("slot", i)
                }
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results[0].is_ok());

    // Whatever the interleaving, the value read is the one that stuck.
    let frozen = store.get("slot").unwrap();
    assert_eq!(store.state("slot"), Some(EntryState::Evaluated));
    assert!(store.set("slot", 999).unwrap_err().is_constant_redefinition());
    assert_eq!(store.get("slot").unwrap(), frozen);

    for result in &results[1..] {
        if let Err(e) = result {
            assert!(e.is_constant_redefinition());
        }
    }
}

#[test]
fn mutable_store_under_mixed_load() {
    const OPS_PER_THREAD: usize = 200;

    let store = Arc::new(MutableLazyStore::<usize>::new());
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let key = format!("k{}", t % 4);
                for j in 0..OPS_PER_THREAD {
                    match j % 3 {
                        0 => store.set(key.clone(), j).unwrap(),
                        1 => store
                            .set_producer(key.clone(), move || Ok(j * 10))
                            .unwrap(),
                        _ => {
                            // Keys are only ever set, never deleted.
                            store.get(&key).unwrap();
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(store.len(), 4);
    assert!(store.evaluate_all().is_ok());
}
