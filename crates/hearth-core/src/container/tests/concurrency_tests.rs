use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::container::{Container, ContainerError, Instance};

const THREADS: usize = 16;

#[test]
fn test_concurrent_singleton_built_once() {
    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    container
        .singleton("slow", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(Instance::new(vec![1u8, 2, 3]))
        })
        .unwrap();

    let barrier = Barrier::new(THREADS);
    let results: Vec<Instance> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.make("slow").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.windows(2).all(|w| w[0].ptr_eq(&w[1])));
}

#[test]
fn test_concurrent_make_and_release_release_each_build_once() {
    let container = Container::new();
    let built = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let (b, r) = (built.clone(), released.clone());
    container
        .singleton("churn", move |_, _| {
            b.fetch_add(1, Ordering::SeqCst);
            Ok(Instance::new(0u32))
        })
        .unwrap()
        .on_release(move |_, _| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let barrier = Barrier::new(THREADS);
    thread::scope(|s| {
        for i in 0..THREADS {
            let (container, barrier) = (&container, &barrier);
            s.spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    if i % 2 == 0 {
                        container.make("churn").unwrap();
                    } else {
                        container.release("churn").unwrap();
                    }
                }
            });
        }
    });

    let still_cached = usize::from(container.has_instance("churn"));
    assert_eq!(
        built.load(Ordering::SeqCst),
        released.load(Ordering::SeqCst) + still_cached
    );
}

#[test]
fn test_concurrent_bind_distinct_keys() {
    let container = Container::new();
    thread::scope(|s| {
        for i in 0..THREADS {
            let container = &container;
            s.spawn(move || {
                container
                    .singleton(&format!("key-{i:02}"), move |_, _| Ok(Instance::new(i)))
                    .unwrap();
            });
        }
    });
    assert_eq!(container.bound_keys().len(), THREADS);
    assert_eq!(*container.make_as::<usize>("key-07").unwrap(), 7);
}

/// `a` needs `b` and `b` needs `a`. Both factories meet at the barrier the
/// first time they run, so each thread holds one slot and asks for the other.
fn crossed_singletons(barrier: Arc<Barrier>) -> Container {
    let container = Container::new();
    for (key, dependency) in [("a", "b"), ("b", "a")] {
        let barrier = barrier.clone();
        let first_run = AtomicUsize::new(0);
        container
            .singleton(key, move |c, _| {
                if first_run.fetch_add(1, Ordering::SeqCst) == 0 {
                    barrier.wait();
                }
                c.make(dependency)?;
                Ok(Instance::new(key))
            })
            .unwrap();
    }
    container
}

#[test]
fn test_cycle_across_threads_fails_instead_of_blocking() {
    let barrier = Arc::new(Barrier::new(2));
    let container = Arc::new(crossed_singletons(barrier));

    let (tx, rx) = mpsc::channel();
    for key in ["a", "b"] {
        let container = container.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let _ = tx.send((key, container.make(key)));
        });
    }
    drop(tx);

    for _ in 0..2 {
        let (key, result) = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("resolution of a cross-thread cycle blocked");
        match result {
            Err(ContainerError::CircularDependency { path, .. }) => {
                assert!(path.len() >= 3, "{key}: {path:?}");
                assert_eq!(path.first(), path.last());
            }
            other => panic!("{key}: expected a circular dependency, got {other:?}"),
        }
    }
    assert!(!container.has_instance("a"));
    assert!(!container.has_instance("b"));
}
