use crate::{
    cache::{CacheKey, CacheStore, CommandKind, FillPolicy, ParameterShape, StoreKind},
    obs::{FillOutcome, MetricsEvent, sink::tests::CapturingSink},
};
use std::{
    num::NonZeroUsize,
    sync::{Arc, Barrier},
    thread,
};
use ulid::Ulid;

fn command_key(text: &str) -> CacheKey {
    CacheKey::command(CommandKind::Text, text, &ParameterShape::empty()).expect("valid key")
}

fn capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).expect("non-zero capacity")
}

#[test]
fn lookup_misses_then_hits_after_store() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    let key = command_key("SELECT VALUE c FROM Customers AS c");

    assert!(store.lookup(&key).is_none());
    store.store(key.clone(), "plan-a".to_string());
    let found = store.lookup(&key).expect("stored value must be found");

    assert_eq!(found.as_str(), "plan-a");
    assert_eq!(
        store.stats(),
        crate::cache::CacheStats {
            hits: 1,
            misses: 1,
            size: 1,
        }
    );
}

#[test]
fn lookup_bumps_the_stored_key_not_the_caller_key() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    let key = command_key("q");
    store.store(key.clone(), 1_u32);

    let caller_key = command_key("q");
    store.lookup(&caller_key);
    store.lookup(&caller_key);

    assert_eq!(caller_key.hit_count(), 0);
    let stored = store.stored_key(&caller_key).expect("key must be stored");
    assert_eq!(stored.hit_count(), 2);
}

#[test]
fn first_writer_wins_keeps_the_original_value() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    let key = command_key("q");

    let first = store.store(key.clone(), 1_u32);
    let second = store.store(key.clone(), 2_u32);

    assert_eq!(*first, 1);
    assert_eq!(*second, 1);
    assert_eq!(store.lookup(&key).as_deref(), Some(&1));
}

#[test]
fn last_writer_wins_replaces_the_value() {
    let store = CacheStore::new(StoreKind::Template, FillPolicy::LastWriterWins);
    let key = command_key("q");

    store.store(key.clone(), 1_u32);
    let second = store.store(key.clone(), 2_u32);

    assert_eq!(*second, 2);
    assert_eq!(store.lookup(&key).as_deref(), Some(&2));
    assert_eq!(store.len(), 1);
}

#[test]
fn concurrent_first_writers_publish_exactly_one_value() {
    const WRITERS: usize = 8;

    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    let key = CacheKey::identity(Ulid::from_parts(10, 10));
    let barrier = Barrier::new(WRITERS);

    let retained: Vec<Arc<usize>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let store = &store;
                let key = key.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    store.store(key, i)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("writer thread panicked"))
            .collect()
    });

    let winner = *retained[0];
    assert!(retained.iter().all(|value| **value == winner));
    for _ in 0..4 {
        assert_eq!(store.lookup(&key).as_deref(), Some(&winner));
    }
}

#[test]
fn concurrent_readers_and_writers_never_observe_partial_values() {
    let store = CacheStore::new(StoreKind::Shaper, FillPolicy::FirstWriterWins);
    let keys: Vec<CacheKey> = (0..16).map(|i| command_key(&format!("q{i}"))).collect();

    thread::scope(|scope| {
        for writer in 0..4 {
            let store = &store;
            let keys = &keys;
            scope.spawn(move || {
                for (i, key) in keys.iter().enumerate() {
                    store.store(key.clone(), vec![i; 32 + writer]);
                }
            });
        }
        for _ in 0..4 {
            let store = &store;
            let keys = &keys;
            scope.spawn(move || {
                for (i, key) in keys.iter().enumerate() {
                    if let Some(value) = store.lookup(key) {
                        assert!(value.len() >= 32);
                        assert!(value.iter().all(|v| *v == i));
                    }
                }
            });
        }
    });

    assert_eq!(store.len(), keys.len());
}

#[test]
fn get_or_insert_with_builds_once_per_key() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    let key = command_key("q");
    let mut builds = 0;

    for _ in 0..3 {
        let value = store
            .get_or_insert_with(key.clone(), || {
                builds += 1;
                Ok::<_, ()>("compiled".to_string())
            })
            .expect("build succeeds");
        assert_eq!(value.as_str(), "compiled");
    }

    assert_eq!(builds, 1);
}

#[test]
fn get_or_insert_with_propagates_build_errors() {
    let store: CacheStore<String> = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    let key = command_key("q");

    let err = store
        .get_or_insert_with(key.clone(), || Err("boom"))
        .expect_err("build error must propagate");

    assert_eq!(err, "boom");
    assert!(!store.contains(&key));
}

#[test]
fn bounded_store_evicts_lowest_aging_index_first() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins)
        .with_capacity(capacity(2));
    let a = command_key("a");
    let b = command_key("b");
    let c = command_key("c");

    store.store(a.clone(), 1_u32);
    store.store(b.clone(), 2_u32);
    // Touch `a` so `b` becomes the stalest entry.
    store.lookup(&a);
    store.store(c.clone(), 3_u32);

    assert!(store.contains(&a));
    assert!(!store.contains(&b));
    assert!(store.contains(&c));
}

#[test]
fn entries_are_listed_stalest_first() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    store.store(command_key("a"), 1_u32);
    store.store(command_key("b"), 2_u32);
    store.lookup(&command_key("a"));

    let values: Vec<u32> = store.entries().iter().map(|entry| **entry.value()).collect();
    assert_eq!(values, vec![2, 1]);
}

#[test]
fn sweep_removes_entries_older_than_max_age() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    let old = command_key("old");
    let fresh = command_key("fresh");

    store.store(old.clone(), 1_u32);
    for _ in 0..5 {
        store.store(fresh.clone(), 2_u32);
    }

    let removed = store.sweep(2);

    assert_eq!(removed, 1);
    assert!(!store.contains(&old));
    assert!(store.contains(&fresh));
}

#[test]
fn remove_and_clear_drop_entries() {
    let store = CacheStore::new(StoreKind::Plan, FillPolicy::FirstWriterWins);
    store.store(command_key("a"), 1_u32);
    store.store(command_key("b"), 2_u32);

    assert_eq!(store.remove(&command_key("a")).as_deref(), Some(&1));
    assert_eq!(store.len(), 1);
    store.clear();
    assert!(store.is_empty());
}

#[test]
fn store_reports_metrics_events_to_the_injected_sink() {
    let sink = Arc::new(CapturingSink::default());
    let store = CacheStore::new(StoreKind::Template, FillPolicy::FirstWriterWins)
        .with_capacity(capacity(1))
        .with_sink(sink.clone());

    store.lookup(&command_key("a"));
    store.store(command_key("a"), 1_u32);
    store.store(command_key("a"), 2_u32);
    store.store(command_key("b"), 3_u32);

    assert_eq!(
        sink.events(),
        vec![
            MetricsEvent::CacheLookup {
                store: StoreKind::Template,
                hit: false,
            },
            MetricsEvent::CacheFill {
                store: StoreKind::Template,
                outcome: FillOutcome::Inserted,
            },
            MetricsEvent::CacheFill {
                store: StoreKind::Template,
                outcome: FillOutcome::KeptExisting,
            },
            MetricsEvent::CacheEvict {
                store: StoreKind::Template,
                evicted: 1,
            },
            MetricsEvent::CacheFill {
                store: StoreKind::Template,
                outcome: FillOutcome::Inserted,
            },
        ]
    );
}
