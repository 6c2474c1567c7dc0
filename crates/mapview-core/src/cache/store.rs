//! Thread-safe key→artifact store with a configurable fill policy.

use crate::{
    cache::{CacheKey, KeyIdentity},
    config::StoreConfig,
    obs::{FillOutcome, MetricsEvent, MetricsSink, NoopMetricsSink},
};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fmt,
    num::NonZeroUsize,
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::{debug, warn};

///
/// FillPolicy
///
/// How a store resolves two writers racing on the same key.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// The first published value is kept; later values are discarded and
    /// the caller receives the authoritative one.
    #[default]
    FirstWriterWins,

    /// Every write replaces the current value.
    LastWriterWins,
}

///
/// StoreKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StoreKind {
    Plan,
    Shaper,
    Template,
    View,
}

impl StoreKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Shaper => "shaper",
            Self::Template => "template",
            Self::View => "view",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// CacheEntry
///
/// One stored key and its immutable payload. Owned by the store.
///

pub struct CacheEntry<V> {
    key: CacheKey,
    value: Arc<V>,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

impl<V> CacheEntry<V> {
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    #[must_use]
    pub const fn value(&self) -> &Arc<V> {
        &self.value
    }
}

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

///
/// CacheStore
///
/// Keyed artifact store. Lookups take a shared lock and bump the stored
/// key's bookkeeping through atomics; writes take the exclusive lock, so a
/// value becomes visible fully formed or not at all.
///
/// The aging index of every stored key is stamped from a logical clock on
/// insert and on each hit: a lower index means a staler entry.
///

pub struct CacheStore<V> {
    kind: StoreKind,
    policy: FillPolicy,
    capacity: Option<NonZeroUsize>,
    entries: RwLock<HashMap<KeyIdentity, CacheEntry<V>>>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    sink: Arc<dyn MetricsSink>,
}

impl<V> CacheStore<V> {
    /// Unbounded store with no metrics sink.
    #[must_use]
    pub fn new(kind: StoreKind, policy: FillPolicy) -> Self {
        Self {
            kind,
            policy,
            capacity: None,
            entries: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sink: Arc::new(NoopMetricsSink),
        }
    }

    /// Store configured from one `[store]` config section.
    #[must_use]
    pub fn from_config(kind: StoreKind, config: &StoreConfig, sink: Arc<dyn MetricsSink>) -> Self {
        let mut store = Self::new(kind, config.fill_policy).with_sink(sink);
        store.capacity = config.capacity();

        store
    }

    #[must_use]
    pub const fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> StoreKind {
        self.kind
    }

    #[must_use]
    pub const fn policy(&self) -> FillPolicy {
        self.policy
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// Return the stored value for `key`, recording a hit on the stored key.
    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<V>> {
        let value = {
            let entries = self.read();
            entries.get(key.key_identity()).map(|entry| {
                entry.key.update_hit();
                entry.key.set_aging_index(self.tick());
                Arc::clone(&entry.value)
            })
        };

        let hit = value.is_some();
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        self.sink.record(MetricsEvent::CacheLookup {
            store: self.kind,
            hit,
        });

        value
    }

    /// Publish `value` under `key` and return the value the store now holds.
    ///
    /// Under first-writer-wins the returned value may be a previously
    /// published one, in which case `value` is dropped.
    pub fn store(&self, key: CacheKey, value: V) -> Arc<V> {
        self.store_arc(key, Arc::new(value))
    }

    /// Same as [`Self::store`] for a value that is already shared.
    pub fn store_arc(&self, key: CacheKey, value: Arc<V>) -> Arc<V> {
        let key_kind = key.kind();
        let (outcome, retained, evicted) = {
            let mut entries = self.write();
            self.fill(&mut entries, key, value)
        };

        match outcome {
            FillOutcome::Inserted => {}
            FillOutcome::KeptExisting => {
                debug!(store = %self.kind, ?key_kind, "discarded duplicate compilation");
            }
            FillOutcome::Replaced => {
                warn!(store = %self.kind, ?key_kind, "replaced live cache value");
            }
        }
        if evicted > 0 {
            debug!(store = %self.kind, evicted, "evicted stale entries");
            self.sink.record(MetricsEvent::CacheEvict {
                store: self.kind,
                evicted,
            });
        }
        self.sink.record(MetricsEvent::CacheFill {
            store: self.kind,
            outcome,
        });

        retained
    }

    /// Look `key` up and build, then publish, the value on a miss.
    ///
    /// `build` runs without any lock held, so concurrent misses on the same
    /// key may each build; the fill policy decides which result survives.
    pub fn get_or_insert_with<E>(
        &self,
        key: CacheKey,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }
        let value = build()?;

        Ok(self.store(key, value))
    }

    /// Whether `key` is present. Does not count as a hit.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.read().contains_key(key.key_identity())
    }

    /// Copy of the stored key, including its current bookkeeping.
    #[must_use]
    pub fn stored_key(&self, key: &CacheKey) -> Option<CacheKey> {
        self.read()
            .get(key.key_identity())
            .map(|entry| entry.key.clone())
    }

    /// Point-in-time copy of every entry, stalest first.
    #[must_use]
    pub fn entries(&self) -> Vec<CacheEntry<V>> {
        let mut entries: Vec<_> = self.read().values().cloned().collect();
        entries.sort_by_key(|entry| (entry.key.aging_index(), entry.key.hit_count()));

        entries
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.write()
            .remove(key.key_identity())
            .map(|entry| entry.value)
    }

    /// Remove entries whose aging index lags the clock by more than `max_age`.
    pub fn sweep(&self, max_age: u64) -> usize {
        let evicted = {
            let mut entries = self.write();
            let now = self.clock.load(Ordering::Relaxed);
            let before = entries.len();
            entries.retain(|_, entry| now.saturating_sub(entry.key.aging_index()) <= max_age);

            before - entries.len()
        };

        if evicted > 0 {
            debug!(store = %self.kind, evicted, max_age, "swept stale entries");
            self.sink.record(MetricsEvent::CacheEvict {
                store: self.kind,
                evicted: evicted as u64,
            });
        }

        evicted
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Stats are best-effort only; relaxed atomics are sufficient.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    fn fill(
        &self,
        entries: &mut HashMap<KeyIdentity, CacheEntry<V>>,
        key: CacheKey,
        value: Arc<V>,
    ) -> (FillOutcome, Arc<V>, u64) {
        let stamp = self.tick();

        if let Some(existing) = entries.get_mut(key.key_identity()) {
            existing.key.set_aging_index(stamp);
            return match self.policy {
                FillPolicy::FirstWriterWins => {
                    (FillOutcome::KeptExisting, Arc::clone(&existing.value), 0)
                }
                FillPolicy::LastWriterWins => {
                    existing.value = Arc::clone(&value);
                    (FillOutcome::Replaced, value, 0)
                }
            };
        }

        let evicted = self.make_room(entries);
        key.set_aging_index(stamp);
        entries.insert(
            key.key_identity().clone(),
            CacheEntry {
                key,
                value: Arc::clone(&value),
            },
        );

        (FillOutcome::Inserted, value, evicted)
    }

    // Evict the stalest entries (lowest aging index, then lowest hit count)
    // until one more entry fits.
    fn make_room(&self, entries: &mut HashMap<KeyIdentity, CacheEntry<V>>) -> u64 {
        let Some(capacity) = self.capacity else {
            return 0;
        };

        let mut evicted = 0;
        while entries.len() >= capacity.get() {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| (entry.key.aging_index(), entry.key.hit_count()))
                .map(|(identity, _)| identity.clone());
            let Some(victim) = victim else {
                break;
            };
            entries.remove(&victim);
            evicted += 1;
        }

        evicted
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    // Stored values are immutable Arcs, so a poisoned lock still guards a
    // consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<KeyIdentity, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<KeyIdentity, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests;
