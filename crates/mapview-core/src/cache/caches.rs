use crate::{
    cache::{CacheStats, CacheStore, StoreKind},
    config::CacheConfig,
    obs::{GlobalMetricsSink, MetricsSink},
};
use std::sync::Arc;

///
/// QueryCaches
///
/// The per-host bundle of artifact stores: compiled plans (`P`), execution
/// plan templates (`T`) and result shapers (`S`). Hosts build one and pass
/// it down the call chain.
///

#[derive(Debug)]
pub struct QueryCaches<P, T, S> {
    plans: CacheStore<P>,
    templates: CacheStore<T>,
    shapers: CacheStore<S>,
}

impl<P, T, S> QueryCaches<P, T, S> {
    /// Build all stores from config, reporting into the global metrics sink.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_sink(config, GlobalMetricsSink::shared())
    }

    #[must_use]
    pub fn with_sink(config: &CacheConfig, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            plans: CacheStore::from_config(StoreKind::Plan, &config.plans, Arc::clone(&sink)),
            templates: CacheStore::from_config(
                StoreKind::Template,
                &config.templates,
                Arc::clone(&sink),
            ),
            shapers: CacheStore::from_config(StoreKind::Shaper, &config.shapers, sink),
        }
    }

    #[must_use]
    pub const fn plans(&self) -> &CacheStore<P> {
        &self.plans
    }

    #[must_use]
    pub const fn templates(&self) -> &CacheStore<T> {
        &self.templates
    }

    #[must_use]
    pub const fn shapers(&self) -> &CacheStore<S> {
        &self.shapers
    }

    /// Stats for every store, in `(kind, stats)` pairs.
    #[must_use]
    pub fn stats(&self) -> [(StoreKind, CacheStats); 3] {
        [
            (StoreKind::Plan, self.plans.stats()),
            (StoreKind::Template, self.templates.stats()),
            (StoreKind::Shaper, self.shapers.stats()),
        ]
    }

    /// Sweep every store; returns the total number of evicted entries.
    pub fn sweep(&self, max_age: u64) -> usize {
        self.plans.sweep(max_age) + self.templates.sweep(max_age) + self.shapers.sweep(max_age)
    }

    pub fn clear(&self) {
        self.plans.clear();
        self.templates.clear();
        self.shapers.clear();
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{CacheKey, FillPolicy, MergeOption},
        config::CacheConfig,
        obs::NoopMetricsSink,
    };

    #[test]
    fn stores_follow_their_configured_policies() {
        let config = CacheConfig::from_toml_str(
            r#"
            [templates]
            fill_policy = "last_writer_wins"

            [shapers]
            capacity = 4
            "#,
        )
        .expect("valid config");
        let caches: QueryCaches<String, String, String> =
            QueryCaches::with_sink(&config, Arc::new(NoopMetricsSink));

        assert_eq!(caches.plans().policy(), FillPolicy::FirstWriterWins);
        assert_eq!(caches.templates().policy(), FillPolicy::LastWriterWins);
        assert_eq!(caches.shapers().capacity().map(|c| c.get()), Some(4));
    }

    #[test]
    fn stats_and_clear_cover_every_store() {
        let caches: QueryCaches<u8, u8, u8> =
            QueryCaches::with_sink(&CacheConfig::default(), Arc::new(NoopMetricsSink));
        let key = CacheKey::shaper("cm", MergeOption::AppendOnly, false).expect("valid key");

        caches.plans().store(key.clone(), 1);
        caches.templates().store(key.clone(), 2);
        caches.shapers().store(key, 3);

        assert!(caches.stats().iter().all(|(_, stats)| stats.size == 1));
        caches.clear();
        assert!(caches.stats().iter().all(|(_, stats)| stats.size == 0));
    }
}
