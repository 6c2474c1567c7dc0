//! Metrics sink boundary.
//!
//! Cache and compiler logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between runtime logic
//! and the global metrics state.
use crate::{cache::StoreKind, obs::metrics};
use std::sync::Arc;

///
/// FillOutcome
///
/// What a store did with one `store` call.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FillOutcome {
    Inserted,
    KeptExisting,
    Replaced,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    CacheLookup {
        store: StoreKind,
        hit: bool,
    },
    CacheFill {
        store: StoreKind,
        outcome: FillOutcome,
    },
    CacheEvict {
        store: StoreKind,
        evicted: u64,
    },
    ViewCompiled {
        blocks: u64,
    },
    ViewRejected,
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
/// Default process-wide sink that writes into global metrics state.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalMetricsSink;

impl GlobalMetricsSink {
    /// Shared handle suitable for injection into stores and compilers.
    #[must_use]
    pub fn shared() -> Arc<dyn MetricsSink> {
        Arc::new(Self)
    }
}

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::CacheLookup { store, hit } => {
                metrics::with_state_mut(|m| {
                    let entry = m.stores.entry(store.label()).or_default();
                    entry.lookups = entry.lookups.saturating_add(1);
                    if hit {
                        entry.hits = entry.hits.saturating_add(1);
                    }
                });
            }

            MetricsEvent::CacheFill { store, outcome } => {
                metrics::with_state_mut(|m| {
                    let entry = m.stores.entry(store.label()).or_default();
                    match outcome {
                        FillOutcome::Inserted => entry.inserts = entry.inserts.saturating_add(1),
                        FillOutcome::KeptExisting => {
                            entry.discarded_writes = entry.discarded_writes.saturating_add(1);
                        }
                        FillOutcome::Replaced => {
                            entry.replacements = entry.replacements.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::CacheEvict { store, evicted } => {
                metrics::with_state_mut(|m| {
                    let entry = m.stores.entry(store.label()).or_default();
                    entry.evictions = entry.evictions.saturating_add(evicted);
                });
            }

            MetricsEvent::ViewCompiled { blocks } => {
                metrics::with_state_mut(|m| {
                    m.views.compiled = m.views.compiled.saturating_add(1);
                    m.views.blocks = m.views.blocks.saturating_add(blocks);
                });
            }

            MetricsEvent::ViewRejected => {
                metrics::with_state_mut(|m| {
                    m.views.rejected = m.views.rejected.saturating_add(1);
                });
            }
        }
    }
}

///
/// NoopMetricsSink
/// Discards every event.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _event: MetricsEvent) {}
}

/// Snapshot the current global metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all global metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

///
/// TESTS
///

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    ///
    /// CapturingSink
    /// Test sink that keeps every event in arrival order.
    ///

    #[derive(Default)]
    pub(crate) struct CapturingSink {
        events: Mutex<Vec<MetricsEvent>>,
    }

    impl CapturingSink {
        pub(crate) fn events(&self) -> Vec<MetricsEvent> {
            self.events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    impl MetricsSink for CapturingSink {
        fn record(&self, event: MetricsEvent) {
            self.events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(event);
        }
    }

    #[test]
    fn global_sink_accumulates_store_counters() {
        let sink = GlobalMetricsSink;
        let before = metrics_report();
        let hits_before = before
            .stores
            .get(StoreKind::Shaper.label())
            .map_or(0, |c| c.hits);

        sink.record(MetricsEvent::CacheLookup {
            store: StoreKind::Shaper,
            hit: true,
        });

        let after = metrics_report();
        let hits_after = after
            .stores
            .get(StoreKind::Shaper.label())
            .map_or(0, |c| c.hits);
        assert!(hits_after > hits_before);
    }
}
