//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Diagnostic logging goes through `tracing`; counters go through the sink.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventReport, StoreCounters, ViewCounters};
pub use sink::{
    FillOutcome, GlobalMetricsSink, MetricsEvent, MetricsSink, NoopMetricsSink, metrics_report,
    metrics_reset_all,
};
