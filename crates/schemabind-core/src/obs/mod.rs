//! Observability: registry counters and the event sink they are fed through.
//!
//! Resolution logic records [`MetricsEvent`]s only; counter layout lives in
//! `metrics`.

mod metrics;
mod sink;

pub use metrics::{MetricsSnapshot, RegistryMetrics};
pub use sink::{MetricsEvent, MetricsSink};
