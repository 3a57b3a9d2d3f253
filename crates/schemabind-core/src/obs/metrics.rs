use crate::obs::sink::{MetricsEvent, MetricsSink};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// RegistryMetrics
/// Process-local counters owned by one registry.
///

#[derive(Debug, Default)]
pub struct RegistryMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    codecs_generated: AtomicU64,
    generation_failures: AtomicU64,
    cases_activated: AtomicU64,
    case_dispatches: AtomicU64,
    ambiguous_dispatches: AtomicU64,
    orphaned_augmentations: AtomicU64,
    unresolved_identities: AtomicU64,
    schemas_installed: AtomicU64,
    entries_reclaimed: AtomicU64,
}

impl RegistryMetrics {
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        MetricsSnapshot {
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            codecs_generated: load(&self.codecs_generated),
            generation_failures: load(&self.generation_failures),
            cases_activated: load(&self.cases_activated),
            case_dispatches: load(&self.case_dispatches),
            ambiguous_dispatches: load(&self.ambiguous_dispatches),
            orphaned_augmentations: load(&self.orphaned_augmentations),
            unresolved_identities: load(&self.unresolved_identities),
            schemas_installed: load(&self.schemas_installed),
            entries_reclaimed: load(&self.entries_reclaimed),
        }
    }
}

impl MetricsSink for RegistryMetrics {
    fn record(&self, event: MetricsEvent) {
        let (counter, by) = match event {
            MetricsEvent::CacheHit { .. } => (&self.cache_hits, 1),
            MetricsEvent::CacheMiss { .. } => (&self.cache_misses, 1),
            MetricsEvent::CodecGenerated { .. } => (&self.codecs_generated, 1),
            MetricsEvent::GenerationFailed { .. } => (&self.generation_failures, 1),
            MetricsEvent::CaseActivated => (&self.cases_activated, 1),
            MetricsEvent::CaseDispatched => (&self.case_dispatches, 1),
            MetricsEvent::AmbiguousDispatch => (&self.ambiguous_dispatches, 1),
            MetricsEvent::OrphanedAugmentation => (&self.orphaned_augmentations, 1),
            MetricsEvent::UnresolvedIdentity => (&self.unresolved_identities, 1),
            MetricsEvent::SchemaInstalled => (&self.schemas_installed, 1),
            MetricsEvent::Reclaimed { entries } => (&self.entries_reclaimed, entries),
        };
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

///
/// MetricsSnapshot
/// Point-in-time copy of the registry counters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub codecs_generated: u64,
    pub generation_failures: u64,
    pub cases_activated: u64,
    pub case_dispatches: u64,
    pub ambiguous_dispatches: u64,
    pub orphaned_augmentations: u64,
    pub unresolved_identities: u64,
    pub schemas_installed: u64,
    pub entries_reclaimed: u64,
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecKind;

    #[test]
    fn events_land_in_their_counters() {
        let metrics = RegistryMetrics::default();
        metrics.record(MetricsEvent::CacheMiss {
            kind: CodecKind::Container,
        });
        metrics.record(MetricsEvent::CacheHit {
            kind: CodecKind::Container,
        });
        metrics.record(MetricsEvent::CacheHit {
            kind: CodecKind::Choice,
        });
        metrics.record(MetricsEvent::Reclaimed { entries: 3 });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 2);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.entries_reclaimed, 3);
        assert_eq!(snapshot.codecs_generated, 0);
    }

    #[test]
    fn snapshot_serializes_with_field_names() {
        let json =
            serde_json::to_value(MetricsSnapshot::default()).expect("snapshot should serialize");

        assert_eq!(json["schemas_installed"], 0);
    }
}
