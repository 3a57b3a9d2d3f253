use crate::codec::CodecKind;

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    CacheHit { kind: CodecKind },
    CacheMiss { kind: CodecKind },
    CodecGenerated { kind: CodecKind },
    GenerationFailed { kind: CodecKind },
    CaseActivated,
    CaseDispatched,
    AmbiguousDispatch,
    OrphanedAugmentation,
    UnresolvedIdentity,
    SchemaInstalled,
    Reclaimed { entries: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}
