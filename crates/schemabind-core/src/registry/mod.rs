//! Module: registry
//! Responsibility: resolve model types to cached codecs, generating them on
//! a miss, and keep those caches consistent with installed schema
//! generations.
//! Does not own: wire encoding (primitive codecs) or schema derivation.
//! Boundary: the only component that talks to the generator and loader.
//!
//! Invariants:
//! - At most one codec per live model type and kind; racing resolutions
//!   agree on the first inserted instance.
//! - No cache shard lock is held while generating, loading or waiting.
//! - Entries are dropped only by `reclaim`, once their type died.

mod resolve;
mod schema;

#[cfg(test)]
mod tests;

use crate::{
    codec::{
        AugmentableCodec, AugmentationCodec, CaseCodec, ChoiceCodec, CodecContext, CodecHandle,
        CodecKind, CodecMixins, DataContainerCodec, IdentifierCodec, WeakCache,
    },
    config::RegistryConfig,
    error::{BindingError, ErrorOrigin},
    generator::CodecGenerator,
    identity::IdentityCodec,
    index::SchemaIndex,
    lifecycle::SchemaLock,
    loader::TypeLoader,
    model::{DataObject, ModelKind, ModelObject, ModelType, TypeRegistry},
    obs::{MetricsEvent, MetricsSink, MetricsSnapshot, RegistryMetrics},
    wire::WireNode,
};
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use schemabind_schema::{path::SchemaPath, qname::QName, types::TypeDescriptor};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};
use tracing::{debug, error, trace};

///
/// CodecRegistry
///
/// Process-wide codec resolver. Cloning yields another handle onto the
/// same caches.
///

#[derive(Clone)]
pub struct CodecRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: RegistryConfig,
    generator: Arc<dyn CodecGenerator>,
    loader: Arc<dyn TypeLoader>,
    index: Arc<ArcSwapOption<SchemaIndex>>,
    lock: Arc<SchemaLock>,
    types: Arc<TypeRegistry>,
    metrics: Arc<RegistryMetrics>,
    identity: Arc<IdentityCodec>,

    containers: WeakCache<DataContainerCodec>,
    identifiers: WeakCache<IdentifierCodec>,
    choices: WeakCache<ChoiceCodec>,
    cases: WeakCache<CaseCodec>,
    augmentables: WeakCache<AugmentableCodec>,
    augmentations: WeakCache<AugmentationCodec>,

    // case entries exist per descriptor before any case type is loaded
    case_entries: DashMap<TypeDescriptor, Arc<CaseCodec>>,

    inserts: AtomicU32,
}

impl CodecRegistry {
    #[must_use]
    pub fn new(
        config: RegistryConfig,
        generator: Arc<dyn CodecGenerator>,
        loader: Arc<dyn TypeLoader>,
    ) -> Self {
        let index = Arc::new(ArcSwapOption::empty());
        let types = Arc::new(TypeRegistry::new());
        let metrics = Arc::new(RegistryMetrics::default());
        let identity = Arc::new(IdentityCodec::new(
            Arc::clone(&index),
            Arc::clone(&types),
            Arc::clone(&loader),
            Arc::clone(&metrics),
        ));

        Self {
            inner: Arc::new(RegistryInner {
                config,
                generator,
                loader,
                index,
                lock: Arc::new(SchemaLock::new()),
                types,
                metrics,
                identity,
                containers: WeakCache::new(),
                identifiers: WeakCache::new(),
                choices: WeakCache::new(),
                cases: WeakCache::new(),
                augmentables: WeakCache::new(),
                augmentations: WeakCache::new(),
                case_entries: DashMap::new(),
                inserts: AtomicU32::new(0),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Currently installed schema index, if any.
    #[must_use]
    pub fn index(&self) -> Option<Arc<SchemaIndex>> {
        self.inner.index.load_full()
    }

    #[must_use]
    pub fn identity_codec(&self) -> Arc<IdentityCodec> {
        Arc::clone(&self.inner.identity)
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    ///
    /// RESOLUTION
    ///

    /// Codec for any model kind except identities.
    pub fn codec_for(&self, ty: &ModelType) -> Result<CodecHandle, BindingError> {
        self.encounter(ty);

        match ty.kind() {
            ModelKind::Container | ModelKind::List { .. } => {
                self.container_codec(ty).map(CodecHandle::Container)
            }
            ModelKind::Identifier => self.codec_for_identifier(ty).map(CodecHandle::Identifier),
            ModelKind::Choice => self.choice_codec(ty).map(CodecHandle::Choice),
            ModelKind::Case => self.case_codec(ty).map(CodecHandle::Case),
            ModelKind::Augmentation { .. } => {
                self.codec_for_augmentation(ty).map(CodecHandle::Augmentation)
            }
            ModelKind::Identity { .. } => Err(BindingError::misuse(
                ErrorOrigin::Registry,
                format!("{ty} is an identity type; use the identity codec"),
            )),
        }
    }

    /// Register an identity type and hand out the identity codec.
    pub fn codec_for_identity(&self, ty: &ModelType) -> Result<Arc<IdentityCodec>, BindingError> {
        if !matches!(ty.kind(), ModelKind::Identity { .. }) {
            return Err(BindingError::misuse(
                ErrorOrigin::Identity,
                format!("{ty} is not an identity type"),
            ));
        }
        self.encounter(ty);

        Ok(self.identity_codec())
    }

    /// Key codec of the keyed list `list`.
    pub fn identifier_codec_for_identifiable(
        &self,
        list: &ModelType,
    ) -> Result<Arc<IdentifierCodec>, BindingError> {
        let ModelKind::List { identifier: Some(key) } = list.kind() else {
            return Err(BindingError::misuse(
                ErrorOrigin::Registry,
                format!("{list} is not a keyed list type"),
            ));
        };
        let key = self.resolve_type(key)?;

        self.codec_for_identifier(&key)
    }

    /// Declared QName of an augmentation type.
    pub fn qname_for_augmentation(&self, ty: &ModelType) -> Result<Option<QName>, BindingError> {
        let codec = self.codec_for_augmentation(ty)?;

        Ok(codec.qname().cloned())
    }

    /// True when any cache already holds a codec for this live type.
    #[must_use]
    pub fn is_codec_available(&self, ty: &ModelType) -> bool {
        let inner = &self.inner;

        inner.containers.contains(ty)
            || inner.identifiers.contains(ty)
            || inner.choices.contains(ty)
            || inner.cases.contains(ty)
            || inner.augmentations.contains(ty)
    }

    /// Register a type and build the codec of containers and lists right
    /// away. Failures are logged, not returned.
    pub fn on_model_type_encountered(&self, ty: &ModelType) {
        self.encounter(ty);

        if matches!(ty.kind(), ModelKind::Container | ModelKind::List { .. })
            && let Err(err) = self.container_codec(ty)
        {
            error!(ty = %ty, error = %err, "failed to build codec for encountered type");
        }
    }

    /// Register a type without building anything.
    pub fn on_type_processed(&self, ty: &ModelType) {
        self.encounter(ty);
    }

    /// Record that `path` was instantiated with `ty`.
    pub fn put_path_to_class(&self, path: SchemaPath, ty: &ModelType) {
        trace!(path = %path, ty = %ty, "recorded instantiated path");
        self.inner.types.put_path(path, ty);
    }

    /// Drop entries whose model type died; returns how many were removed.
    pub fn reclaim(&self) -> usize {
        let inner = &self.inner;
        let removed = inner.containers.purge()
            + inner.identifiers.purge()
            + inner.choices.purge()
            + inner.cases.purge()
            + inner.augmentables.purge()
            + inner.augmentations.purge()
            + inner.identity.purge()
            + inner.types.purge();

        if removed > 0 {
            inner.metrics.record(MetricsEvent::Reclaimed {
                entries: removed as u64,
            });
            debug!(removed, "reclaimed codec entries");
        }

        removed
    }

    ///
    /// CONVENIENCE
    ///

    /// Serialize a container or list object into its composite.
    pub fn serialize(&self, object: &dyn DataObject) -> Result<WireNode, BindingError> {
        CodecContext::new(self).serialize_child(object)
    }

    pub fn deserialize(
        &self,
        ty: &ModelType,
        node: &WireNode,
    ) -> Result<Option<ModelObject>, BindingError> {
        CodecContext::new(self).deserialize_child(ty, node)
    }

    ///
    /// INTERNAL
    ///

    fn encounter(&self, ty: &ModelType) {
        if self.inner.types.encounter(ty) {
            trace!(ty = %ty, kind = ?ty.kind(), "encountered model type");
        }
    }

    fn mixins(&self) -> CodecMixins {
        CodecMixins::new(self.identity_codec())
    }

    fn record(&self, event: MetricsEvent) {
        self.inner.metrics.record(event);
    }

    // counts inserts and runs the periodic sweep
    fn after_insert(&self, kind: CodecKind, ty: &ModelType) {
        trace!(kind = %kind, ty = %ty, "cached codec");

        let interval = self.inner.config.reclaim_interval;
        if interval == 0 {
            return;
        }
        let inserts = self.inner.inserts.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if inserts % interval == 0 {
            self.reclaim();
        }
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;

        f.debug_struct("CodecRegistry")
            .field("generation", &self.index().map(|index| index.generation()))
            .field("types", &inner.types.len())
            .field("containers", &inner.containers.len())
            .field("choices", &inner.choices.len())
            .field("cases", &inner.case_entries.len())
            .field("augmentations", &inner.augmentations.len())
            .finish_non_exhaustive()
    }
}
