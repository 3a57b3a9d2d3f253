//! Module: identity
//! Responsibility: map identity types to their QNames and back.
//! Does not own: the schema index (read through the shared swap slot).
//!
//! Unknown QNames are a recoverable absence: they resolve to `None` and
//! are logged, never surfaced as errors.

use crate::{
    codec::WeakCache,
    error::{BindingError, ErrorOrigin},
    index::SchemaIndex,
    loader::TypeLoader,
    model::{ModelKind, ModelType, TypeRegistry},
    obs::{MetricsEvent, MetricsSink, RegistryMetrics},
};
use arc_swap::ArcSwapOption;
use schemabind_schema::{qname::QName, types::TypeDescriptor};
use std::{fmt, sync::Arc};
use tracing::{trace, warn};

///
/// IdentityCodec
///

pub struct IdentityCodec {
    index: Arc<ArcSwapOption<SchemaIndex>>,
    types: Arc<TypeRegistry>,
    loader: Arc<dyn TypeLoader>,
    metrics: Arc<RegistryMetrics>,
    qnames: WeakCache<QName>,
}

impl IdentityCodec {
    pub(crate) fn new(
        index: Arc<ArcSwapOption<SchemaIndex>>,
        types: Arc<TypeRegistry>,
        loader: Arc<dyn TypeLoader>,
        metrics: Arc<RegistryMetrics>,
    ) -> Self {
        Self {
            index,
            types,
            loader,
            metrics,
            qnames: WeakCache::new(),
        }
    }

    /// QName of an identity type. `Ok(None)` when neither the schema nor
    /// the type declares one.
    pub fn serialize(&self, ty: &ModelType) -> Result<Option<QName>, BindingError> {
        if !matches!(ty.kind(), ModelKind::Identity { .. }) {
            return Err(BindingError::misuse(
                ErrorOrigin::Identity,
                format!("{ty} is not an identity type"),
            ));
        }
        if let Some(qname) = self.qnames.get(ty) {
            return Ok(Some((*qname).clone()));
        }

        let index = self.index.load_full();
        let qname = index
            .as_deref()
            .and_then(|index| index.identity_qname(ty.descriptor()).cloned())
            .or_else(|| ty.qname.clone());

        if let Some(qname) = &qname {
            self.qnames.insert_if_absent(ty, Arc::new(qname.clone()));
        }

        Ok(qname)
    }

    /// Identity type registered for `qname`, loading it when no live type
    /// is known.
    #[must_use]
    pub fn deserialize(&self, qname: &QName) -> Option<ModelType> {
        let descriptor = self
            .index
            .load_full()
            .and_then(|index| index.identity_type(qname).cloned());

        let Some(descriptor) = descriptor else {
            self.unresolved(qname, "no identity is bound to this name");
            return None;
        };

        if let Some(ty) = self.types.resolve(&descriptor) {
            return Some(ty);
        }

        match self.load(&descriptor) {
            Ok(ty) => {
                trace!(identity = %qname, ty = %ty, "loaded identity type");
                Some(ty)
            }
            Err(err) => {
                self.unresolved(qname, &err.to_string());
                None
            }
        }
    }

    pub(crate) fn purge(&self) -> usize {
        self.qnames.purge()
    }

    fn load(&self, descriptor: &TypeDescriptor) -> Result<ModelType, BindingError> {
        let ty = self.loader.load_type(&descriptor.fully_qualified_name())?;
        if !matches!(ty.kind(), ModelKind::Identity { .. }) {
            return Err(BindingError::misuse(
                ErrorOrigin::Identity,
                format!("loader returned {ty}, which is not an identity type"),
            ));
        }
        self.types.encounter(&ty);

        Ok(ty)
    }

    fn unresolved(&self, qname: &QName, reason: &str) {
        warn!(identity = %qname, reason, "unresolved identity");
        self.metrics.record(MetricsEvent::UnresolvedIdentity);
    }
}

impl fmt::Debug for IdentityCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCodec")
            .field("cached", &self.qnames.len())
            .finish_non_exhaustive()
    }
}
