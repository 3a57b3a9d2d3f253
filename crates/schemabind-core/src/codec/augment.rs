use crate::{
    codec::CodecContext,
    error::BindingError,
    generator::PrimitiveCodec,
    model::{DataObject, ModelObject, ModelType, WeakModelType},
    wire::WireNode,
};
use parking_lot::RwLock;
use schemabind_schema::{qname::QName, types::TypeDescriptor};
use std::{fmt, sync::Arc};

///
/// AugmentableCodec
///
/// Augmentations known to extend one augmentable type, in the order they
/// were first registered. Grows as augmentation codecs are resolved.
///

#[derive(Debug)]
pub struct AugmentableCodec {
    descriptor: TypeDescriptor,
    entries: RwLock<Vec<Arc<AugmentationCodec>>>,
}

impl AugmentableCodec {
    #[must_use]
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            entries: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Register an augmentation codec. An entry for the same descriptor is
    /// kept while its type is alive and replaced once it died.
    pub fn register(&self, codec: Arc<AugmentationCodec>) -> bool {
        let mut entries = self.entries.write();
        match entries
            .iter_mut()
            .find(|known| known.descriptor() == codec.descriptor())
        {
            Some(known) if known.is_live() => false,
            Some(known) => {
                *known = codec;
                true
            }
            None => {
                entries.push(codec);
                true
            }
        }
    }

    #[must_use]
    pub fn contains(&self, codec: &Arc<AugmentationCodec>) -> bool {
        self.entries.read().iter().any(|known| Arc::ptr_eq(known, codec))
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Arc<AugmentationCodec>> {
        self.entries.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

///
/// AugmentationCodec
///

pub struct AugmentationCodec {
    descriptor: TypeDescriptor,
    ty: WeakModelType,
    qname: Option<QName>,
    codec: Arc<dyn PrimitiveCodec>,
}

impl AugmentationCodec {
    #[must_use]
    pub fn new(ty: &ModelType, qname: Option<QName>, codec: Arc<dyn PrimitiveCodec>) -> Self {
        Self {
            descriptor: ty.descriptor().clone(),
            ty: ty.downgrade(),
            qname,
            codec,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Declared name of the augmentation, when its type carries one.
    #[must_use]
    pub const fn qname(&self) -> Option<&QName> {
        self.qname.as_ref()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.ty.is_live()
    }

    /// Children this augmentation splices into its target's composite.
    pub fn serialize(
        &self,
        object: &dyn DataObject,
        cx: &CodecContext<'_>,
    ) -> Result<Vec<WireNode>, BindingError> {
        self.codec.serialize(object, cx)
    }

    /// Extract this augmentation from the target's composite.
    pub fn deserialize(
        &self,
        node: &WireNode,
        cx: &CodecContext<'_>,
    ) -> Result<Option<ModelObject>, BindingError> {
        self.codec.deserialize(node, cx)
    }
}

impl fmt::Debug for AugmentationCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AugmentationCodec")
            .field("descriptor", &self.descriptor)
            .field("qname", &self.qname)
            .finish_non_exhaustive()
    }
}
