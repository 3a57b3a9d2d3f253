use crate::{
    codec::{AugmentableCodec, CodecContext},
    error::{BindingError, ErrorOrigin},
    generator::PrimitiveCodec,
    model::{DataObject, ModelObject, ModelType, WeakModelType},
    registry::CodecRegistry,
    wire::WireNode,
};
use schemabind_schema::{qname::QName, types::TypeDescriptor};
use std::{fmt, sync::Arc};
use tracing::warn;

///
/// DataContainerCodec
///
/// Adapter for container and list types. Wraps the generated codec's
/// children in a composite named after the node and splices in the
/// children of bound augmentations.
///

pub struct DataContainerCodec {
    descriptor: TypeDescriptor,
    ty: WeakModelType,
    qname: QName,
    codec: Arc<dyn PrimitiveCodec>,
    augmentable: Option<Arc<AugmentableCodec>>,
}

impl DataContainerCodec {
    #[must_use]
    pub fn new(
        ty: &ModelType,
        qname: QName,
        codec: Arc<dyn PrimitiveCodec>,
        augmentable: Option<Arc<AugmentableCodec>>,
    ) -> Self {
        Self {
            descriptor: ty.descriptor().clone(),
            ty: ty.downgrade(),
            qname,
            codec,
            augmentable,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn qname(&self) -> &QName {
        &self.qname
    }

    #[must_use]
    pub fn model_type(&self) -> Option<ModelType> {
        self.ty.upgrade()
    }

    #[must_use]
    pub const fn augmentable(&self) -> Option<&Arc<AugmentableCodec>> {
        self.augmentable.as_ref()
    }

    pub fn serialize(
        &self,
        object: &dyn DataObject,
        registry: &CodecRegistry,
    ) -> Result<WireNode, BindingError> {
        if object.model_type().descriptor() != &self.descriptor {
            return Err(BindingError::misuse(
                ErrorOrigin::Codec,
                format!(
                    "codec for {} cannot serialize an instance of {}",
                    self.descriptor,
                    object.model_type()
                ),
            ));
        }

        let cx = CodecContext::scoped(registry, self.augmentable.clone());
        let mut children = self.codec.serialize(object, &cx)?;
        splice_augmentations(object, self.augmentable.as_ref(), &cx, &mut children);

        Ok(WireNode::composite(self.qname.clone(), children))
    }

    pub fn deserialize(
        &self,
        node: &WireNode,
        registry: &CodecRegistry,
    ) -> Result<Option<ModelObject>, BindingError> {
        if !node.is_composite() {
            return Err(BindingError::invalid_input(format!(
                "{} expects a composite node, found leaf '{}'",
                self.descriptor,
                node.qname()
            )));
        }

        let cx = CodecContext::scoped(registry, self.augmentable.clone());
        self.codec.deserialize(node, &cx)
    }
}

impl fmt::Debug for DataContainerCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataContainerCodec")
            .field("descriptor", &self.descriptor)
            .field("qname", &self.qname)
            .field("augmentable", &self.augmentable.is_some())
            .finish_non_exhaustive()
    }
}

/// Append the children of every augmentation on `object` bound to
/// `augmentable`, in encounter order. Failing or unbound augmentations
/// are logged and skipped.
pub(crate) fn splice_augmentations(
    object: &dyn DataObject,
    augmentable: Option<&Arc<AugmentableCodec>>,
    cx: &CodecContext<'_>,
    out: &mut Vec<WireNode>,
) {
    for augmentation in object.augmentations() {
        let augmentation_type = augmentation.model_type();
        let codec = match cx.registry().codec_for_augmentation(augmentation_type) {
            Ok(codec) => codec,
            Err(err) => {
                warn!(
                    target_type = %object.model_type(),
                    augmentation = %augmentation_type,
                    error = %err,
                    "skipping augmentation without a codec"
                );
                continue;
            }
        };

        if !augmentable.is_some_and(|augmentable| augmentable.contains(&codec)) {
            warn!(
                target_type = %object.model_type(),
                augmentation = %augmentation_type,
                "skipping augmentation not bound to this type"
            );
            continue;
        }

        match codec.serialize(augmentation.as_ref(), &CodecContext::new(cx.registry())) {
            Ok(children) => out.extend(children),
            Err(err) => warn!(
                target_type = %object.model_type(),
                augmentation = %augmentation_type,
                error = %err,
                "skipping augmentation that failed to serialize"
            ),
        }
    }
}

///
/// IdentifierCodec
///
/// Adapter for list key types; keys serialize to the key leaves of their
/// list entry.
///

pub struct IdentifierCodec {
    descriptor: TypeDescriptor,
    codec: Arc<dyn PrimitiveCodec>,
}

impl IdentifierCodec {
    #[must_use]
    pub fn new(ty: &ModelType, codec: Arc<dyn PrimitiveCodec>) -> Self {
        Self {
            descriptor: ty.descriptor().clone(),
            codec,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn serialize(
        &self,
        key: &dyn DataObject,
        cx: &CodecContext<'_>,
    ) -> Result<Vec<WireNode>, BindingError> {
        self.codec.serialize(key, cx)
    }

    /// Read a key from a list entry composite.
    pub fn deserialize(
        &self,
        entry: &WireNode,
        cx: &CodecContext<'_>,
    ) -> Result<Option<ModelObject>, BindingError> {
        self.codec.deserialize(entry, cx)
    }
}

impl fmt::Debug for IdentifierCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierCodec")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
