use crate::{
    codec::{AugmentableCodec, CodecHandle, container::splice_augmentations},
    error::{BindingError, ErrorOrigin},
    identity::IdentityCodec,
    model::{DataObject, ModelObject, ModelType},
    registry::CodecRegistry,
    wire::WireNode,
};
use schemabind_schema::{path::SchemaPath, types::TypeDescriptor};
use std::sync::Arc;
use tracing::warn;

///
/// CodecContext
///
/// What a primitive codec may call back into while it runs: nested
/// containers, case dispatch, identities and the augmentations of the
/// composite currently being read.
///

#[derive(Clone, Debug)]
pub struct CodecContext<'a> {
    registry: &'a CodecRegistry,
    augmentable: Option<Arc<AugmentableCodec>>,
}

impl<'a> CodecContext<'a> {
    #[must_use]
    pub const fn new(registry: &'a CodecRegistry) -> Self {
        Self {
            registry,
            augmentable: None,
        }
    }

    pub(crate) const fn scoped(
        registry: &'a CodecRegistry,
        augmentable: Option<Arc<AugmentableCodec>>,
    ) -> Self {
        Self { registry, augmentable }
    }

    #[must_use]
    pub const fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    #[must_use]
    pub fn identity(&self) -> Arc<IdentityCodec> {
        self.registry.identity_codec()
    }

    /// Live type for a descriptor, loading it when needed.
    pub fn resolve_type(&self, descriptor: &TypeDescriptor) -> Result<ModelType, BindingError> {
        self.registry.resolve_type(descriptor)
    }

    /// Type bound to an exact schema path.
    pub fn type_for_path(&self, path: &SchemaPath) -> Result<ModelType, BindingError> {
        self.registry.type_for_path(path)
    }

    /// Serialize a nested container or list entry.
    pub fn serialize_child(&self, object: &dyn DataObject) -> Result<WireNode, BindingError> {
        match self.registry.codec_for(object.model_type())? {
            CodecHandle::Container(codec) => codec.serialize(object, self.registry),
            other => Err(BindingError::misuse(
                ErrorOrigin::Codec,
                format!("{} is a {} type, not a data container", object.model_type(), other.kind()),
            )),
        }
    }

    pub fn deserialize_child(
        &self,
        ty: &ModelType,
        node: &WireNode,
    ) -> Result<Option<ModelObject>, BindingError> {
        match self.registry.codec_for(ty)? {
            CodecHandle::Container(codec) => codec.deserialize(node, self.registry),
            other => Err(BindingError::misuse(
                ErrorOrigin::Codec,
                format!("{ty} is a {} type, not a data container", other.kind()),
            )),
        }
    }

    /// Children a case object contributes to its parent composite,
    /// followed by those of the case's augmentations.
    pub fn serialize_case(&self, object: &dyn DataObject) -> Result<Vec<WireNode>, BindingError> {
        let ty = object.model_type();
        let entry = self.registry.case_codec(ty)?;
        let activation = self.registry.activate_case(&entry)?;
        let augmentable = self.registry.augmentable_codec(ty)?;

        let cx = Self::scoped(self.registry, augmentable.clone());
        let mut children = activation.codec().serialize(object, &cx)?;
        splice_augmentations(object, augmentable.as_ref(), &cx, &mut children);

        Ok(children)
    }

    /// Pick the case of `choice` present in `parent` and read it. Fails
    /// with an ambiguity error when no case accepts the children.
    pub fn deserialize_case(
        &self,
        choice: &ModelType,
        parent: &WireNode,
    ) -> Result<Option<ModelObject>, BindingError> {
        let entry = self.registry.resolve_case(choice, parent)?;
        let activation = self.registry.activate_case(&entry)?;
        let augmentable = match activation.model_type() {
            Some(case_type) => self.registry.augmentable_codec(&case_type)?,
            None => None,
        };

        activation
            .codec()
            .deserialize(parent, &Self::scoped(self.registry, augmentable))
    }

    /// Every known augmentation of the composite being read that finds
    /// its data in `node`. Augmentations without data are omitted.
    #[must_use]
    pub fn augmentations(&self, node: &WireNode) -> Vec<ModelObject> {
        let Some(augmentable) = &self.augmentable else {
            return Vec::new();
        };
        let cx = Self::new(self.registry);

        augmentable
            .entries()
            .into_iter()
            .filter(|entry| entry.is_live())
            .filter_map(|entry| match entry.deserialize(node, &cx) {
                Ok(found) => found,
                Err(err) => {
                    warn!(
                        augmentation = %entry.descriptor(),
                        node = %node.qname(),
                        error = %err,
                        "skipping augmentation that failed to deserialize"
                    );
                    None
                }
            })
            .collect()
    }
}

///
/// CodecMixins
///
/// Shared sub-codecs handed to a primitive codec before it is published.
///

#[derive(Clone, Debug)]
pub struct CodecMixins {
    identity: Arc<IdentityCodec>,
}

impl CodecMixins {
    pub(crate) const fn new(identity: Arc<IdentityCodec>) -> Self {
        Self { identity }
    }

    #[must_use]
    pub fn identity(&self) -> Arc<IdentityCodec> {
        Arc::clone(&self.identity)
    }
}
