//! Module: generator
//! Responsibility: the seam to whatever produces primitive per-type codecs.
//! Does not own: caching or adapter wrapping (see `registry`, `codec`).

use crate::{
    codec::{CodecContext, CodecMixins},
    error::BindingError,
    model::{DataObject, ModelObject, ModelType},
    wire::WireNode,
};
use schemabind_schema::{
    context::SchemaContext,
    module::{AugmentationSchema, IdentitySchema},
    node::{Case, NodeRef},
    types::TypeDescriptor,
};
use thiserror::Error as ThisError;

///
/// PrimitiveCodec
///
/// Per-type codec produced by a generator. Implementations must not hold
/// strong handles to their own model type, or the type never becomes
/// reclaimable.
///

pub trait PrimitiveCodec: Send + Sync {
    /// Registration callback, run once before the codec is published.
    fn prepare(&mut self, _mixins: &CodecMixins) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Children contributed by `object`. Containers return their own
    /// children; cases and augmentations return what they splice into the
    /// parent composite.
    fn serialize(
        &self,
        object: &dyn DataObject,
        cx: &CodecContext<'_>,
    ) -> Result<Vec<WireNode>, BindingError>;

    /// Rebuild an object from `node`. `Ok(None)` means the node carries
    /// nothing for this codec.
    fn deserialize(
        &self,
        node: &WireNode,
        cx: &CodecContext<'_>,
    ) -> Result<Option<ModelObject>, BindingError>;
}

///
/// CodecFactory
///

pub trait CodecFactory: Send {
    fn instantiate(self: Box<Self>) -> Result<Box<dyn PrimitiveCodec>, GenerationError>;
}

///
/// SchemaRef
///
/// Schema declaration a model type was generated from.
///

#[derive(Clone, Copy, Debug)]
pub enum SchemaRef<'a> {
    Augmentation(&'a AugmentationSchema),
    Identity(&'a IdentitySchema),
    Node(NodeRef<'a>),
    Unbound,
}

///
/// GenerationInput
///

#[derive(Clone, Copy, Debug)]
pub struct GenerationInput<'a> {
    pub model_type: &'a ModelType,
    pub context: &'a SchemaContext,
    pub schema: SchemaRef<'a>,
}

impl GenerationInput<'_> {
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.model_type.descriptor()
    }
}

///
/// CodecGenerator
///

pub trait CodecGenerator: Send + Sync {
    /// Codec for a container or list type.
    fn codec_for(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError>;

    /// Codec for a list key (identifier) type.
    fn key_codec_for(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError>;

    fn augmentation_codec_for(&self, input: &GenerationInput<'_>)
    -> Result<Box<dyn CodecFactory>, GenerationError>;

    fn case_codec_for(
        &self,
        input: &GenerationInput<'_>,
        schema: &Case,
    ) -> Result<Box<dyn CodecFactory>, GenerationError>;

    fn choice_codec_for(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError>;
}

///
/// GenerationError
///

#[derive(Debug, ThisError)]
pub enum GenerationError {
    #[error("no schema bound to type {0}")]
    Unbound(TypeDescriptor),

    #[error("cannot generate a codec for {descriptor}: {reason}")]
    Unsupported {
        descriptor: TypeDescriptor,
        reason: String,
    },

    #[error("codec for {descriptor} failed to instantiate: {message}")]
    Instantiate {
        descriptor: TypeDescriptor,
        message: String,
    },
}
