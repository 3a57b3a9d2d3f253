//! Module: codec
//! Responsibility: typed adapters around generated primitive codecs, and the
//! weak-keyed cache they are stored in.
//! Does not own: resolution or generation (see `registry`).
//!
//! Invariants:
//! - Adapters hold only weak handles to model types.
//! - Choice and case entries are never used for direct serialization;
//!   they are reached through case dispatch on `CodecContext`.

mod augment;
mod cache;
mod choice;
mod container;
mod context;

pub use augment::{AugmentableCodec, AugmentationCodec};
pub use cache::WeakCache;
pub use choice::{CaseActivation, CaseCodec, CaseMatcher, ChoiceCodec, CodecState};
pub use container::{DataContainerCodec, IdentifierCodec};
pub use context::{CodecContext, CodecMixins};

use crate::{
    error::{BindingError, ErrorOrigin},
    model::{DataObject, ModelObject},
    registry::CodecRegistry,
    wire::WireNode,
};
use derive_more::Display;
use std::sync::Arc;

///
/// CodecKind
///
/// One per registry cache.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[remain::sorted]
pub enum CodecKind {
    #[display("augmentable")]
    Augmentable,
    #[display("augmentation")]
    Augmentation,
    #[display("case")]
    Case,
    #[display("choice")]
    Choice,
    #[display("container")]
    Container,
    #[display("identifier")]
    Identifier,
}

///
/// CodecHandle
///
/// Codec returned by [`CodecRegistry::codec_for`], tagged by kind.
///

#[derive(Clone, Debug)]
#[remain::sorted]
pub enum CodecHandle {
    Augmentation(Arc<AugmentationCodec>),
    Case(Arc<CaseCodec>),
    Choice(Arc<ChoiceCodec>),
    Container(Arc<DataContainerCodec>),
    Identifier(Arc<IdentifierCodec>),
}

impl CodecHandle {
    #[must_use]
    pub const fn kind(&self) -> CodecKind {
        match self {
            Self::Augmentation(_) => CodecKind::Augmentation,
            Self::Case(_) => CodecKind::Case,
            Self::Choice(_) => CodecKind::Choice,
            Self::Container(_) => CodecKind::Container,
            Self::Identifier(_) => CodecKind::Identifier,
        }
    }

    /// Same cached instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Augmentation(a), Self::Augmentation(b)) => Arc::ptr_eq(a, b),
            (Self::Case(a), Self::Case(b)) => Arc::ptr_eq(a, b),
            (Self::Choice(a), Self::Choice(b)) => Arc::ptr_eq(a, b),
            (Self::Container(a), Self::Container(b)) => Arc::ptr_eq(a, b),
            (Self::Identifier(a), Self::Identifier(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_container(&self) -> Option<&Arc<DataContainerCodec>> {
        match self {
            Self::Container(codec) => Some(codec),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_choice(&self) -> Option<&Arc<ChoiceCodec>> {
        match self {
            Self::Choice(codec) => Some(codec),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_case(&self) -> Option<&Arc<CaseCodec>> {
        match self {
            Self::Case(codec) => Some(codec),
            _ => None,
        }
    }

    /// Wire form of `object`. Containers yield one composite; identifiers
    /// and augmentations yield the children they contribute.
    pub fn serialize(
        &self,
        object: &dyn DataObject,
        registry: &CodecRegistry,
    ) -> Result<Vec<WireNode>, BindingError> {
        let cx = CodecContext::new(registry);

        match self {
            Self::Augmentation(codec) => codec.serialize(object, &cx),
            Self::Container(codec) => codec.serialize(object, registry).map(|node| vec![node]),
            Self::Identifier(codec) => codec.serialize(object, &cx),
            Self::Case(_) | Self::Choice(_) => Err(self.dispatch_only()),
        }
    }

    pub fn deserialize(
        &self,
        node: &WireNode,
        registry: &CodecRegistry,
    ) -> Result<Option<ModelObject>, BindingError> {
        let cx = CodecContext::new(registry);

        match self {
            Self::Augmentation(codec) => codec.deserialize(node, &cx),
            Self::Container(codec) => codec.deserialize(node, registry),
            Self::Identifier(codec) => codec.deserialize(node, &cx),
            Self::Case(_) | Self::Choice(_) => Err(self.dispatch_only()),
        }
    }

    fn dispatch_only(&self) -> BindingError {
        BindingError::misuse(
            ErrorOrigin::Choice,
            format!("{} codecs are only used through case dispatch", self.kind()),
        )
    }
}
