//! Module: model
//! Responsibility: runtime handles for loaded model types and the object
//! trait generated data implements.
//! Does not own: loading (see `loader`) or codec state.
//!
//! Invariants:
//! - A `ModelType` is one loaded type; two handles are equal iff they
//!   point at the same allocation.
//! - Caches hold `WeakModelType` only, so a type becomes unreachable once
//!   callers and its loader drop it.

mod registry;


pub use registry::TypeRegistry;

use schemabind_schema::{qname::QName, types::TypeDescriptor};
use std::{
    any::Any,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::{Arc, Weak},
};

///
/// ModelKind
///
/// Which binding construct a model type was generated for.
///

#[derive(Clone, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ModelKind {
    /// Extension contributed by another module; `target` is the augmented type.
    Augmentation { target: Option<TypeDescriptor> },
    Case,
    Choice,
    Container,
    /// Key of a keyed list.
    Identifier,
    Identity { base: Option<TypeDescriptor> },
    List { identifier: Option<TypeDescriptor> },
}

///
/// ModelClass
///
/// Metadata of one loaded model type.
///

#[derive(Debug)]
pub struct ModelClass {
    pub descriptor: TypeDescriptor,
    pub kind: ModelKind,

    /// Declared schema name, when the type has one.
    pub qname: Option<QName>,

    /// Implemented interfaces; a case lists its choice here.
    pub supertypes: Vec<TypeDescriptor>,

    /// Accepts augmentations from other modules.
    pub augmentable: bool,
}

impl ModelClass {
    #[must_use]
    pub const fn new(descriptor: TypeDescriptor, kind: ModelKind) -> Self {
        Self {
            descriptor,
            kind,
            qname: None,
            supertypes: Vec::new(),
            augmentable: false,
        }
    }

    #[must_use]
    pub fn with_qname(mut self, qname: QName) -> Self {
        self.qname = Some(qname);
        self
    }

    #[must_use]
    pub fn with_supertype(mut self, supertype: TypeDescriptor) -> Self {
        self.supertypes.push(supertype);
        self
    }

    #[must_use]
    pub const fn augmentable(mut self) -> Self {
        self.augmentable = true;
        self
    }

    #[must_use]
    pub fn implements(&self, descriptor: &TypeDescriptor) -> bool {
        self.supertypes.contains(descriptor)
    }
}

///
/// ModelType
///
/// Strong handle on a loaded model type.
///

#[derive(Clone)]
pub struct ModelType(Arc<ModelClass>);

impl ModelType {
    #[must_use]
    pub fn new(class: ModelClass) -> Self {
        Self(Arc::new(class))
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakModelType {
        WeakModelType(Arc::downgrade(&self.0))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.0.descriptor
    }

    #[must_use]
    pub fn kind(&self) -> &ModelKind {
        &self.0.kind
    }

    fn as_ptr(&self) -> *const ModelClass {
        Arc::as_ptr(&self.0)
    }
}

impl Deref for ModelType {
    type Target = ModelClass;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ModelType {}

impl Hash for ModelType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor().hash(state);
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelType({})", self.descriptor())
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.descriptor(), f)
    }
}

///
/// WeakModelType
///

#[derive(Clone, Debug, Default)]
pub struct WeakModelType(Weak<ModelClass>);

impl WeakModelType {
    #[must_use]
    pub fn upgrade(&self) -> Option<ModelType> {
        self.0.upgrade().map(ModelType)
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// True when this handle was taken from `ty`. The weak reference keeps
    /// the allocation reserved, so a dead handle never aliases a new type.
    #[must_use]
    pub fn points_to(&self, ty: &ModelType) -> bool {
        std::ptr::eq(self.0.as_ptr(), ty.as_ptr())
    }
}

///
/// DataObject
///
/// An instance of a generated model type.
///

pub trait DataObject: Any + fmt::Debug + Send + Sync {
    fn model_type(&self) -> &ModelType;

    /// Augmentation objects attached to this instance, in encounter order.
    fn augmentations(&self) -> &[ModelObject] {
        &[]
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle on a model object.
pub type ModelObject = Arc<dyn DataObject>;
