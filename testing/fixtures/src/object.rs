use schemabind::prelude::*;
use std::{any::Any, sync::Arc};

///
/// FixtureValue
///
/// One field of a fixture object, keyed by the schema name of the node it
/// maps to. A choice field is keyed by the choice name and holds the case.
///

#[derive(Clone, Debug)]
#[remain::sorted]
pub enum FixtureValue {
    Case(ModelObject),
    Child(ModelObject),
    Entries(Vec<ModelObject>),
    Identity(ModelType),
    Leaf(WireValue),
    LeafSet(Vec<WireValue>),
}

impl FixtureValue {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Case(_) => "case",
            Self::Child(_) => "child",
            Self::Entries(_) => "entries",
            Self::Identity(_) => "identity",
            Self::Leaf(_) => "leaf",
            Self::LeafSet(_) => "leaf-set",
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&FixtureObject> {
        match self {
            Self::Case(object) | Self::Child(object) => FixtureObject::downcast(object.as_ref()),
            _ => None,
        }
    }
}

impl PartialEq for FixtureValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Case(a), Self::Case(b)) | (Self::Child(a), Self::Child(b)) => same_object(a, b),
            (Self::Entries(a), Self::Entries(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_object(a, b))
            }
            (Self::Identity(a), Self::Identity(b)) => a == b,
            (Self::Leaf(a), Self::Leaf(b)) => a == b,
            (Self::LeafSet(a), Self::LeafSet(b)) => a == b,
            _ => false,
        }
    }
}

///
/// FixtureObject
///
/// Generic data object for any generated type: a field list plus the
/// augmentations attached to it.
///

#[derive(Clone, Debug)]
pub struct FixtureObject {
    ty: ModelType,
    fields: Vec<(QName, FixtureValue)>,
    augmentations: Vec<ModelObject>,
}

impl FixtureObject {
    #[must_use]
    pub const fn new(ty: ModelType) -> Self {
        Self {
            ty,
            fields: Vec::new(),
            augmentations: Vec::new(),
        }
    }

    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(mut self, qname: QName, value: FixtureValue) -> Self {
        self.set(qname, value);
        self
    }

    #[must_use]
    pub fn with_augmentation(mut self, augmentation: ModelObject) -> Self {
        self.augmentations.push(augmentation);
        self
    }

    /// Set a field, replacing any earlier value under the same name.
    pub fn set(&mut self, qname: QName, value: FixtureValue) {
        match self.fields.iter_mut().find(|(name, _)| *name == qname) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((qname, value)),
        }
    }

    pub fn push_augmentation(&mut self, augmentation: ModelObject) {
        self.augmentations.push(augmentation);
    }

    #[must_use]
    pub fn into_object(self) -> ModelObject {
        Arc::new(self)
    }

    #[must_use]
    pub fn downcast(object: &dyn DataObject) -> Option<&Self> {
        object.as_any().downcast_ref()
    }

    #[must_use]
    pub fn field(&self, qname: &QName) -> Option<&FixtureValue> {
        self.fields
            .iter()
            .find_map(|(name, value)| (name == qname).then_some(value))
    }

    #[must_use]
    pub fn fields(&self) -> &[(QName, FixtureValue)] {
        &self.fields
    }

    #[must_use]
    pub fn leaf(&self, qname: &QName) -> Option<&WireValue> {
        match self.field(qname)? {
            FixtureValue::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Case object selected for the choice named `choice`.
    #[must_use]
    pub fn case(&self, choice: &QName) -> Option<&Self> {
        match self.field(choice)? {
            FixtureValue::Case(case) => Self::downcast(case.as_ref()),
            _ => None,
        }
    }

    /// Attached augmentation of type `descriptor`.
    #[must_use]
    pub fn augmentation(&self, descriptor: &TypeDescriptor) -> Option<&Self> {
        self.augmentations
            .iter()
            .find(|augmentation| augmentation.model_type().descriptor() == descriptor)
            .and_then(|augmentation| Self::downcast(augmentation.as_ref()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.augmentations.is_empty()
    }
}

impl DataObject for FixtureObject {
    fn model_type(&self) -> &ModelType {
        &self.ty
    }

    fn augmentations(&self) -> &[ModelObject] {
        &self.augmentations
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// field and augmentation order is not significant
impl PartialEq for FixtureObject {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(name, value)| other.field(name) == Some(value))
            && self.augmentations.len() == other.augmentations.len()
            && self
                .augmentations
                .iter()
                .all(|mine| other.augmentations.iter().any(|theirs| same_object(mine, theirs)))
    }
}

fn same_object(a: &ModelObject, b: &ModelObject) -> bool {
    match (FixtureObject::downcast(a.as_ref()), FixtureObject::downcast(b.as_ref())) {
        (Some(a), Some(b)) => a == b,
        _ => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn qn(local: &str) -> QName {
        QName::new("urn:fixture:object", None, local).expect("qname should build")
    }

    fn ty(name: &str) -> ModelType {
        let descriptor =
            TypeDescriptor::new("fixture.object", name).expect("descriptor should build");

        ModelType::new(ModelClass::new(descriptor, ModelKind::Container))
    }

    #[test]
    fn set_replaces_fields_in_place() {
        let mut object = FixtureObject::new(ty("Root"))
            .with(qn("a"), FixtureValue::Leaf(WireValue::Int(1)))
            .with(qn("b"), FixtureValue::Leaf(WireValue::Int(2)));
        object.set(qn("a"), FixtureValue::Leaf(WireValue::Int(3)));

        assert_eq!(object.fields().len(), 2);
        assert_eq!(object.leaf(&qn("a")), Some(&WireValue::Int(3)));
        assert_eq!(object.fields()[0].0, qn("a"));
    }

    #[test]
    fn equality_ignores_field_and_augmentation_order() {
        let root = ty("Root");
        let aug_a = FixtureObject::new(ty("AugA")).into_object();
        let aug_b = FixtureObject::new(ty("AugB")).into_object();

        let left = FixtureObject::new(root.clone())
            .with(qn("a"), FixtureValue::Leaf(WireValue::Int(1)))
            .with(qn("b"), FixtureValue::Leaf(WireValue::Bool(true)))
            .with_augmentation(Arc::clone(&aug_a))
            .with_augmentation(Arc::clone(&aug_b));
        let right = FixtureObject::new(root)
            .with(qn("b"), FixtureValue::Leaf(WireValue::Bool(true)))
            .with(qn("a"), FixtureValue::Leaf(WireValue::Int(1)))
            .with_augmentation(aug_b)
            .with_augmentation(aug_a);

        assert_eq!(left, right);
    }

    #[test]
    fn objects_of_distinct_types_differ() {
        let left = FixtureObject::new(ty("Root"));
        let right = FixtureObject::new(ty("Root"));

        assert_ne!(left, right, "types are compared by identity, not by name");
    }

    #[test]
    fn nested_objects_are_reachable() {
        let case = FixtureObject::new(ty("A"))
            .with(qn("x"), FixtureValue::Leaf(WireValue::Int(5)))
            .into_object();
        let root = FixtureObject::new(ty("Root")).with(qn("pick"), FixtureValue::Case(case));

        let case = root.case(&qn("pick")).expect("case should be set");
        assert_eq!(case.leaf(&qn("x")), Some(&WireValue::Int(5)));
        assert!(root.case(&qn("other")).is_none());
    }
}
