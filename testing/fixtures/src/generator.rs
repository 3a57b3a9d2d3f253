//! Module: generator
//! Responsibility: schema-driven primitive codecs over `FixtureObject`.
//! Does not own: caching, case dispatch or augmentation binding; those stay
//! with the registry and are reached through the codec context.
//!
//! Invariants:
//! - Codecs hold descriptors and schema paths, never model types.
//! - A container plan skips nodes other modules augment in; augmentation
//!   codecs own those.

use crate::object::{FixtureObject, FixtureValue};
use parking_lot::Mutex;
use schemabind::{core::identity::IdentityCodec, prelude::*};
use std::{
    collections::{BTreeSet, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

///
/// FixtureGenerator
///

#[derive(Debug, Default)]
pub struct FixtureGenerator {
    generated: AtomicUsize,
    failing: Mutex<HashSet<TypeDescriptor>>,
}

impl FixtureGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Codecs built so far, discarded race losers included.
    #[must_use]
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::Relaxed)
    }

    /// Make codec instantiation for `descriptor` fail.
    pub fn fail_on(&self, descriptor: TypeDescriptor) {
        self.failing.lock().insert(descriptor);
    }

    fn build(
        &self,
        input: &GenerationInput<'_>,
        slots: Vec<Slot>,
        sparse: bool,
    ) -> Box<dyn CodecFactory> {
        let descriptor = input.descriptor().clone();
        let fail = self.failing.lock().contains(&descriptor);
        self.generated.fetch_add(1, Ordering::Relaxed);

        Box::new(FixtureFactory {
            codec: FixtureCodec {
                descriptor,
                slots,
                sparse,
                identity: None,
            },
            fail,
        })
    }
}

impl CodecGenerator for FixtureGenerator {
    fn codec_for(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        let SchemaRef::Node(node) = input.schema else {
            return Err(GenerationError::Unbound(input.descriptor().clone()));
        };
        let Some(container) = node.as_container() else {
            return Err(GenerationError::Unsupported {
                descriptor: input.descriptor().clone(),
                reason: format!("{} has no data children", node.path()),
            });
        };

        Ok(self.build(input, plan(container.children(), node.def().augmenting), false))
    }

    fn key_codec_for(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        let SchemaRef::Node(node) = input.schema else {
            return Err(GenerationError::Unbound(input.descriptor().clone()));
        };
        let Some(list) = node.as_list().filter(|list| list.is_keyed()) else {
            return Err(GenerationError::Unsupported {
                descriptor: input.descriptor().clone(),
                reason: format!("{} is not a keyed list", node.path()),
            });
        };

        let keys: Vec<_> = list
            .children
            .iter()
            .filter(|child| list.keys.contains(child.qname()))
            .map(Slot::for_node)
            .collect();

        Ok(self.build(input, keys, true))
    }

    fn augmentation_codec_for(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        let SchemaRef::Augmentation(augmentation) = input.schema else {
            return Err(GenerationError::Unbound(input.descriptor().clone()));
        };

        Ok(self.build(input, plan(&augmentation.children, true), true))
    }

    fn case_codec_for(
        &self,
        input: &GenerationInput<'_>,
        schema: &Case,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        Ok(self.build(input, plan(&schema.children, schema.def.augmenting), false))
    }

    fn choice_codec_for(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        Ok(self.build(input, Vec::new(), true))
    }
}

// nodes augmented in by other modules belong to their augmentation codec
fn plan(children: &[SchemaNode], augmenting: bool) -> Vec<Slot> {
    children
        .iter()
        .filter(|child| augmenting || !child.def().augmenting)
        .map(Slot::for_node)
        .collect()
}

///
/// FixtureFactory
///

struct FixtureFactory {
    codec: FixtureCodec,
    fail: bool,
}

impl CodecFactory for FixtureFactory {
    fn instantiate(self: Box<Self>) -> Result<Box<dyn PrimitiveCodec>, GenerationError> {
        if self.fail {
            return Err(GenerationError::Instantiate {
                descriptor: self.codec.descriptor,
                message: "instantiation disabled by the fixture".to_string(),
            });
        }

        Ok(Box::new(self.codec))
    }
}

///
/// Slot
///
/// One schema child a codec reads and writes.
///

#[derive(Debug)]
enum Slot {
    Choice {
        qname: QName,
        path: SchemaPath,
        members: BTreeSet<QName>,
    },
    Container {
        qname: QName,
        path: SchemaPath,
    },
    Leaf {
        qname: QName,
        identity: bool,
    },
    LeafSet {
        qname: QName,
    },
    List {
        qname: QName,
        path: SchemaPath,
    },
}

impl Slot {
    fn for_node(node: &SchemaNode) -> Self {
        let def = node.def();
        let qname = def.qname.clone();

        match node {
            SchemaNode::Choice(choice) => {
                let mut members = BTreeSet::new();
                collect_members(choice, &mut members);
                Self::Choice {
                    qname,
                    path: def.path.clone(),
                    members,
                }
            }
            SchemaNode::Container(_) => Self::Container {
                qname,
                path: def.path.clone(),
            },
            SchemaNode::Leaf(leaf) => Self::Leaf {
                qname,
                identity: matches!(leaf.ty, LeafType::IdentityRef { .. }),
            },
            SchemaNode::LeafList(_) => Self::LeafSet { qname },
            SchemaNode::List(_) => Self::List {
                qname,
                path: def.path.clone(),
            },
        }
    }

    const fn qname(&self) -> &QName {
        match self {
            Self::Choice { qname, .. }
            | Self::Container { qname, .. }
            | Self::Leaf { qname, .. }
            | Self::LeafSet { qname }
            | Self::List { qname, .. } => qname,
        }
    }
}

// wire names any case of the choice may contribute, nested choices included
fn collect_members(choice: &Choice, out: &mut BTreeSet<QName>) {
    for case in &choice.cases {
        for child in &case.children {
            match child {
                SchemaNode::Choice(nested) => collect_members(nested, out),
                other => {
                    out.insert(other.qname().clone());
                }
            }
        }
    }
}

///
/// FixtureCodec
///

struct FixtureCodec {
    descriptor: TypeDescriptor,
    slots: Vec<Slot>,

    /// Return `None` when the node carries none of the slots.
    sparse: bool,

    identity: Option<Arc<IdentityCodec>>,
}

impl FixtureCodec {
    fn identity(&self, cx: &CodecContext<'_>) -> Arc<IdentityCodec> {
        self.identity.clone().unwrap_or_else(|| cx.identity())
    }

    fn write(
        &self,
        slot: &Slot,
        value: &FixtureValue,
        cx: &CodecContext<'_>,
        out: &mut Vec<WireNode>,
    ) -> Result<(), BindingError> {
        match (slot, value) {
            (Slot::Leaf { qname, .. }, FixtureValue::Leaf(value)) => {
                out.push(WireNode::leaf(qname.clone(), value.clone()));
            }
            (Slot::Leaf { qname, identity: true }, FixtureValue::Identity(ty)) => {
                let name = self.identity(cx).serialize(ty)?.ok_or_else(|| {
                    BindingError::invalid_input(format!("identity {ty} has no schema name"))
                })?;
                out.push(WireNode::leaf(qname.clone(), WireValue::QName(name)));
            }
            (Slot::LeafSet { qname }, FixtureValue::LeafSet(values)) => {
                out.push(WireNode::leaf_set(qname.clone(), values.clone()));
            }
            (Slot::Container { .. }, FixtureValue::Child(child)) => {
                out.push(cx.serialize_child(child.as_ref())?);
            }
            (Slot::List { .. }, FixtureValue::Entries(entries)) => {
                for entry in entries {
                    out.push(cx.serialize_child(entry.as_ref())?);
                }
            }
            (Slot::Choice { .. }, FixtureValue::Case(case)) => {
                out.extend(cx.serialize_case(case.as_ref())?);
            }
            (slot, value) => {
                return Err(BindingError::invalid_input(format!(
                    "field '{}' of {} holds a {} value",
                    slot.qname(),
                    self.descriptor,
                    value.label()
                )));
            }
        }

        Ok(())
    }

    fn read(
        &self,
        slot: &Slot,
        node: &WireNode,
        cx: &CodecContext<'_>,
    ) -> Result<Option<FixtureValue>, BindingError> {
        let value = match slot {
            Slot::Leaf { qname, identity } => match node.child(qname) {
                None => None,
                Some(WireNode::Leaf {
                    value: WireValue::QName(name),
                    ..
                }) if *identity => self.identity(cx).deserialize(name).map(FixtureValue::Identity),
                Some(WireNode::Leaf { value, .. }) => Some(FixtureValue::Leaf(value.clone())),
                Some(other) => return Err(unexpected_shape(qname, "leaf", other)),
            },
            Slot::LeafSet { qname } => match node.child(qname) {
                None => None,
                Some(WireNode::LeafSet { values, .. }) => {
                    Some(FixtureValue::LeafSet(values.clone()))
                }
                Some(other) => return Err(unexpected_shape(qname, "leaf set", other)),
            },
            Slot::Container { qname, path } => match node.child(qname) {
                None => None,
                Some(child) => {
                    let ty = cx.type_for_path(path)?;
                    cx.deserialize_child(&ty, child)?.map(FixtureValue::Child)
                }
            },
            Slot::List { qname, path } => {
                let entries: Vec<_> = node.children_named(qname).collect();
                if entries.is_empty() {
                    None
                } else {
                    let ty = cx.type_for_path(path)?;
                    let mut objects = Vec::with_capacity(entries.len());
                    for entry in entries {
                        objects.extend(cx.deserialize_child(&ty, entry)?);
                    }
                    Some(FixtureValue::Entries(objects))
                }
            }
            Slot::Choice { path, members, .. } => {
                if node.child_qnames().any(|qname| members.contains(qname)) {
                    let ty = cx.type_for_path(path)?;
                    cx.deserialize_case(&ty, node)?.map(FixtureValue::Case)
                } else {
                    None
                }
            }
        };

        Ok(value)
    }
}

impl PrimitiveCodec for FixtureCodec {
    fn prepare(&mut self, mixins: &CodecMixins) -> Result<(), GenerationError> {
        self.identity = Some(mixins.identity());

        Ok(())
    }

    fn serialize(
        &self,
        object: &dyn DataObject,
        cx: &CodecContext<'_>,
    ) -> Result<Vec<WireNode>, BindingError> {
        let object = FixtureObject::downcast(object).ok_or_else(|| {
            BindingError::invalid_input(format!("{} is not a fixture object", object.model_type()))
        })?;

        let mut out = Vec::new();
        for slot in &self.slots {
            if let Some(value) = object.field(slot.qname()) {
                self.write(slot, value, cx, &mut out)?;
            }
        }

        Ok(out)
    }

    fn deserialize(
        &self,
        node: &WireNode,
        cx: &CodecContext<'_>,
    ) -> Result<Option<ModelObject>, BindingError> {
        let mut object = FixtureObject::new(cx.resolve_type(&self.descriptor)?);
        for slot in &self.slots {
            if let Some(value) = self.read(slot, node, cx)? {
                object.set(slot.qname().clone(), value);
            }
        }
        for augmentation in cx.augmentations(node) {
            object.push_augmentation(augmentation);
        }

        if self.sparse && object.is_empty() {
            return Ok(None);
        }

        Ok(Some(object.into_object()))
    }
}

fn unexpected_shape(qname: &QName, expected: &str, found: &WireNode) -> BindingError {
    let found = match found {
        WireNode::Composite { .. } => "composite",
        WireNode::Leaf { .. } => "leaf",
        WireNode::LeafSet { .. } => "leaf set",
    };

    BindingError::invalid_input(format!("expected a {expected} for '{qname}', found a {found}"))
}
