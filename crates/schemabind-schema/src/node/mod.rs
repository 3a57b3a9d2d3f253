mod choice;
mod container;
mod leaf;

pub use choice::*;
pub use container::*;
pub use leaf::*;

use crate::{module::AugmentationId, path::SchemaPath, qname::QName};
use serde::Serialize;
use std::ops::Not;

///
/// NodeDef
///
/// Identity and provenance shared by every schema node.
///

#[derive(Clone, Debug, Serialize)]
pub struct NodeDef {
    pub qname: QName,
    pub path: SchemaPath,

    /// Introduced by an augmentation rather than declared in place.
    #[serde(default, skip_serializing_if = "Not::not")]
    pub augmenting: bool,

    /// Copied into place by a grouping `uses`.
    #[serde(default, skip_serializing_if = "Not::not")]
    pub added_by_uses: bool,

    /// Path of the declaring node inside the grouping, for `uses` copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<SchemaPath>,
}

impl NodeDef {
    #[must_use]
    pub const fn new(qname: QName, path: SchemaPath) -> Self {
        Self {
            qname,
            path,
            augmenting: false,
            added_by_uses: false,
            original: None,
        }
    }
}

///
/// SchemaNode
///
/// Data-tree child of a module, container, list, case or grouping.
/// Cases only ever appear inside a [`Choice`].
///

#[derive(Clone, Debug, Serialize)]
#[remain::sorted]
pub enum SchemaNode {
    Choice(Choice),
    Container(Container),
    Leaf(Leaf),
    LeafList(LeafList),
    List(ListNode),
}

impl SchemaNode {
    #[must_use]
    pub const fn def(&self) -> &NodeDef {
        match self {
            Self::Choice(node) => &node.def,
            Self::Container(node) => &node.def,
            Self::Leaf(node) => &node.def,
            Self::LeafList(node) => &node.def,
            Self::List(node) => &node.def,
        }
    }

    pub(crate) const fn def_mut(&mut self) -> &mut NodeDef {
        match self {
            Self::Choice(node) => &mut node.def,
            Self::Container(node) => &mut node.def,
            Self::Leaf(node) => &mut node.def,
            Self::LeafList(node) => &mut node.def,
            Self::List(node) => &mut node.def,
        }
    }

    #[must_use]
    pub const fn qname(&self) -> &QName {
        &self.def().qname
    }

    #[must_use]
    pub const fn path(&self) -> &SchemaPath {
        &self.def().path
    }

    #[must_use]
    pub const fn is_leaf_like(&self) -> bool {
        matches!(self, Self::Leaf(_) | Self::LeafList(_))
    }

    #[must_use]
    pub const fn as_choice(&self) -> Option<&Choice> {
        match self {
            Self::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    /// Child container view, when this node has data children.
    #[must_use]
    pub fn as_container(&self) -> Option<&dyn DataNodeContainer> {
        match self {
            Self::Container(node) => Some(node),
            Self::List(node) => Some(node),
            _ => None,
        }
    }
}

///
/// NodeRef
///
/// Borrowed view over any addressable schema node, cases included.
///

#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    Case(&'a Case),
    Node(&'a SchemaNode),
}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub const fn def(self) -> &'a NodeDef {
        match self {
            Self::Case(case) => &case.def,
            Self::Node(node) => node.def(),
        }
    }

    #[must_use]
    pub const fn path(self) -> &'a SchemaPath {
        &self.def().path
    }

    #[must_use]
    pub const fn as_case(self) -> Option<&'a Case> {
        match self {
            Self::Case(case) => Some(case),
            Self::Node(_) => None,
        }
    }

    #[must_use]
    pub const fn as_choice(self) -> Option<&'a Choice> {
        match self {
            Self::Node(SchemaNode::Choice(choice)) => Some(choice),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_leaf(self) -> Option<&'a Leaf> {
        match self {
            Self::Node(SchemaNode::Leaf(leaf)) => Some(leaf),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_list(self) -> Option<&'a ListNode> {
        match self {
            Self::Node(SchemaNode::List(list)) => Some(list),
            _ => None,
        }
    }

    /// Data children, for nodes that have them.
    #[must_use]
    pub fn as_container(self) -> Option<&'a dyn DataNodeContainer> {
        match self {
            Self::Case(case) => Some(case),
            Self::Node(node) => node.as_container(),
        }
    }

    /// Augmentations merged into this node, if it can be an augmentation target.
    #[must_use]
    pub fn augmentations(self) -> &'a [AugmentationId] {
        match self {
            Self::Case(case) => &case.augmentations,
            Self::Node(SchemaNode::Choice(choice)) => &choice.augmentations,
            Self::Node(SchemaNode::Container(container)) => &container.augmentations,
            Self::Node(SchemaNode::List(list)) => &list.augmentations,
            Self::Node(_) => &[],
        }
    }
}

///
/// DataNodeContainer
///
/// Anything that owns an ordered list of data children.
///

pub trait DataNodeContainer {
    fn children(&self) -> &[SchemaNode];

    /// Augmentations targeting this container.
    fn augmentations(&self) -> &[AugmentationId] {
        &[]
    }

    /// Direct child by qualified name (choices match by their own name).
    fn data_child(&self, qname: &QName) -> Option<&SchemaNode> {
        self.children().iter().find(|child| child.qname() == qname)
    }

    /// Data child reachable through a choice/case, skipping both levels.
    fn search_in_choices(&self, qname: &QName) -> Option<&SchemaNode> {
        self.children()
            .iter()
            .filter_map(SchemaNode::as_choice)
            .find_map(|choice| {
                choice
                    .cases
                    .iter()
                    .find_map(|case| {
                        case.data_child(qname)
                            .or_else(|| case.search_in_choices(qname))
                    })
            })
    }
}
