use crate::{
    module::AugmentationId,
    node::{DataNodeContainer, NodeDef, SchemaNode},
    qname::QName,
};
use serde::Serialize;
use std::ops::Not;

///
/// Container
///

#[derive(Clone, Debug, Serialize)]
pub struct Container {
    pub def: NodeDef,

    #[serde(default, skip_serializing_if = "Not::not")]
    pub presence: bool,

    pub children: Vec<SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augmentations: Vec<AugmentationId>,
}

impl DataNodeContainer for Container {
    fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    fn augmentations(&self) -> &[AugmentationId] {
        &self.augmentations
    }
}

///
/// ListNode
///
/// Keyed (or unkeyed) list of entries; keys name leaf children.
///

#[derive(Clone, Debug, Serialize)]
pub struct ListNode {
    pub def: NodeDef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<QName>,

    pub children: Vec<SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augmentations: Vec<AugmentationId>,
}

impl ListNode {
    #[must_use]
    pub const fn is_keyed(&self) -> bool {
        !self.keys.is_empty()
    }
}

impl DataNodeContainer for ListNode {
    fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    fn augmentations(&self) -> &[AugmentationId] {
        &self.augmentations
    }
}
