use crate::{
    module::AugmentationId,
    node::{DataNodeContainer, NodeDef, SchemaNode},
    qname::QName,
};
use serde::Serialize;

///
/// Choice
///
/// Selection point between mutually exclusive cases. A choice has no
/// wire representation of its own; its case's children appear inline
/// in the parent.
///

#[derive(Clone, Debug, Serialize)]
pub struct Choice {
    pub def: NodeDef,
    pub cases: Vec<Case>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_case: Option<QName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augmentations: Vec<AugmentationId>,
}

impl Choice {
    #[must_use]
    pub fn case(&self, qname: &QName) -> Option<&Case> {
        self.cases.iter().find(|case| &case.def.qname == qname)
    }
}

///
/// Case
///

#[derive(Clone, Debug, Serialize)]
pub struct Case {
    pub def: NodeDef,
    pub children: Vec<SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augmentations: Vec<AugmentationId>,
}

impl Case {
    /// Qualified names of the data children that may signal this case.
    pub fn child_qnames(&self) -> impl Iterator<Item = &QName> {
        self.children.iter().map(SchemaNode::qname)
    }
}

impl DataNodeContainer for Case {
    fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    fn augmentations(&self) -> &[AugmentationId] {
        &self.augmentations
    }
}
