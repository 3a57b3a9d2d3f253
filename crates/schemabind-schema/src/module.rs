use crate::{
    node::{Case, DataNodeContainer, NodeDef, SchemaNode},
    path::SchemaPath,
    qname::{QName, QNameModule},
};
use serde::Serialize;
use std::{fmt, sync::Arc};

///
/// Module
///

#[derive(Clone, Debug, Serialize)]
pub struct Module {
    pub name: Arc<str>,
    pub module: QNameModule,
    pub children: Vec<SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groupings: Vec<Grouping>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augmentations: Vec<AugmentationSchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<IdentitySchema>,
}

impl Module {
    #[must_use]
    pub fn grouping(&self, qname: &QName) -> Option<&Grouping> {
        self.groupings.iter().find(|g| &g.def.qname == qname)
    }

    #[must_use]
    pub fn augmentation(&self, id: &AugmentationId) -> Option<&AugmentationSchema> {
        self.augmentations.iter().find(|a| &a.id == id)
    }
}

impl DataNodeContainer for Module {
    fn children(&self) -> &[SchemaNode] {
        &self.children
    }
}

///
/// Grouping
///
/// Reusable node set; `uses` copies its children into place.
///

#[derive(Clone, Debug, Serialize)]
pub struct Grouping {
    pub def: NodeDef,
    pub children: Vec<SchemaNode>,
}

impl DataNodeContainer for Grouping {
    fn children(&self) -> &[SchemaNode] {
        &self.children
    }
}

///
/// AugmentationId
///
/// Stable identity of one `augment` statement: declaring module + ordinal.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct AugmentationId {
    pub module: QNameModule,
    pub ordinal: u32,
}

impl fmt::Display for AugmentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#augment{}", self.module, self.ordinal)
    }
}

///
/// AugmentationSchema
///
/// One `augment` statement. Its nodes are realized with paths below the
/// target and are merged into the target when the context is built.
///

#[derive(Clone, Debug, Serialize)]
pub struct AugmentationSchema {
    pub id: AugmentationId,
    pub target: SchemaPath,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SchemaNode>,

    /// Cases added when the target is a choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cases: Vec<Case>,
}

impl DataNodeContainer for AugmentationSchema {
    fn children(&self) -> &[SchemaNode] {
        &self.children
    }
}

///
/// IdentitySchema
///

#[derive(Clone, Debug, Serialize)]
pub struct IdentitySchema {
    pub qname: QName,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<QName>,
}
