use crate::{node::NodeDef, qname::QName};
use derive_more::Display;
use serde::Serialize;
use std::ops::Not;

///
/// LeafType
///
/// Value space of a leaf, reduced to what the wire tree distinguishes.
///

#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum LeafType {
    Binary,
    Boolean,
    Empty,
    #[display("identityref({base})")]
    IdentityRef {
        base: QName,
    },
    Int64,
    String,
    Uint64,
}

///
/// Leaf
///

#[derive(Clone, Debug, Serialize)]
pub struct Leaf {
    pub def: NodeDef,
    pub ty: LeafType,

    #[serde(default, skip_serializing_if = "Not::not")]
    pub mandatory: bool,
}

///
/// LeafList
///

#[derive(Clone, Debug, Serialize)]
pub struct LeafList {
    pub def: NodeDef,
    pub ty: LeafType,
}
