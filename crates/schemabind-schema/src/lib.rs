//! Schema model for schemabind: qualified names, schema paths, the node
//! tree, modules and the assembled [`context::SchemaContext`], plus the
//! default naming strategy that binds schema nodes to generated types.

pub mod bindings;
pub mod build;
pub mod context;
pub mod error;
pub mod module;
pub mod naming;
pub mod node;
pub mod path;
pub mod qname;
pub mod types;
pub mod validate;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        bindings::{ModuleBindings, SchemaGeneration},
        build::{CaseSpec, ModuleBuilder, NodeSpec},
        context::SchemaContext,
        error::SchemaError,
        module::{AugmentationId, AugmentationSchema, IdentitySchema, Module},
        node::*,
        path::SchemaPath,
        qname::{QName, QNameModule, Revision},
        types::TypeDescriptor,
    };
}
