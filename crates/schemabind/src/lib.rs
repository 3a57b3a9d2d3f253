//! ## Crate layout
//! - `schema`: qualified names, schema paths, the node tree and the naming
//!   strategy that binds schema nodes to generated types.
//! - `core`: the codec registry, codec adapters, identity lookup, wire tree
//!   and observability.
//!
//! The `prelude` module carries what a binding generator or an application
//! embedding the registry needs in scope.

pub use schemabind_core as core;
pub use schemabind_schema as schema;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use core::{error::BindingError as Error, registry::CodecRegistry};

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::schema::prelude::*;
}
