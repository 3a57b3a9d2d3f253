//! Runtime for schemabind: resolves generated model types to cached codecs
//! that translate between the generic wire tree and model objects, with
//! case dispatch, augmentation composition and identity lookup.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod codec;
pub mod config;
pub mod error;
pub mod generator;
pub mod identity;
pub mod index;
pub mod lifecycle;
pub mod loader;
pub mod model;
pub mod obs;
pub mod registry;
pub mod wire;

///
/// CONSTANTS
///

/// Workspace version, as recorded in the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///
/// Types a generator or loader implementation needs; registry internals
/// stay behind their modules.
///

pub mod prelude {
    pub use crate::{
        codec::{CodecContext, CodecHandle, CodecMixins},
        config::RegistryConfig,
        error::{BindingError, ErrorClass, ErrorOrigin},
        generator::{
            CodecFactory, CodecGenerator, GenerationError, GenerationInput, PrimitiveCodec,
            SchemaRef,
        },
        loader::{LoadError, TypeLoader},
        model::{DataObject, ModelClass, ModelKind, ModelObject, ModelType},
        registry::CodecRegistry,
        wire::{WireNode, WireValue},
    };
}
