//! Test fixtures for schemabind: a schema-driven codec generator, a type
//! loader over schema bindings, a generic data object and the shared
//! scenario schemas. `Fixture` wires them to a registry.

pub mod generator;
pub mod loader;
pub mod object;
pub mod schemas;

pub use generator::FixtureGenerator;
pub use loader::{Blueprint, FixtureLoader};
pub use object::{FixtureObject, FixtureValue};

use schemabind::prelude::*;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// Fixture
///
/// One registry with its fixture generator and loader. The loader knows
/// every type of each installed generation.
///

pub struct Fixture {
    pub registry: CodecRegistry,
    pub loader: Arc<FixtureLoader>,
    pub generator: Arc<FixtureGenerator>,
    pub generation: SchemaGeneration,
}

impl Fixture {
    /// Registry over `modules` with the generation already installed.
    pub fn new(modules: Vec<Module>, config: RegistryConfig) -> Result<Self, FixtureError> {
        let fixture = Self::uninstalled(modules, config)?;
        fixture.registry.on_schema_generated(&fixture.generation);

        Ok(fixture)
    }

    /// Registry and loader primed for `modules`, with no schema installed.
    pub fn uninstalled(modules: Vec<Module>, config: RegistryConfig) -> Result<Self, FixtureError> {
        let generation = SchemaGeneration::from_modules(modules)?;
        let loader = Arc::new(FixtureLoader::from_generation(&generation));
        let generator = Arc::new(FixtureGenerator::new());
        let registry = CodecRegistry::new(
            config,
            Arc::clone(&generator) as Arc<dyn CodecGenerator>,
            Arc::clone(&loader) as Arc<dyn TypeLoader>,
        );

        Ok(Self {
            registry,
            loader,
            generator,
            generation,
        })
    }

    /// Teach the loader a new generation, then publish it.
    pub fn install(&self, generation: &SchemaGeneration) {
        self.loader.add_generation(generation);
        self.registry.on_schema_generated(generation);
    }

    /// Model type at a data path.
    pub fn type_at(&self, names: &[QName]) -> Result<ModelType, FixtureError> {
        Ok(self.registry.class_for_schema_path(names)?)
    }

    /// Descriptor bound to an exact schema path.
    pub fn descriptor(&self, names: &[QName]) -> Result<TypeDescriptor, FixtureError> {
        let path: SchemaPath = names.iter().cloned().collect();

        self.generation
            .descriptor_for(&path)
            .cloned()
            .ok_or(FixtureError::Unbound(path))
    }

    /// Load the type bound to an exact schema path.
    pub fn load(&self, names: &[QName]) -> Result<ModelType, FixtureError> {
        Ok(self.loader.load(&self.descriptor(names)?)?)
    }

    /// Load an identity type by its schema name.
    pub fn identity(&self, qname: &QName) -> Result<ModelType, FixtureError> {
        let descriptor = self
            .generation
            .bindings
            .iter()
            .find_map(|bindings| bindings.identities.get(qname))
            .ok_or_else(|| FixtureError::UnknownIdentity(qname.clone()))?;

        Ok(self.loader.load(descriptor)?)
    }

    /// Load the augmentation type whose target is the exact schema path
    /// `target`, declared by `module`.
    pub fn augmentation(
        &self,
        module: &QNameModule,
        target: &[QName],
    ) -> Result<ModelType, FixtureError> {
        let target: SchemaPath = target.iter().cloned().collect();
        let descriptor = self
            .generation
            .context
            .modules()
            .iter()
            .filter(|declaring| &declaring.module == module)
            .flat_map(|declaring| &declaring.augmentations)
            .find(|augmentation| augmentation.target == target)
            .and_then(|augmentation| {
                self.generation
                    .bindings
                    .iter()
                    .find_map(|bindings| bindings.augmentations.get(&augmentation.id))
            })
            .ok_or(FixtureError::Unbound(target))?;

        Ok(self.loader.load(descriptor)?)
    }
}

///
/// FixtureError
///

#[derive(Debug, ThisError)]
pub enum FixtureError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("no type is bound to {0}")]
    Unbound(SchemaPath),

    #[error("no identity named {0}")]
    UnknownIdentity(QName),
}
