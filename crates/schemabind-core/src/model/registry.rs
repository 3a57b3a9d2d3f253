use crate::model::{ModelType, WeakModelType};
use dashmap::DashMap;
use schemabind_schema::{path::SchemaPath, types::TypeDescriptor};

///
/// TypeRegistry
///
/// Descriptor to loaded-type mapping, held weakly. A present but dead
/// handle means "not loaded" and callers reload through the type loader.
///

#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: DashMap<TypeDescriptor, WeakModelType>,
    instantiated: DashMap<SchemaPath, TypeDescriptor>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a loaded type. Returns true when the descriptor was unknown
    /// or its previous type had died.
    pub fn encounter(&self, ty: &ModelType) -> bool {
        let mut slot = self.types.entry(ty.descriptor().clone()).or_default();
        if slot.points_to(ty) {
            return false;
        }
        let replaced_live = slot.is_live();
        *slot = ty.downgrade();

        !replaced_live
    }

    /// Live type for a descriptor, if one is loaded.
    #[must_use]
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Option<ModelType> {
        self.types.get(descriptor).and_then(|slot| slot.upgrade())
    }

    /// Bind a schema path to the type instantiated for it.
    pub fn put_path(&self, path: SchemaPath, ty: &ModelType) {
        self.encounter(ty);
        self.instantiated.insert(path, ty.descriptor().clone());
    }

    #[must_use]
    pub fn instantiated(&self, path: &SchemaPath) -> Option<TypeDescriptor> {
        self.instantiated.get(path).map(|entry| entry.value().clone())
    }

    /// Drop dead handles; returns how many were removed.
    pub fn purge(&self) -> usize {
        let before = self.types.len();
        self.types.retain(|_, slot| slot.is_live());

        before.saturating_sub(self.types.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
