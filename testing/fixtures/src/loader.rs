use parking_lot::{Mutex, RwLock};
use schemabind::prelude::*;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use tracing::trace;

///
/// Blueprint
///
/// Class metadata a type is built from when it is first loaded.
///

#[derive(Clone, Debug)]
pub struct Blueprint {
    pub descriptor: TypeDescriptor,
    pub kind: ModelKind,
    pub qname: Option<QName>,
    pub supertypes: Vec<TypeDescriptor>,
    pub augmentable: bool,
}

impl Blueprint {
    #[must_use]
    pub const fn new(descriptor: TypeDescriptor, kind: ModelKind) -> Self {
        Self {
            descriptor,
            kind,
            qname: None,
            supertypes: Vec::new(),
            augmentable: false,
        }
    }

    fn class(&self) -> ModelClass {
        let mut class = ModelClass::new(self.descriptor.clone(), self.kind.clone());
        class.qname.clone_from(&self.qname);
        class.supertypes.clone_from(&self.supertypes);
        class.augmentable = self.augmentable;

        class
    }
}

///
/// FixtureLoader
///
/// Type loader over blueprints derived from schema bindings. Loaded types
/// are held strongly until unloaded, like classes of a live class loader.
///

#[derive(Debug, Default)]
pub struct FixtureLoader {
    blueprints: RwLock<HashMap<String, Blueprint>>,
    loaded: Mutex<HashMap<String, ModelType>>,
    loads: AtomicUsize,
}

impl FixtureLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_generation(generation: &SchemaGeneration) -> Self {
        let loader = Self::new();
        loader.add_generation(generation);

        loader
    }

    /// Add a blueprint for every type the generation binds. Existing
    /// blueprints are replaced; already loaded types stay as they are.
    pub fn add_generation(&self, generation: &SchemaGeneration) {
        let context = &generation.context;
        let mut blueprints = self.blueprints.write();
        let mut insert = |blueprint: Blueprint| {
            blueprints.insert(blueprint.descriptor.fully_qualified_name(), blueprint);
        };

        for bindings in &generation.bindings {
            for (path, descriptor) in &bindings.child_nodes {
                let Some(node) = context.find_data_node(path) else {
                    continue;
                };
                let kind = match node {
                    NodeRef::Node(SchemaNode::Choice(_)) => ModelKind::Choice,
                    NodeRef::Node(SchemaNode::List(_)) => ModelKind::List {
                        identifier: bindings.keys.get(path).cloned(),
                    },
                    _ => ModelKind::Container,
                };
                let augmentable = kind != ModelKind::Choice;

                insert(Blueprint {
                    qname: Some(node.def().qname.clone()),
                    augmentable,
                    ..Blueprint::new(descriptor.clone(), kind)
                });
            }

            for (path, descriptor) in &bindings.cases {
                let choice = path
                    .parent()
                    .and_then(|choice| generation.descriptor_for(&choice).cloned());

                insert(Blueprint {
                    qname: path.last().cloned(),
                    supertypes: choice.into_iter().collect(),
                    augmentable: true,
                    ..Blueprint::new(descriptor.clone(), ModelKind::Case)
                });
            }

            for (id, descriptor) in &bindings.augmentations {
                let schema = context.find_augmentation(id);
                let target = schema.and_then(|aug| generation.descriptor_for(&aug.target).cloned());
                let qname = schema
                    .and_then(|aug| aug.target.last())
                    .and_then(|target| QName::create(&bindings.module, target.local_name()).ok());

                insert(Blueprint {
                    qname,
                    ..Blueprint::new(descriptor.clone(), ModelKind::Augmentation { target })
                });
            }

            for (qname, descriptor) in &bindings.identities {
                let base = context
                    .find_identity(qname)
                    .and_then(|identity| identity.base.as_ref())
                    .and_then(|base| {
                        generation
                            .bindings
                            .iter()
                            .find_map(|module| module.identities.get(base).cloned())
                    });

                insert(Blueprint {
                    qname: Some(qname.clone()),
                    ..Blueprint::new(descriptor.clone(), ModelKind::Identity { base })
                });
            }

            for descriptor in bindings.keys.values() {
                insert(Blueprint::new(descriptor.clone(), ModelKind::Identifier));
            }
        }
    }

    pub fn define(&self, blueprint: Blueprint) {
        self.blueprints
            .write()
            .insert(blueprint.descriptor.fully_qualified_name(), blueprint);
    }

    /// Drop the blueprint and any loaded type; later loads fail.
    pub fn forget(&self, descriptor: &TypeDescriptor) -> bool {
        let name = descriptor.fully_qualified_name();
        self.loaded.lock().remove(&name);

        self.blueprints.write().remove(&name).is_some()
    }

    /// Release every loaded type. Blueprints stay, so the next load
    /// builds a fresh type.
    pub fn unload_all(&self) -> usize {
        let mut loaded = self.loaded.lock();
        let count = loaded.len();
        loaded.clear();

        count
    }

    pub fn load(&self, descriptor: &TypeDescriptor) -> Result<ModelType, LoadError> {
        self.load_type(&descriptor.fully_qualified_name())
    }

    /// Types built so far, reloads included.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_defined(&self, descriptor: &TypeDescriptor) -> bool {
        self.blueprints
            .read()
            .contains_key(&descriptor.fully_qualified_name())
    }
}

impl TypeLoader for FixtureLoader {
    fn load_type(&self, fully_qualified_name: &str) -> Result<ModelType, LoadError> {
        let mut loaded = self.loaded.lock();
        if let Some(ty) = loaded.get(fully_qualified_name) {
            return Ok(ty.clone());
        }

        let class = self
            .blueprints
            .read()
            .get(fully_qualified_name)
            .map(Blueprint::class)
            .ok_or_else(|| LoadError::NotFound(fully_qualified_name.to_string()))?;
        let ty = ModelType::new(class);
        loaded.insert(fully_qualified_name.to_string(), ty.clone());
        self.loads.fetch_add(1, Ordering::Relaxed);
        trace!(ty = %ty, "fixture loader built type");

        Ok(ty)
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas;

    fn generation() -> SchemaGeneration {
        SchemaGeneration::from_modules(vec![
            schemas::base().expect("base should build"),
            schemas::ext().expect("ext should build"),
        ])
        .expect("generation should derive")
    }

    fn base(local: &str) -> QName {
        schemas::base_qn(local).expect("qname should build")
    }

    fn ext(local: &str) -> QName {
        schemas::ext_qn(local).expect("qname should build")
    }

    fn descriptor(generation: &SchemaGeneration, names: &[QName]) -> TypeDescriptor {
        let path: SchemaPath = names.iter().cloned().collect();

        generation
            .descriptor_for(&path)
            .expect("path should be bound")
            .clone()
    }

    #[test]
    fn kinds_follow_the_schema() {
        let generation = generation();
        let loader = FixtureLoader::from_generation(&generation);

        let root = loader
            .load(&descriptor(&generation, &[base("root")]))
            .expect("root should load");
        let choice = loader
            .load(&descriptor(&generation, &[base("root"), base("choice-node")]))
            .expect("choice should load");
        let case = loader
            .load(&descriptor(
                &generation,
                &[base("root"), base("choice-node"), ext("b")],
            ))
            .expect("augmenting case should load");

        assert_eq!(root.kind(), &ModelKind::Container);
        assert!(root.augmentable);
        assert_eq!(root.qname.as_ref(), Some(&base("root")));
        assert_eq!(choice.kind(), &ModelKind::Choice);
        assert!(!choice.augmentable);
        assert_eq!(case.kind(), &ModelKind::Case);
        assert!(case.implements(choice.descriptor()));
    }

    #[test]
    fn keyed_lists_name_their_key_type() {
        let generation = generation();
        let loader = FixtureLoader::from_generation(&generation);

        let list = loader
            .load(&descriptor(&generation, &[base("root"), base("item")]))
            .expect("list should load");
        let ModelKind::List { identifier: Some(key) } = list.kind() else {
            panic!("item should be a keyed list");
        };

        let key = loader.load(key).expect("key should load");
        assert_eq!(key.kind(), &ModelKind::Identifier);
    }

    #[test]
    fn identities_resolve_their_base() {
        let generation = generation();
        let loader = FixtureLoader::from_generation(&generation);
        let index = &generation.bindings[0].identities;

        let sha = loader
            .load(&index[&base("sha")])
            .expect("identity should load");

        assert_eq!(
            sha.kind(),
            &ModelKind::Identity {
                base: Some(index[&base("alg")].clone())
            }
        );
    }

    #[test]
    fn loads_are_stable_until_unloaded() {
        let generation = generation();
        let loader = FixtureLoader::from_generation(&generation);
        let root = descriptor(&generation, &[base("root")]);

        let first = loader.load(&root).expect("root should load");
        let second = loader.load(&root).expect("root should load");
        assert!(first.ptr_eq(&second));
        assert_eq!(loader.loads(), 1);

        assert_eq!(loader.unload_all(), 1);
        let third = loader.load(&root).expect("root should reload");
        assert!(!first.ptr_eq(&third));
        assert_eq!(loader.loads(), 2);
    }

    #[test]
    fn forgotten_types_fail_to_load() {
        let generation = generation();
        let loader = FixtureLoader::from_generation(&generation);
        let root = descriptor(&generation, &[base("root")]);

        assert!(loader.forget(&root));
        assert!(matches!(loader.load(&root), Err(LoadError::NotFound(_))));
    }
}
