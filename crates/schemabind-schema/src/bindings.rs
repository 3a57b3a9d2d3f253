use crate::{
    context::SchemaContext,
    error::SchemaError,
    module::{AugmentationId, Module},
    naming,
    node::{Case, SchemaNode},
    path::SchemaPath,
    qname::{QName, QNameModule},
    types::TypeDescriptor,
};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

///
/// ModuleBindings
///
/// Generated-type metadata for one module: which descriptor binds each
/// schema node, case, augmentation, identity and list key.
///

#[derive(Clone, Debug, Serialize)]
pub struct ModuleBindings {
    pub module: QNameModule,
    pub package: String,

    /// Containers, lists and choices, by data path.
    pub child_nodes: BTreeMap<SchemaPath, TypeDescriptor>,
    pub cases: BTreeMap<SchemaPath, TypeDescriptor>,
    pub augmentations: BTreeMap<AugmentationId, TypeDescriptor>,
    pub identities: BTreeMap<QName, TypeDescriptor>,

    /// Key type of each keyed list, by list path.
    pub keys: BTreeMap<SchemaPath, TypeDescriptor>,
}

impl ModuleBindings {
    /// Derive bindings with the default naming strategy. Nodes copied in by
    /// `uses` bind to their grouping's types and are skipped; nodes another
    /// module augments in are bound by that module.
    pub fn derive(context: &SchemaContext, module: &Module) -> Result<Self, SchemaError> {
        let package = naming::module_package(&module.name, &module.module);
        let mut bindings = Self {
            module: module.module.clone(),
            package,
            child_nodes: BTreeMap::new(),
            cases: BTreeMap::new(),
            augmentations: BTreeMap::new(),
            identities: BTreeMap::new(),
            keys: BTreeMap::new(),
        };

        for grouping in &module.groupings {
            bindings.walk(&grouping.def.path, &grouping.children, false)?;
        }
        // merged tree: skip nodes contributed by augmentations
        if let Some(merged) = context.find_module(&module.module) {
            bindings.walk(&SchemaPath::root(), &merged.children, false)?;
        }

        for aug in &module.augmentations {
            let target = aug.target.last().ok_or(SchemaError::EmptyPath)?;
            let descriptor = TypeDescriptor::new(
                &bindings.package,
                &naming::augmentation_name(target.local_name(), aug.id.ordinal),
            )?;
            bindings.augmentations.insert(aug.id.clone(), descriptor);

            bindings.walk(&aug.target, &aug.children, true)?;
            for case in &aug.cases {
                bindings.bind_case(&aug.target, case, true)?;
            }
        }

        for identity in &module.identities {
            let descriptor = TypeDescriptor::new(
                &bindings.package,
                &naming::class_name(identity.qname.local_name()),
            )?;
            bindings.identities.insert(identity.qname.clone(), descriptor);
        }

        Ok(bindings)
    }

    #[must_use]
    pub fn descriptor_for(&self, path: &SchemaPath) -> Option<&TypeDescriptor> {
        self.child_nodes.get(path).or_else(|| self.cases.get(path))
    }

    fn descriptor(
        &self,
        parent: &SchemaPath,
        local_name: &str,
    ) -> Result<TypeDescriptor, SchemaError> {
        let package = naming::package_for(&self.package, parent);

        Ok(TypeDescriptor::new(&package, &naming::class_name(local_name))?)
    }

    fn walk(
        &mut self,
        parent: &SchemaPath,
        children: &[SchemaNode],
        augmenting: bool,
    ) -> Result<(), SchemaError> {
        for node in children {
            let def = node.def();
            if def.added_by_uses || def.augmenting != augmenting {
                continue;
            }
            let local = def.qname.local_name();

            match node {
                SchemaNode::Container(container) => {
                    let descriptor = self.descriptor(parent, local)?;
                    self.child_nodes.insert(def.path.clone(), descriptor);
                    self.walk(&def.path, &container.children, augmenting)?;
                }
                SchemaNode::List(list) => {
                    let descriptor = self.descriptor(parent, local)?;
                    self.child_nodes.insert(def.path.clone(), descriptor);
                    if list.is_keyed() {
                        let package = naming::package_for(&self.package, parent);
                        let key = TypeDescriptor::new(&package, &naming::key_name(local))?;
                        self.keys.insert(def.path.clone(), key);
                    }
                    self.walk(&def.path, &list.children, augmenting)?;
                }
                SchemaNode::Choice(choice) => {
                    let descriptor = self.descriptor(parent, local)?;
                    self.child_nodes.insert(def.path.clone(), descriptor);
                    for case in &choice.cases {
                        self.bind_case(&def.path, case, augmenting)?;
                    }
                }
                SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => {}
            }
        }

        Ok(())
    }

    fn bind_case(
        &mut self,
        choice: &SchemaPath,
        case: &Case,
        augmenting: bool,
    ) -> Result<(), SchemaError> {
        if case.def.added_by_uses || case.def.augmenting != augmenting {
            return Ok(());
        }
        let descriptor = self.descriptor(choice, case.def.qname.local_name())?;
        self.cases.insert(case.def.path.clone(), descriptor);

        self.walk(&case.def.path, &case.children, augmenting)
    }
}

///
/// SchemaGeneration
///
/// One complete schema snapshot plus the bindings derived from it.
///

#[derive(Clone, Debug)]
pub struct SchemaGeneration {
    pub context: Arc<SchemaContext>,
    pub bindings: Vec<ModuleBindings>,
}

impl SchemaGeneration {
    /// Assemble a generation with default-named bindings for every module.
    pub fn derive(context: SchemaContext, modules: &[Module]) -> Result<Self, SchemaError> {
        let bindings = modules
            .iter()
            .map(|module| ModuleBindings::derive(&context, module))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            context: Arc::new(context),
            bindings,
        })
    }

    /// Build the context from raw modules and derive bindings in one step.
    pub fn from_modules(modules: Vec<Module>) -> Result<Self, SchemaError> {
        let context = SchemaContext::new(modules.clone())?;

        Self::derive(context, &modules)
    }

    /// Descriptor bound to a data path, across all modules.
    #[must_use]
    pub fn descriptor_for(&self, path: &SchemaPath) -> Option<&TypeDescriptor> {
        self.bindings.iter().find_map(|b| b.descriptor_for(path))
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
