//! Module: index
//! Responsibility: read-only lookup tables for one schema generation.
//! Does not own: publication or waiting (see `lifecycle`).
//!
//! Invariants:
//! - Built completely before publication; never mutated afterwards.
//! - Case paths map to the descriptor of the declaring case, so `uses`
//!   copies share their grouping case's type.

use crate::generator::SchemaRef;
use schemabind_schema::{
    bindings::SchemaGeneration,
    context::SchemaContext,
    module::AugmentationId,
    node::{Case, DataNodeContainer, SchemaNode},
    path::SchemaPath,
    qname::QName,
    types::TypeDescriptor,
};
use std::{collections::HashMap, sync::Arc};

///
/// SchemaIndex
///

#[derive(Debug)]
pub struct SchemaIndex {
    generation: u64,
    context: Arc<SchemaContext>,
    path_to_type: HashMap<SchemaPath, TypeDescriptor>,
    type_to_path: HashMap<TypeDescriptor, SchemaPath>,
    augment_to_type: HashMap<AugmentationId, TypeDescriptor>,
    type_to_augment: HashMap<TypeDescriptor, AugmentationId>,
    qname_to_identity: HashMap<QName, TypeDescriptor>,
    type_to_qname: HashMap<TypeDescriptor, QName>,
    list_to_key: HashMap<SchemaPath, TypeDescriptor>,
    key_to_list: HashMap<TypeDescriptor, SchemaPath>,
}

impl SchemaIndex {
    #[must_use]
    pub fn build(generation: u64, schema: &SchemaGeneration) -> Self {
        let mut index = Self {
            generation,
            context: Arc::clone(&schema.context),
            path_to_type: HashMap::new(),
            type_to_path: HashMap::new(),
            augment_to_type: HashMap::new(),
            type_to_augment: HashMap::new(),
            qname_to_identity: HashMap::new(),
            type_to_qname: HashMap::new(),
            list_to_key: HashMap::new(),
            key_to_list: HashMap::new(),
        };

        for bindings in &schema.bindings {
            for (path, descriptor) in bindings.child_nodes.iter().chain(&bindings.cases) {
                index.path_to_type.insert(path.clone(), descriptor.clone());
                index.type_to_path.insert(descriptor.clone(), path.clone());
            }
            for (id, descriptor) in &bindings.augmentations {
                index.augment_to_type.insert(id.clone(), descriptor.clone());
                index.type_to_augment.insert(descriptor.clone(), id.clone());
            }
            for (qname, descriptor) in &bindings.identities {
                index.qname_to_identity.insert(qname.clone(), descriptor.clone());
                index.type_to_qname.insert(descriptor.clone(), qname.clone());
            }
            for (path, descriptor) in &bindings.keys {
                index.list_to_key.insert(path.clone(), descriptor.clone());
                index.key_to_list.insert(descriptor.clone(), path.clone());
            }
        }

        index
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn context(&self) -> &SchemaContext {
        &self.context
    }

    #[must_use]
    pub fn path_type(&self, path: &SchemaPath) -> Option<&TypeDescriptor> {
        self.path_to_type.get(path)
    }

    #[must_use]
    pub fn type_path(&self, descriptor: &TypeDescriptor) -> Option<&SchemaPath> {
        self.type_to_path.get(descriptor)
    }

    #[must_use]
    pub fn augmentation_type(&self, id: &AugmentationId) -> Option<&TypeDescriptor> {
        self.augment_to_type.get(id)
    }

    #[must_use]
    pub fn identity_type(&self, qname: &QName) -> Option<&TypeDescriptor> {
        self.qname_to_identity.get(qname)
    }

    #[must_use]
    pub fn identity_qname(&self, descriptor: &TypeDescriptor) -> Option<&QName> {
        self.type_to_qname.get(descriptor)
    }

    #[must_use]
    pub fn key_type(&self, list: &SchemaPath) -> Option<&TypeDescriptor> {
        self.list_to_key.get(list)
    }

    /// True when this generation knows the descriptor in any table.
    #[must_use]
    pub fn binds(&self, descriptor: &TypeDescriptor) -> bool {
        self.type_to_path.contains_key(descriptor)
            || self.type_to_augment.contains_key(descriptor)
            || self.type_to_qname.contains_key(descriptor)
            || self.key_to_list.contains_key(descriptor)
    }

    /// Schema declaration a descriptor was bound from.
    #[must_use]
    pub fn schema_for(&self, descriptor: &TypeDescriptor) -> SchemaRef<'_> {
        let ctx = self.context();

        if let Some(path) = self
            .type_to_path
            .get(descriptor)
            .or_else(|| self.key_to_list.get(descriptor))
        {
            return ctx
                .find_data_node(path)
                .map_or(SchemaRef::Unbound, SchemaRef::Node);
        }
        if let Some(id) = self.type_to_augment.get(descriptor) {
            return ctx
                .find_augmentation(id)
                .map_or(SchemaRef::Unbound, SchemaRef::Augmentation);
        }
        if let Some(qname) = self.type_to_qname.get(descriptor) {
            return ctx
                .find_identity(qname)
                .map_or(SchemaRef::Unbound, SchemaRef::Identity);
        }

        SchemaRef::Unbound
    }

    /// Every declared case with the schema its entry should carry. Cases
    /// copied by `uses` resolve to their declaring node; each descriptor
    /// appears once.
    #[must_use]
    pub fn declared_cases(&self) -> Vec<(TypeDescriptor, Case)> {
        let mut cases = Vec::new();
        for module in self.context.modules() {
            self.collect_cases(module.children(), &mut cases);
            for grouping in &module.groupings {
                self.collect_cases(&grouping.children, &mut cases);
            }
        }

        cases
    }

    /// Descriptor and schema for one case of a choice.
    #[must_use]
    pub fn case_binding<'a>(&'a self, case: &'a Case) -> Option<(&'a TypeDescriptor, &'a Case)> {
        let declaring = if case.def.added_by_uses {
            self.context.find_original(case)?
        } else {
            case
        };

        self.path_type(&declaring.def.path)
            .map(|descriptor| (descriptor, declaring))
    }

    fn collect_cases(&self, children: &[SchemaNode], out: &mut Vec<(TypeDescriptor, Case)>) {
        for child in children {
            match child {
                SchemaNode::Choice(choice) => {
                    for case in &choice.cases {
                        if let Some((descriptor, declaring)) = self.case_binding(case)
                            && !out.iter().any(|(seen, _)| seen == descriptor)
                        {
                            out.push((descriptor.clone(), declaring.clone()));
                        }
                        self.collect_cases(&case.children, out);
                    }
                }
                SchemaNode::Container(container) => self.collect_cases(&container.children, out),
                SchemaNode::List(list) => self.collect_cases(&list.children, out),
                SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => {}
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use schemabind_schema::{
        build::{CaseSpec, ModuleBuilder, NodeSpec},
        node::LeafType,
    };

    fn generation() -> SchemaGeneration {
        let base = ModuleBuilder::new("base", "urn:ex:base", None)
            .expect("module header should build")
            .grouping(
                "g",
                vec![NodeSpec::choice(
                    "mode",
                    vec![CaseSpec::new("on", vec![NodeSpec::leaf("enabled", LeafType::Boolean)])],
                )],
            )
            .child(NodeSpec::container(
                "root",
                vec![
                    NodeSpec::choice(
                        "pick",
                        vec![CaseSpec::new("a", vec![NodeSpec::leaf("x", LeafType::Int64)])],
                    ),
                    NodeSpec::list("item", &["id"], vec![NodeSpec::leaf("id", LeafType::Uint64)]),
                    NodeSpec::uses("g"),
                ],
            ))
            .identity("alg", None)
            .build()
            .expect("module should build");

        SchemaGeneration::from_modules(vec![base]).expect("generation should derive")
    }

    fn qn(local: &str) -> QName {
        QName::new("urn:ex:base", None, local).expect("qname should build")
    }

    #[test]
    fn tables_cover_nodes_keys_and_identities() {
        let index = SchemaIndex::build(1, &generation());
        let root = SchemaPath::from(vec![qn("root")]);
        let item = root.child(qn("item"));

        let root_type = index.path_type(&root).expect("root should be bound");
        assert_eq!(index.type_path(root_type), Some(&root));
        assert!(index.binds(root_type));

        let key = index.key_type(&item).expect("keyed list should have a key type");
        assert!(matches!(index.schema_for(key), SchemaRef::Node(node) if node.as_list().is_some()));

        let alg = index.identity_type(&qn("alg")).expect("identity should be bound");
        assert_eq!(index.identity_qname(alg), Some(&qn("alg")));
        assert!(matches!(index.schema_for(alg), SchemaRef::Identity(_)));
    }

    #[test]
    fn uses_cases_resolve_to_declaring_case() {
        let index = SchemaIndex::build(1, &generation());
        let cases = index.declared_cases();

        let names: Vec<_> = cases
            .iter()
            .map(|(descriptor, case)| (descriptor.name().to_string(), case.def.path.len()))
            .collect();

        // grouping case `on` appears once, with its grouping path
        assert_eq!(names.len(), 2);
        assert!(names.contains(&("A".to_string(), 3)));
        assert!(names.contains(&("On".to_string(), 3)));
        assert!(cases.iter().all(|(_, case)| !case.def.added_by_uses));
    }
}
