//! Module: context
//! Responsibility: assembled, immutable view over a set of modules.
//! Does not own: binding metadata (see `bindings`), runtime codecs.
//! Boundary: the only place augmentations are merged into their targets.
//!
//! Invariants:
//! - Every augmentation has been merged exactly once into its target.
//! - Node paths are absolute; augmented nodes live below their target.
//! - A context that constructs successfully has passed validation.

#[cfg(test)]
mod tests;

use crate::{
    error::SchemaError,
    module::{AugmentationId, AugmentationSchema, IdentitySchema, Module},
    node::{Case, Choice, Container, DataNodeContainer, ListNode, NodeRef, SchemaNode},
    path::SchemaPath,
    qname::{QName, QNameModule},
    validate::validate_context,
};
use std::collections::HashSet;

///
/// SchemaContext
///

#[derive(Clone, Debug)]
pub struct SchemaContext {
    modules: Vec<Module>,
}

impl SchemaContext {
    /// Assemble a context: merge augmentations, then validate.
    pub fn new(mut modules: Vec<Module>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for module in &modules {
            if !seen.insert(module.module.clone()) {
                return Err(SchemaError::DuplicateModule(module.module.clone()));
            }
        }

        // augmentations may target nodes that other augmentations introduce,
        // so merge until a pass makes no progress
        let mut pending: Vec<AugmentationSchema> = modules
            .iter()
            .flat_map(|m| m.augmentations.iter().cloned())
            .collect();
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|aug| !merge_augmentation(&mut modules, aug));

            if pending.len() == before {
                let aug = &pending[0];
                return Err(SchemaError::AugmentTargetNotFound {
                    id: aug.id.clone(),
                    target: aug.target.clone(),
                });
            }
        }

        let context = Self { modules };
        validate_context(&context)?;

        Ok(context)
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn find_module(&self, module: &QNameModule) -> Option<&Module> {
        self.modules.iter().find(|m| &m.module == module)
    }

    #[must_use]
    pub fn find_module_by_name(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| &*m.name == name)
    }

    /// Locate a node by data path. Choices and cases are descended
    /// transparently; addressing below a leaf is an error.
    pub fn find_node(&self, names: &[QName]) -> Result<NodeRef<'_>, SchemaError> {
        let first = names.first().ok_or(SchemaError::EmptyPath)?;
        let module = self
            .find_module(first.module())
            .ok_or_else(|| SchemaError::ModuleNotFound(first.module().clone()))?;

        let mut scope = Scope::Container(module);
        let mut found = None;
        for (idx, name) in names.iter().enumerate() {
            let node = scope.lookup(name).ok_or_else(|| SchemaError::NodeNotFound {
                path: SchemaPath::from(names[..=idx].to_vec()),
            })?;
            let is_last = idx + 1 == names.len();

            if !is_last {
                scope = match node {
                    NodeRef::Case(case) => Scope::Container(case),
                    NodeRef::Node(SchemaNode::Choice(choice)) => Scope::Choice(choice),
                    NodeRef::Node(SchemaNode::Container(container)) => Scope::Container(container),
                    NodeRef::Node(SchemaNode::List(list)) => Scope::Container(list),
                    NodeRef::Node(SchemaNode::Leaf(_) | SchemaNode::LeafList(_)) => {
                        return Err(SchemaError::NestedInLeaf {
                            path: node.path().clone(),
                        });
                    }
                };
            }
            found = Some(node);
        }

        found.ok_or(SchemaError::EmptyPath)
    }

    /// Locate a node by its exact schema path, choice and case segments
    /// included. Paths rooted at a grouping resolve inside that grouping.
    #[must_use]
    pub fn find_data_node(&self, path: &SchemaPath) -> Option<NodeRef<'_>> {
        let (first, rest) = path.segments().split_first()?;
        let module = self.find_module(first.module())?;

        match module.grouping(first) {
            Some(grouping) => walk_exact(grouping, rest),
            None => walk_exact(module, path.segments()),
        }
    }

    /// Declaring case of a case copied in by `uses`.
    #[must_use]
    pub fn find_original(&self, case: &Case) -> Option<&Case> {
        let original = case.def.original.as_ref()?;

        self.find_data_node(original).and_then(NodeRef::as_case)
    }

    #[must_use]
    pub fn find_augmentation(&self, id: &AugmentationId) -> Option<&AugmentationSchema> {
        self.find_module(&id.module)?.augmentation(id)
    }

    #[must_use]
    pub fn find_identity(&self, qname: &QName) -> Option<&IdentitySchema> {
        self.find_module(qname.module())?
            .identities
            .iter()
            .find(|identity| &identity.qname == qname)
    }

    pub fn identities(&self) -> impl Iterator<Item = &IdentitySchema> {
        self.modules.iter().flat_map(|m| m.identities.iter())
    }
}

///
/// Scope
///
/// Lookup frame for data-path descent.
///

enum Scope<'a> {
    Choice(&'a Choice),
    Container(&'a dyn DataNodeContainer),
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &QName) -> Option<NodeRef<'a>> {
        match *self {
            Self::Container(container) => container
                .data_child(name)
                .or_else(|| container.search_in_choices(name))
                .map(NodeRef::Node),
            Self::Choice(choice) => choice.case(name).map(NodeRef::Case).or_else(|| {
                choice.cases.iter().find_map(|case| {
                    case.data_child(name)
                        .or_else(|| case.search_in_choices(name))
                        .map(NodeRef::Node)
                })
            }),
        }
    }
}

// exact descent: every segment must name a direct child, case or choice
fn walk_exact<'a>(container: &'a dyn DataNodeContainer, segments: &[QName]) -> Option<NodeRef<'a>> {
    let (head, rest) = segments.split_first()?;
    let node = container.data_child(head)?;
    if rest.is_empty() {
        return Some(NodeRef::Node(node));
    }

    match node {
        SchemaNode::Container(container) => walk_exact(container, rest),
        SchemaNode::List(list) => walk_exact(list, rest),
        SchemaNode::Choice(choice) => {
            let (case_name, rest) = rest.split_first()?;
            let case = choice.case(case_name)?;
            if rest.is_empty() {
                Some(NodeRef::Case(case))
            } else {
                walk_exact(case, rest)
            }
        }
        SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => None,
    }
}

///
/// TargetMut
///
/// Mutable handle on a node that can absorb an augmentation.
///

enum TargetMut<'a> {
    Case(&'a mut Case),
    Choice(&'a mut Choice),
    Container(&'a mut Container),
    List(&'a mut ListNode),
}

impl TargetMut<'_> {
    fn absorb(self, aug: &AugmentationSchema) -> bool {
        let (children, cases, augmentations) = match self {
            Self::Case(case) => (Some(&mut case.children), None, &mut case.augmentations),
            Self::Container(c) => (Some(&mut c.children), None, &mut c.augmentations),
            Self::List(list) => (Some(&mut list.children), None, &mut list.augmentations),
            Self::Choice(choice) => (None, Some(&mut choice.cases), &mut choice.augmentations),
        };

        match (children, cases) {
            (Some(children), None) if aug.cases.is_empty() => {
                children.extend(aug.children.iter().cloned());
            }
            (None, Some(cases)) if aug.children.is_empty() => {
                cases.extend(aug.cases.iter().cloned());
            }
            _ => return false,
        }
        augmentations.push(aug.id.clone());

        true
    }
}

fn merge_augmentation(modules: &mut [Module], aug: &AugmentationSchema) -> bool {
    let segments = aug.target.segments();
    let Some(first) = segments.first() else {
        return false;
    };
    let Some(module) = modules.iter_mut().find(|m| &m.module == first.module()) else {
        return false;
    };

    find_target_mut(&mut module.children, segments).is_some_and(|target| target.absorb(aug))
}

fn find_target_mut<'a>(
    children: &'a mut [SchemaNode],
    segments: &[QName],
) -> Option<TargetMut<'a>> {
    let (head, rest) = segments.split_first()?;
    let node = children.iter_mut().find(|child| child.qname() == head)?;

    if rest.is_empty() {
        return match node {
            SchemaNode::Choice(choice) => Some(TargetMut::Choice(choice)),
            SchemaNode::Container(container) => Some(TargetMut::Container(container)),
            SchemaNode::List(list) => Some(TargetMut::List(list)),
            SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => None,
        };
    }

    match node {
        SchemaNode::Container(container) => find_target_mut(&mut container.children, rest),
        SchemaNode::List(list) => find_target_mut(&mut list.children, rest),
        SchemaNode::Choice(choice) => {
            let (case_name, rest) = rest.split_first()?;
            let case = choice.cases.iter_mut().find(|case| &case.def.qname == case_name)?;
            if rest.is_empty() {
                Some(TargetMut::Case(case))
            } else {
                find_target_mut(&mut case.children, rest)
            }
        }
        SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => None,
    }
}
