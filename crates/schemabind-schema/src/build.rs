//! Module: build
//! Responsibility: declarative construction of [`Module`] values.
//! Does not own: augmentation merging or validation (see `context`).
//! Boundary: turns local names into qualified names and realizes paths.

use crate::{
    error::SchemaError,
    module::{AugmentationId, AugmentationSchema, Grouping, IdentitySchema, Module},
    node::{Case, Choice, Container, Leaf, LeafList, LeafType, ListNode, NodeDef, SchemaNode},
    path::SchemaPath,
    qname::{QName, QNameModule},
};
use std::sync::Arc;

///
/// NodeSpec
///
/// Unrealized node: local names only, no paths yet.
///

#[derive(Clone, Debug)]
#[remain::sorted]
pub enum NodeSpec {
    Choice {
        name: String,
        cases: Vec<CaseSpec>,
        default_case: Option<String>,
    },
    Container {
        name: String,
        presence: bool,
        children: Vec<Self>,
    },
    Leaf {
        name: String,
        ty: LeafType,
        mandatory: bool,
    },
    LeafList {
        name: String,
        ty: LeafType,
    },
    List {
        name: String,
        keys: Vec<String>,
        children: Vec<Self>,
    },
    Uses {
        grouping: String,
    },
}

impl NodeSpec {
    #[must_use]
    pub fn container(name: &str, children: Vec<Self>) -> Self {
        Self::Container {
            name: name.to_string(),
            presence: false,
            children,
        }
    }

    #[must_use]
    pub fn list(name: &str, keys: &[&str], children: Vec<Self>) -> Self {
        Self::List {
            name: name.to_string(),
            keys: keys.iter().map(ToString::to_string).collect(),
            children,
        }
    }

    #[must_use]
    pub fn leaf(name: &str, ty: LeafType) -> Self {
        Self::Leaf {
            name: name.to_string(),
            ty,
            mandatory: false,
        }
    }

    #[must_use]
    pub fn leaf_list(name: &str, ty: LeafType) -> Self {
        Self::LeafList {
            name: name.to_string(),
            ty,
        }
    }

    #[must_use]
    pub fn choice(name: &str, cases: Vec<CaseSpec>) -> Self {
        Self::Choice {
            name: name.to_string(),
            cases,
            default_case: None,
        }
    }

    #[must_use]
    pub fn uses(grouping: &str) -> Self {
        Self::Uses {
            grouping: grouping.to_string(),
        }
    }
}

///
/// CaseSpec
///

#[derive(Clone, Debug)]
pub struct CaseSpec {
    pub name: String,
    pub children: Vec<NodeSpec>,
}

impl CaseSpec {
    #[must_use]
    pub fn new(name: &str, children: Vec<NodeSpec>) -> Self {
        Self {
            name: name.to_string(),
            children,
        }
    }
}

///
/// AugmentBody
///

#[derive(Clone, Debug)]
enum AugmentBody {
    Cases(Vec<CaseSpec>),
    Nodes(Vec<NodeSpec>),
}

///
/// ModuleBuilder
///
/// Collects declarations for one module. Groupings must be declared
/// before the nodes that use them.
///

#[derive(Clone, Debug)]
pub struct ModuleBuilder {
    name: Arc<str>,
    module: QNameModule,
    children: Vec<NodeSpec>,
    groupings: Vec<(String, Vec<NodeSpec>)>,
    augments: Vec<(SchemaPath, AugmentBody)>,
    identities: Vec<(String, Option<QName>)>,
}

impl ModuleBuilder {
    pub fn new(name: &str, namespace: &str, revision: Option<&str>) -> Result<Self, SchemaError> {
        Ok(Self {
            name: Arc::from(name),
            module: QNameModule::new(namespace, revision)?,
            children: Vec::new(),
            groupings: Vec::new(),
            augments: Vec::new(),
            identities: Vec::new(),
        })
    }

    #[must_use]
    pub const fn module(&self) -> &QNameModule {
        &self.module
    }

    /// Qualified name in this module.
    pub fn qname(&self, local_name: &str) -> Result<QName, SchemaError> {
        Ok(QName::create(&self.module, local_name)?)
    }

    #[must_use]
    pub fn child(mut self, spec: NodeSpec) -> Self {
        self.children.push(spec);
        self
    }

    #[must_use]
    pub fn grouping(mut self, name: &str, children: Vec<NodeSpec>) -> Self {
        self.groupings.push((name.to_string(), children));
        self
    }

    /// Augment a container, list or case with data nodes.
    #[must_use]
    pub fn augment(mut self, target: SchemaPath, children: Vec<NodeSpec>) -> Self {
        self.augments.push((target, AugmentBody::Nodes(children)));
        self
    }

    /// Augment a choice with additional cases.
    #[must_use]
    pub fn augment_cases(mut self, target: SchemaPath, cases: Vec<CaseSpec>) -> Self {
        self.augments.push((target, AugmentBody::Cases(cases)));
        self
    }

    #[must_use]
    pub fn identity(mut self, name: &str, base: Option<QName>) -> Self {
        self.identities.push((name.to_string(), base));
        self
    }

    pub fn build(self) -> Result<Module, SchemaError> {
        let mut realizer = Realizer {
            module: &self.module,
            groupings: Vec::new(),
        };

        for (name, specs) in &self.groupings {
            let qname = QName::create(&self.module, name)?;
            let path = SchemaPath::root().child(qname.clone());
            let children = realizer.realize_all(specs, &path, false)?;
            realizer.groupings.push(Grouping {
                def: NodeDef::new(qname, path),
                children,
            });
        }

        let children = realizer.realize_all(&self.children, &SchemaPath::root(), false)?;

        let mut augmentations = Vec::with_capacity(self.augments.len());
        for (ordinal, (target, body)) in (0u32..).zip(&self.augments) {
            let (children, cases) = match body {
                AugmentBody::Nodes(specs) => {
                    (realizer.realize_all(specs, target, true)?, Vec::new())
                }
                AugmentBody::Cases(specs) => {
                    let cases = specs
                        .iter()
                        .map(|case| realizer.realize_case(case, target, true))
                        .collect::<Result<Vec<_>, _>>()?;
                    (Vec::new(), cases)
                }
            };
            augmentations.push(AugmentationSchema {
                id: AugmentationId {
                    module: self.module.clone(),
                    ordinal,
                },
                target: target.clone(),
                children,
                cases,
            });
        }

        let identities = self
            .identities
            .iter()
            .map(|(name, base)| {
                Ok(IdentitySchema {
                    qname: QName::create(&self.module, name)?,
                    base: base.clone(),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        let groupings = realizer.groupings;

        Ok(Module {
            name: self.name,
            module: self.module,
            children,
            groupings,
            augmentations,
            identities,
        })
    }
}

///
/// Realizer
///

struct Realizer<'a> {
    module: &'a QNameModule,
    groupings: Vec<Grouping>,
}

impl Realizer<'_> {
    fn realize_all(
        &self,
        specs: &[NodeSpec],
        parent: &SchemaPath,
        augmenting: bool,
    ) -> Result<Vec<SchemaNode>, SchemaError> {
        let mut nodes = Vec::with_capacity(specs.len());
        for spec in specs {
            if let NodeSpec::Uses { grouping } = spec {
                nodes.extend(self.expand_uses(grouping, parent, augmenting)?);
            } else {
                nodes.push(self.realize(spec, parent, augmenting)?);
            }
        }

        Ok(nodes)
    }

    fn realize(
        &self,
        spec: &NodeSpec,
        parent: &SchemaPath,
        augmenting: bool,
    ) -> Result<SchemaNode, SchemaError> {
        let def = |name: &str| -> Result<NodeDef, SchemaError> {
            let qname = QName::create(self.module, name)?;
            let mut def = NodeDef::new(qname.clone(), parent.child(qname));
            def.augmenting = augmenting;
            Ok(def)
        };

        let node = match spec {
            NodeSpec::Container {
                name,
                presence,
                children,
            } => {
                let def = def(name)?;
                let children = self.realize_all(children, &def.path, augmenting)?;
                SchemaNode::Container(Container {
                    def,
                    presence: *presence,
                    children,
                    augmentations: Vec::new(),
                })
            }
            NodeSpec::List { name, keys, children } => {
                let def = def(name)?;
                let children = self.realize_all(children, &def.path, augmenting)?;
                let keys = keys
                    .iter()
                    .map(|key| QName::create(self.module, key))
                    .collect::<Result<Vec<_>, _>>()?;
                SchemaNode::List(ListNode {
                    def,
                    keys,
                    children,
                    augmentations: Vec::new(),
                })
            }
            NodeSpec::Leaf { name, ty, mandatory } => SchemaNode::Leaf(Leaf {
                def: def(name)?,
                ty: ty.clone(),
                mandatory: *mandatory,
            }),
            NodeSpec::LeafList { name, ty } => SchemaNode::LeafList(LeafList {
                def: def(name)?,
                ty: ty.clone(),
            }),
            NodeSpec::Choice {
                name,
                cases,
                default_case,
            } => {
                let def = def(name)?;
                let cases = cases
                    .iter()
                    .map(|case| self.realize_case(case, &def.path, augmenting))
                    .collect::<Result<Vec<_>, _>>()?;
                let default_case = default_case
                    .as_deref()
                    .map(|case| QName::create(self.module, case))
                    .transpose()?;
                SchemaNode::Choice(Choice {
                    def,
                    cases,
                    default_case,
                    augmentations: Vec::new(),
                })
            }
            NodeSpec::Uses { grouping } => {
                return Err(SchemaError::GroupingNotFound {
                    module: self.module.clone(),
                    name: grouping.clone(),
                });
            }
        };

        Ok(node)
    }

    fn realize_case(
        &self,
        spec: &CaseSpec,
        choice: &SchemaPath,
        augmenting: bool,
    ) -> Result<Case, SchemaError> {
        let qname = QName::create(self.module, &spec.name)?;
        let mut def = NodeDef::new(qname.clone(), choice.child(qname));
        def.augmenting = augmenting;
        let children = self.realize_all(&spec.children, &def.path, augmenting)?;

        Ok(Case {
            def,
            children,
            augmentations: Vec::new(),
        })
    }

    // copy grouping children into place, keeping a pointer to the declaring node
    fn expand_uses(
        &self,
        name: &str,
        parent: &SchemaPath,
        augmenting: bool,
    ) -> Result<Vec<SchemaNode>, SchemaError> {
        let grouping = self
            .groupings
            .iter()
            .find(|g| g.def.qname.local_name() == name)
            .ok_or_else(|| SchemaError::GroupingNotFound {
                module: self.module.clone(),
                name: name.to_string(),
            })?;

        let mut nodes = grouping.children.clone();
        for node in &mut nodes {
            relocate_node(node, &grouping.def.path, parent, augmenting);
        }

        Ok(nodes)
    }
}

fn relocate_def(def: &mut NodeDef, from: &SchemaPath, to: &SchemaPath, augmenting: bool) {
    if let Some(path) = def.path.rebase(from, to) {
        let declared = std::mem::replace(&mut def.path, path);
        def.original.get_or_insert(declared);
    }
    def.added_by_uses = true;
    def.augmenting = augmenting;
}

fn relocate_node(node: &mut SchemaNode, from: &SchemaPath, to: &SchemaPath, augmenting: bool) {
    relocate_def(node.def_mut(), from, to, augmenting);

    match node {
        SchemaNode::Container(container) => {
            for child in &mut container.children {
                relocate_node(child, from, to, augmenting);
            }
        }
        SchemaNode::List(list) => {
            for child in &mut list.children {
                relocate_node(child, from, to, augmenting);
            }
        }
        SchemaNode::Choice(choice) => {
            for case in &mut choice.cases {
                relocate_def(&mut case.def, from, to, augmenting);
                for child in &mut case.children {
                    relocate_node(child, from, to, augmenting);
                }
            }
        }
        SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => {}
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
