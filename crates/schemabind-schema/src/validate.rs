use crate::{
    context::SchemaContext,
    node::{DataNodeContainer, SchemaNode},
    path::SchemaPath,
    qname::QName,
};
use std::{collections::HashSet, fmt};
use thiserror::Error as ThisError;

///
/// ValidationIssue
///

#[derive(Clone, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ValidationIssue {
    DuplicateChild { parent: SchemaPath, qname: QName },
    EmptyCase { path: SchemaPath },
    MissingKey { list: SchemaPath, key: QName },
    UnknownIdentityBase { identity: QName, base: QName },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateChild { parent, qname } => {
                write!(f, "duplicate child {qname} under {parent}")
            }
            Self::EmptyCase { path } => write!(f, "case {path} declares no children"),
            Self::MissingKey { list, key } => {
                write!(f, "list {list} names key {key} which is not a leaf child")
            }
            Self::UnknownIdentityBase { identity, base } => {
                write!(f, "identity {identity} derives from unknown base {base}")
            }
        }
    }
}

///
/// ValidationError
///
/// Every issue found in one pass; never empty.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema validation failed with {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }

        Ok(())
    }
}

// validate an assembled context; augmentations are already merged
pub(crate) fn validate_context(context: &SchemaContext) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    for module in context.modules() {
        validate_children(&SchemaPath::root(), module.children(), &mut issues);

        for grouping in &module.groupings {
            validate_children(&grouping.def.path, &grouping.children, &mut issues);
        }

        for identity in &module.identities {
            if let Some(base) = &identity.base
                && context.find_identity(base).is_none()
            {
                issues.push(ValidationIssue::UnknownIdentityBase {
                    identity: identity.qname.clone(),
                    base: base.clone(),
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

// sibling names share one namespace with the children of every case below
// a choice, since cases are transparent on the wire
fn validate_children(
    parent: &SchemaPath,
    children: &[SchemaNode],
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();
    collect_wire_names(children, &mut seen, parent, issues);

    validate_structure(children, issues);
}

fn validate_structure(children: &[SchemaNode], issues: &mut Vec<ValidationIssue>) {
    for child in children {
        match child {
            SchemaNode::Container(container) => {
                validate_children(&container.def.path, &container.children, issues);
            }
            SchemaNode::List(list) => {
                for key in &list.keys {
                    if !matches!(list.data_child(key), Some(SchemaNode::Leaf(_))) {
                        issues.push(ValidationIssue::MissingKey {
                            list: list.def.path.clone(),
                            key: key.clone(),
                        });
                    }
                }
                validate_children(&list.def.path, &list.children, issues);
            }
            SchemaNode::Choice(choice) => {
                for case in &choice.cases {
                    if case.children.is_empty() {
                        issues.push(ValidationIssue::EmptyCase {
                            path: case.def.path.clone(),
                        });
                    }
                    validate_structure(&case.children, issues);
                }
            }
            SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => {}
        }
    }
}

fn collect_wire_names(
    children: &[SchemaNode],
    seen: &mut HashSet<QName>,
    parent: &SchemaPath,
    issues: &mut Vec<ValidationIssue>,
) {
    for child in children {
        if let SchemaNode::Choice(choice) = child {
            // names may repeat across cases of one choice, never within one
            let outer = seen.clone();
            let mut union = HashSet::new();
            for case in &choice.cases {
                let mut scope = outer.clone();
                collect_wire_names(&case.children, &mut scope, parent, issues);
                union.extend(scope);
            }
            seen.extend(union);
        } else if !seen.insert(child.qname().clone()) {
            issues.push(ValidationIssue::DuplicateChild {
                parent: parent.clone(),
                qname: child.qname().clone(),
            });
        }
    }
}
