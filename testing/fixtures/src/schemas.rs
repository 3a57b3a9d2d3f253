//! Schema modules shared by the scenario tests.
//!
//! `base` declares `root` with a choice, an identityref leaf, a leaf-list
//! and a keyed list. `ext` adds a case to the choice and a container to
//! `root`; `other` adds a second augmentation to `root`. The dispatch set
//! is a small module pair for case selection.

use schemabind::prelude::*;

pub const BASE_NS: &str = "urn:schemabind:test:base";
pub const EXT_NS: &str = "urn:schemabind:test:ext";
pub const OTHER_NS: &str = "urn:schemabind:test:other";
pub const DISPATCH_NS: &str = "urn:schemabind:test:dispatch";
pub const DISPATCH_EXT_NS: &str = "urn:schemabind:test:dispatch-ext";

pub fn base_qn(local: &str) -> Result<QName, SchemaError> {
    Ok(QName::new(BASE_NS, None, local)?)
}

pub fn ext_qn(local: &str) -> Result<QName, SchemaError> {
    Ok(QName::new(EXT_NS, None, local)?)
}

pub fn other_qn(local: &str) -> Result<QName, SchemaError> {
    Ok(QName::new(OTHER_NS, None, local)?)
}

pub fn dispatch_qn(local: &str) -> Result<QName, SchemaError> {
    Ok(QName::new(DISPATCH_NS, None, local)?)
}

pub fn dispatch_ext_qn(local: &str) -> Result<QName, SchemaError> {
    Ok(QName::new(DISPATCH_EXT_NS, None, local)?)
}

fn root_path() -> Result<SchemaPath, SchemaError> {
    Ok(SchemaPath::root().child(base_qn("root")?))
}

fn base_root(extra: Vec<NodeSpec>) -> Result<Module, SchemaError> {
    let mut children = vec![
        NodeSpec::leaf("name", LeafType::String),
        NodeSpec::choice(
            "choice-node",
            vec![CaseSpec::new("a", vec![NodeSpec::leaf("value", LeafType::String)])],
        ),
        NodeSpec::leaf("kind", LeafType::IdentityRef { base: base_qn("alg")? }),
        NodeSpec::leaf_list("tags", LeafType::String),
        NodeSpec::list(
            "item",
            &["id"],
            vec![
                NodeSpec::leaf("id", LeafType::Uint64),
                NodeSpec::leaf("label", LeafType::String),
            ],
        ),
    ];
    children.extend(extra);

    ModuleBuilder::new("base", BASE_NS, None)?
        .child(NodeSpec::container("root", children))
        .identity("alg", None)
        .identity("sha", Some(base_qn("alg")?))
        .build()
}

pub fn base() -> Result<Module, SchemaError> {
    base_root(Vec::new())
}

/// `base` with one more container, `root/added`.
pub fn base_v2() -> Result<Module, SchemaError> {
    base_root(vec![NodeSpec::container(
        "added",
        vec![NodeSpec::leaf("count", LeafType::Uint64)],
    )])
}

pub fn ext() -> Result<Module, SchemaError> {
    ext_with_case_leaf("value")
}

/// `ext` whose case `b` is signalled by `label` rather than `value`.
pub fn ext_v2() -> Result<Module, SchemaError> {
    ext_with_case_leaf("label")
}

fn ext_with_case_leaf(leaf: &str) -> Result<Module, SchemaError> {
    let root = root_path()?;
    let choice = root.child(base_qn("choice-node")?);

    ModuleBuilder::new("ext", EXT_NS, None)?
        .augment_cases(
            choice,
            vec![CaseSpec::new("b", vec![NodeSpec::leaf(leaf, LeafType::String)])],
        )
        .augment(
            root,
            vec![NodeSpec::container("extra", vec![NodeSpec::leaf("note", LeafType::String)])],
        )
        .build()
}

pub fn other() -> Result<Module, SchemaError> {
    ModuleBuilder::new("other", OTHER_NS, None)?
        .augment(root_path()?, vec![NodeSpec::leaf("flag", LeafType::Boolean)])
        .build()
}

/// `top` with choice `sel`: local case `a {x, y}` plus augmenting case
/// `b {z}` from a second module.
pub fn dispatch() -> Result<Vec<Module>, SchemaError> {
    let local = ModuleBuilder::new("dispatch", DISPATCH_NS, None)?
        .child(NodeSpec::container(
            "top",
            vec![NodeSpec::choice(
                "sel",
                vec![CaseSpec::new(
                    "a",
                    vec![
                        NodeSpec::leaf("x", LeafType::Int64),
                        NodeSpec::leaf("y", LeafType::Int64),
                    ],
                )],
            )],
        ))
        .build()?;

    let sel = SchemaPath::root()
        .child(dispatch_qn("top")?)
        .child(dispatch_qn("sel")?);
    let augmenting = ModuleBuilder::new("dispatch-ext", DISPATCH_EXT_NS, None)?
        .augment_cases(sel, vec![CaseSpec::new("b", vec![NodeSpec::leaf("z", LeafType::Int64)])])
        .build()?;

    Ok(vec![local, augmenting])
}
