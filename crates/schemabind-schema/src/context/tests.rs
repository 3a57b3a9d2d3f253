use super::*;
use crate::{
    build::{CaseSpec, ModuleBuilder, NodeSpec},
    node::LeafType,
    validate::ValidationIssue,
};

const BASE_NS: &str = "urn:ex:base";
const EXT_NS: &str = "urn:ex:ext";
const REV: Option<&str> = Some("2024-01-01");

fn base(local: &str) -> QName {
    QName::new(BASE_NS, REV, local).expect("base qname should build")
}

fn ext(local: &str) -> QName {
    QName::new(EXT_NS, REV, local).expect("ext qname should build")
}

fn base_module() -> Module {
    ModuleBuilder::new("base", BASE_NS, REV)
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
                    "choice-node",
                    vec![CaseSpec::new(
                        "a",
                        vec![
                            NodeSpec::leaf("value", LeafType::String),
                            NodeSpec::leaf("x", LeafType::Int64),
                        ],
                    )],
                ),
                NodeSpec::leaf("name", LeafType::String),
                NodeSpec::list(
                    "item",
                    &["id"],
                    vec![
                        NodeSpec::leaf("id", LeafType::Uint64),
                        NodeSpec::leaf("v", LeafType::String),
                    ],
                ),
                NodeSpec::uses("g"),
            ],
        ))
        .build()
        .expect("base module should build")
}

fn ext_module() -> Module {
    ModuleBuilder::new("ext", EXT_NS, REV)
        .expect("module header should build")
        .augment_cases(
            SchemaPath::from(vec![base("root"), base("choice-node")]),
            vec![CaseSpec::new("b", vec![NodeSpec::leaf("value", LeafType::String)])],
        )
        .augment(
            SchemaPath::from(vec![base("root")]),
            vec![NodeSpec::leaf("extra", LeafType::String)],
        )
        .build()
        .expect("ext module should build")
}

fn context() -> SchemaContext {
    SchemaContext::new(vec![base_module(), ext_module()]).expect("context should assemble")
}

// -----------------------------------------------------------------------------
// Assembly
// -----------------------------------------------------------------------------

#[test]
fn augmentations_are_merged_into_targets() {
    let ctx = context();
    let root = ctx
        .find_data_node(&SchemaPath::from(vec![base("root")]))
        .expect("root should exist");
    let choice = ctx
        .find_data_node(&SchemaPath::from(vec![base("root"), base("choice-node")]))
        .and_then(NodeRef::as_choice)
        .expect("choice should exist");

    let case_names: Vec<_> = choice.cases.iter().map(|c| c.def.qname.clone()).collect();
    assert_eq!(case_names, vec![base("a"), ext("b")]);
    assert!(choice.cases[1].def.augmenting);
    assert!(!choice.cases[1].def.added_by_uses);
    assert_eq!(choice.augmentations.len(), 1);
    assert_eq!(choice.augmentations[0].ordinal, 0);

    assert_eq!(root.augmentations().len(), 1);
    assert_eq!(root.augmentations()[0].ordinal, 1);
}

#[test]
fn augmented_nodes_live_below_their_target() {
    let ctx = context();
    let extra = ctx
        .find_data_node(&SchemaPath::from(vec![base("root"), ext("extra")]))
        .expect("augmented leaf should exist");

    assert!(extra.def().augmenting);
    assert_eq!(extra.path().parent(), Some(SchemaPath::from(vec![base("root")])));
}

#[test]
fn augmentation_onto_augmented_node_is_merged() {
    let ext2 = ModuleBuilder::new("ext2", "urn:ex:ext2", REV)
        .expect("module header should build")
        .augment(
            SchemaPath::from(vec![base("root"), base("choice-node"), ext("b")]),
            vec![NodeSpec::leaf("flag", LeafType::Empty)],
        )
        .build()
        .expect("ext2 module should build");

    // declared before ext, so the first merge pass cannot place it
    let ctx = SchemaContext::new(vec![ext2, base_module(), ext_module()])
        .expect("context should assemble");
    let case_b = ctx
        .find_data_node(&SchemaPath::from(vec![base("root"), base("choice-node"), ext("b")]))
        .and_then(NodeRef::as_case)
        .expect("case b should exist");

    assert_eq!(case_b.children.len(), 2);
    assert_eq!(case_b.augmentations.len(), 1);
}

#[test]
fn dangling_augment_target_is_rejected() {
    let orphan = ModuleBuilder::new("orphan", "urn:ex:orphan", None)
        .expect("module header should build")
        .augment(
            SchemaPath::from(vec![base("missing")]),
            vec![NodeSpec::leaf("x", LeafType::String)],
        )
        .build()
        .expect("orphan module should build");

    let err = SchemaContext::new(vec![base_module(), orphan]).expect_err("target is missing");

    assert!(matches!(err, SchemaError::AugmentTargetNotFound { .. }));
}

#[test]
fn duplicate_module_is_rejected() {
    let err = SchemaContext::new(vec![base_module(), base_module()])
        .expect_err("module declared twice");

    assert!(matches!(err, SchemaError::DuplicateModule(_)));
}

// -----------------------------------------------------------------------------
// Lookup
// -----------------------------------------------------------------------------

#[test]
fn find_node_descends_through_choice_and_case() {
    let ctx = context();

    let local = ctx
        .find_node(&[base("root"), base("value")])
        .expect("local value should resolve");
    let augmented = ctx
        .find_node(&[base("root"), ext("value")])
        .expect("augmented value should resolve");

    assert_eq!(
        local.path(),
        &SchemaPath::from(vec![base("root"), base("choice-node"), base("a"), base("value")])
    );
    assert_eq!(
        augmented.path(),
        &SchemaPath::from(vec![base("root"), base("choice-node"), ext("b"), ext("value")])
    );
}

#[test]
fn find_node_addresses_choice_and_case_segments() {
    let ctx = context();

    let choice = ctx
        .find_node(&[base("root"), base("choice-node")])
        .expect("choice should resolve");
    let case = ctx
        .find_node(&[base("root"), base("choice-node"), base("a")])
        .expect("case should resolve");
    let leaf = ctx
        .find_node(&[base("root"), base("choice-node"), base("x")])
        .expect("leaf below choice should resolve");

    assert!(choice.as_choice().is_some());
    assert!(case.as_case().is_some());
    assert!(leaf.as_leaf().is_some());
}

#[test]
fn find_node_rejects_nesting_inside_leaf() {
    let ctx = context();
    let err = ctx
        .find_node(&[base("root"), base("name"), base("x")])
        .expect_err("leaf has no children");

    assert!(matches!(err, SchemaError::NestedInLeaf { .. }));
}

#[test]
fn find_node_reports_missing_and_empty_paths() {
    let ctx = context();

    assert!(matches!(
        ctx.find_node(&[base("root"), base("nope")]),
        Err(SchemaError::NodeNotFound { .. })
    ));
    assert!(matches!(ctx.find_node(&[]), Err(SchemaError::EmptyPath)));
    assert!(matches!(
        ctx.find_node(&[QName::new("urn:unknown", None, "x").expect("qname should build")]),
        Err(SchemaError::ModuleNotFound(_))
    ));
}

#[test]
fn uses_copies_are_flagged_and_trace_back_to_grouping() {
    let ctx = context();
    let copied = ctx
        .find_data_node(&SchemaPath::from(vec![base("root"), base("mode"), base("on")]))
        .and_then(NodeRef::as_case)
        .expect("copied case should exist");

    assert!(copied.def.added_by_uses);
    assert_eq!(
        copied.def.original,
        Some(SchemaPath::from(vec![base("g"), base("mode"), base("on")]))
    );

    let original = ctx.find_original(copied).expect("grouping case should resolve");
    assert!(!original.def.added_by_uses);
    assert_eq!(original.def.path, SchemaPath::from(vec![base("g"), base("mode"), base("on")]));
}

#[test]
fn find_augmentation_by_id() {
    let ctx = context();
    let id = AugmentationId {
        module: ext("b").module().clone(),
        ordinal: 0,
    };

    let aug = ctx.find_augmentation(&id).expect("augmentation should resolve");

    assert_eq!(aug.cases.len(), 1);
    assert_eq!(aug.target, SchemaPath::from(vec![base("root"), base("choice-node")]));
}

// -----------------------------------------------------------------------------
// Validation
// -----------------------------------------------------------------------------

#[test]
fn validation_collects_every_issue() {
    let broken = ModuleBuilder::new("broken", "urn:ex:broken", None)
        .expect("module header should build")
        .child(NodeSpec::container(
            "top",
            vec![
                NodeSpec::leaf("dup", LeafType::String),
                NodeSpec::choice(
                    "c",
                    vec![
                        CaseSpec::new("hollow", vec![]),
                        CaseSpec::new("full", vec![NodeSpec::leaf("dup", LeafType::String)]),
                    ],
                ),
                NodeSpec::list("rows", &["id"], vec![NodeSpec::leaf("v", LeafType::String)]),
            ],
        ))
        .identity(
            "alg",
            Some(QName::new("urn:ex:broken", None, "missing-base").expect("qname should build")),
        )
        .build()
        .expect("module should build");

    let err = SchemaContext::new(vec![broken]).expect_err("module is invalid");
    let SchemaError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };

    assert_eq!(validation.issues.len(), 4);
    assert!(validation.issues.iter().any(|i| matches!(i, ValidationIssue::DuplicateChild { .. })));
    assert!(validation.issues.iter().any(|i| matches!(i, ValidationIssue::EmptyCase { .. })));
    assert!(validation.issues.iter().any(|i| matches!(i, ValidationIssue::MissingKey { .. })));
    assert!(
        validation
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::UnknownIdentityBase { .. }))
    );
}

#[test]
fn same_name_in_sibling_cases_is_allowed() {
    let module = ModuleBuilder::new("cases", "urn:ex:cases", None)
        .expect("module header should build")
        .child(NodeSpec::container(
            "top",
            vec![NodeSpec::choice(
                "c",
                vec![
                    CaseSpec::new("one", vec![NodeSpec::leaf("v", LeafType::String)]),
                    CaseSpec::new("two", vec![NodeSpec::leaf("v", LeafType::Int64)]),
                ],
            )],
        ))
        .build()
        .expect("module should build");

    assert!(SchemaContext::new(vec![module]).is_ok());
}
