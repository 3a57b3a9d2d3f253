use schemabind::prelude::*;
use schemabind_testing_fixtures::{Fixture, FixtureObject, FixtureValue, schemas};

fn d(local: &str) -> QName {
    schemas::dispatch_qn(local).expect("qname should build")
}

fn dx(local: &str) -> QName {
    schemas::dispatch_ext_qn(local).expect("qname should build")
}

fn base(local: &str) -> QName {
    schemas::base_qn(local).expect("qname should build")
}

fn ext(local: &str) -> QName {
    schemas::ext_qn(local).expect("qname should build")
}

fn dispatch_fixture(config: RegistryConfig) -> Fixture {
    Fixture::new(schemas::dispatch().expect("dispatch modules should build"), config)
        .expect("fixture should build")
}

fn base_fixture() -> Fixture {
    let modules = vec![
        schemas::base().expect("base should build"),
        schemas::ext().expect("ext should build"),
    ];

    Fixture::new(modules, RegistryConfig::default()).expect("fixture should build")
}

fn top(children: Vec<WireNode>) -> WireNode {
    WireNode::composite(d("top"), children)
}

#[test]
fn local_and_augmenting_cases_dispatch_by_wire_name() {
    let fixture = dispatch_fixture(RegistryConfig::default());
    let sel = fixture.load(&[d("top"), d("sel")]).expect("choice should load");
    let case_a = fixture.descriptor(&[d("top"), d("sel"), d("a")]).expect("a should be bound");
    let case_b = fixture.descriptor(&[d("top"), d("sel"), dx("b")]).expect("b should be bound");

    let local = fixture
        .registry
        .resolve_case(&sel, &top(vec![WireNode::leaf(d("x"), WireValue::Int(1))]))
        .expect("x should select a");
    let augmenting = fixture
        .registry
        .resolve_case(&sel, &top(vec![WireNode::leaf(dx("z"), WireValue::Int(2))]))
        .expect("dx:z should select b");

    assert_eq!(local.descriptor(), &case_a);
    assert_eq!(augmenting.descriptor(), &case_b);
    assert_eq!(fixture.registry.metrics().case_dispatches, 2);
}

#[test]
fn foreign_names_do_not_dispatch() {
    let fixture = dispatch_fixture(RegistryConfig::default());
    let sel = fixture.load(&[d("top"), d("sel")]).expect("choice should load");

    // z is only a case member in the augmenting namespace
    let wrong_module = fixture
        .registry
        .resolve_case(&sel, &top(vec![WireNode::leaf(d("z"), WireValue::Int(1))]))
        .expect_err("d:z belongs to no case");
    // x is only a case member in the choice's own namespace
    let wrong_local = fixture
        .registry
        .resolve_case(&sel, &top(vec![WireNode::leaf(dx("x"), WireValue::Int(1))]))
        .expect_err("dx:x belongs to no case");

    assert!(wrong_module.is_ambiguous());
    assert!(wrong_local.is_ambiguous());
    assert_eq!(wrong_local.origin, ErrorOrigin::Choice);
    assert_eq!(fixture.registry.metrics().ambiguous_dispatches, 2);
}

#[test]
fn non_choice_types_cannot_dispatch() {
    let fixture = dispatch_fixture(RegistryConfig::default());
    let top_type = fixture.load(&[d("top")]).expect("top should load");

    let err = fixture
        .registry
        .resolve_case(&top_type, &top(Vec::new()))
        .expect_err("top is not a choice");

    assert!(err.is_misuse());
}

#[test]
fn augmenting_case_round_trips_through_its_parent() {
    let fixture = dispatch_fixture(RegistryConfig::default());
    let top_type = fixture.type_at(&[d("top")]).expect("top should resolve");
    let case_b = fixture
        .load(&[d("top"), d("sel"), dx("b")])
        .expect("b should load");

    let selected = FixtureObject::new(case_b)
        .with(dx("z"), FixtureValue::Leaf(WireValue::Int(5)))
        .into_object();
    let object = FixtureObject::new(top_type.clone()).with(d("sel"), FixtureValue::Case(selected));

    let node = fixture.registry.serialize(&object).expect("top should serialize");
    assert_eq!(node, top(vec![WireNode::leaf(dx("z"), WireValue::Int(5))]));

    let back = fixture
        .registry
        .deserialize(&top_type, &node)
        .expect("top should deserialize")
        .expect("top should produce an object");
    let back = FixtureObject::downcast(back.as_ref()).expect("top should be a fixture object");

    assert_eq!(back, &object);
    assert_eq!(
        back.case(&d("sel")).and_then(|case| case.leaf(&dx("z"))),
        Some(&WireValue::Int(5))
    );
}

#[test]
fn parents_without_case_data_leave_the_choice_unset() {
    let fixture = dispatch_fixture(RegistryConfig::default());
    let top_type = fixture.type_at(&[d("top")]).expect("top should resolve");

    let back = fixture
        .registry
        .deserialize(&top_type, &top(Vec::new()))
        .expect("empty top should deserialize")
        .expect("containers always produce an object");
    let back = FixtureObject::downcast(back.as_ref()).expect("top should be a fixture object");

    assert!(back.field(&d("sel")).is_none());
    assert_eq!(fixture.registry.metrics().ambiguous_dispatches, 0);
}

#[test]
fn same_local_name_resolves_by_namespace() {
    let fixture = base_fixture();
    let root_type = fixture.type_at(&[base("root")]).expect("root should resolve");
    let case_a = fixture
        .descriptor(&[base("root"), base("choice-node"), base("a")])
        .expect("a should be bound");
    let case_b = fixture
        .descriptor(&[base("root"), base("choice-node"), ext("b")])
        .expect("b should be bound");

    let read_case = |value: QName| {
        let node = WireNode::composite(
            base("root"),
            vec![WireNode::leaf(value.clone(), WireValue::Text("v".to_string()))],
        );
        let back = fixture
            .registry
            .deserialize(&root_type, &node)
            .expect("root should deserialize")
            .expect("root should produce an object");
        let back = FixtureObject::downcast(back.as_ref()).expect("root should be a fixture object");
        let case = back.case(&base("choice-node")).expect("a case should be selected");

        assert_eq!(case.leaf(&value), Some(&WireValue::Text("v".to_string())));
        case.model_type().descriptor().clone()
    };

    assert_eq!(read_case(base("value")), case_a);
    assert_eq!(read_case(ext("value")), case_b);
}

#[test]
fn eager_activation_readies_every_case() {
    let config = RegistryConfig {
        eager_case_activation: true,
        ..RegistryConfig::default()
    };
    let fixture = dispatch_fixture(config);
    let sel = fixture.load(&[d("top"), d("sel")]).expect("choice should load");

    let handle = fixture.registry.codec_for(&sel).expect("choice should resolve");
    let choice = handle.as_choice().expect("handle should be a choice codec");

    assert_eq!(choice.cases().len(), 2);
    assert!(choice.cases().iter().all(|case| case.is_ready()));
    assert_eq!(fixture.registry.metrics().cases_activated, 2);
}

#[test]
fn lazy_activation_waits_for_first_use() {
    let fixture = dispatch_fixture(RegistryConfig::default());
    let sel = fixture.load(&[d("top"), d("sel")]).expect("choice should load");

    let handle = fixture.registry.codec_for(&sel).expect("choice should resolve");
    let choice = handle.as_choice().expect("handle should be a choice codec");

    assert_eq!(choice.cases().len(), 2);
    assert!(choice.cases().iter().all(|case| !case.is_ready()));
    assert_eq!(fixture.registry.metrics().cases_activated, 0);

    let entry = fixture
        .registry
        .resolve_case(&sel, &top(vec![WireNode::leaf(d("y"), WireValue::Int(3))]))
        .expect("y should select a");
    fixture.registry.activate_case(&entry).expect("a should activate");

    assert!(entry.is_ready());
    assert_eq!(fixture.registry.metrics().cases_activated, 1);
}

#[test]
fn choice_codecs_are_dispatch_only() {
    let fixture = dispatch_fixture(RegistryConfig::default());
    let sel = fixture.load(&[d("top"), d("sel")]).expect("choice should load");
    let top_type = fixture.load(&[d("top")]).expect("top should load");

    let handle = fixture.registry.codec_for(&sel).expect("choice should resolve");
    let err = handle
        .serialize(&FixtureObject::new(top_type), &fixture.registry)
        .expect_err("choices are not serialized directly");

    assert!(err.is_misuse());
}
