use schemabind::prelude::*;
use schemabind_testing_fixtures::{Fixture, FixtureObject, FixtureValue, schemas};
use std::thread;

fn base(local: &str) -> QName {
    schemas::base_qn(local).expect("qname should build")
}

fn fixture() -> Fixture {
    let modules = vec![
        schemas::base().expect("base should build"),
        schemas::ext().expect("ext should build"),
        schemas::other().expect("other should build"),
    ];

    Fixture::new(modules, RegistryConfig::default()).expect("fixture should build")
}

#[test]
fn concurrent_requests_share_one_codec() {
    let fixture = fixture();
    let root = fixture.load(&[base("root")]).expect("root should load");

    let handles: Vec<CodecHandle> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    fixture
                        .registry
                        .codec_for(&root)
                        .expect("root should resolve")
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| worker.join().expect("worker should finish"))
            .collect()
    });

    assert!(handles.iter().all(|handle| handle.ptr_eq(&handles[0])));
    assert!(fixture.registry.is_codec_available(&root));
}

#[test]
fn dropped_types_are_reclaimed_and_regenerated() {
    let fixture = fixture();
    let root = fixture.load(&[base("root")]).expect("root should load");
    let first = fixture.registry.codec_for(&root).expect("root should resolve");
    let generated = fixture.generator.generated();

    drop(root);
    fixture.loader.unload_all();
    assert!(fixture.registry.reclaim() > 0);

    let reloaded = fixture.load(&[base("root")]).expect("root should reload");
    assert!(!fixture.registry.is_codec_available(&reloaded));

    let second = fixture.registry.codec_for(&reloaded).expect("reloaded root should resolve");
    assert!(!second.ptr_eq(&first));
    assert!(fixture.generator.generated() > generated);
    assert!(fixture.registry.metrics().entries_reclaimed > 0);
}

#[test]
fn generation_failures_surface_and_are_counted() {
    let fixture = fixture();
    let descriptor = fixture.descriptor(&[base("root")]).expect("root should be bound");
    fixture.generator.fail_on(descriptor);
    let root = fixture.load(&[base("root")]).expect("root should load");

    let err = fixture.registry.codec_for(&root).expect_err("instantiation should fail");

    assert_eq!(err.class, ErrorClass::Generation);
    assert_eq!(err.origin, ErrorOrigin::Generator);
    assert_eq!(fixture.registry.metrics().generation_failures, 1);
    assert!(!fixture.registry.is_codec_available(&root));
}

#[test]
fn encountered_containers_materialize_their_choices() {
    let fixture = fixture();
    let root = fixture.load(&[base("root")]).expect("root should load");

    fixture.registry.on_model_type_encountered(&root);

    let choice = fixture
        .load(&[base("root"), base("choice-node")])
        .expect("choice should load");
    assert!(fixture.registry.is_codec_available(&root));
    assert!(fixture.registry.is_codec_available(&choice));
}

#[test]
fn processed_types_are_registered_without_codecs() {
    let fixture = fixture();
    let root = fixture.load(&[base("root")]).expect("root should load");

    fixture.registry.on_type_processed(&root);

    assert!(!fixture.registry.is_codec_available(&root));
    let resolved = fixture
        .registry
        .resolve_type(root.descriptor())
        .expect("processed type should resolve");
    assert_eq!(resolved, root);
}

#[test]
fn containers_round_trip_lists_and_leaf_sets() {
    let fixture = fixture();
    let root_type = fixture.type_at(&[base("root")]).expect("root should resolve");
    let item_type = fixture
        .type_at(&[base("root"), base("item")])
        .expect("item should resolve");

    let entry = |id: u64, label: &str| {
        FixtureObject::new(item_type.clone())
            .with(base("id"), FixtureValue::Leaf(WireValue::Uint(id)))
            .with(base("label"), FixtureValue::Leaf(WireValue::Text(label.to_string())))
            .into_object()
    };
    let root = FixtureObject::new(root_type.clone())
        .with(base("name"), FixtureValue::Leaf(WireValue::Text("r1".to_string())))
        .with(
            base("tags"),
            FixtureValue::LeafSet(vec![
                WireValue::Text("a".to_string()),
                WireValue::Text("b".to_string()),
            ]),
        )
        .with(base("item"), FixtureValue::Entries(vec![entry(1, "one"), entry(2, "two")]));

    let node = fixture.registry.serialize(&root).expect("root should serialize");
    assert_eq!(node.qname(), &base("root"));
    assert_eq!(node.children_named(&base("item")).count(), 2);
    assert_eq!(
        node.to_string(),
        "root{name=\"r1\", tags=[\"a\", \"b\"], item{id=1, label=\"one\"}, item{id=2, label=\"two\"}}"
    );

    let back = fixture
        .registry
        .deserialize(&root_type, &node)
        .expect("root should deserialize")
        .expect("root node should produce an object");
    assert_eq!(FixtureObject::downcast(back.as_ref()), Some(&root));
}

#[test]
fn leaves_where_composites_belong_are_rejected() {
    let fixture = fixture();
    let root_type = fixture.type_at(&[base("root")]).expect("root should resolve");
    let leaf = WireNode::leaf(base("root"), WireValue::Empty);

    let err = fixture
        .registry
        .deserialize(&root_type, &leaf)
        .expect_err("a leaf is not a container");

    assert_eq!(err.class, ErrorClass::InvalidInput);
}

#[test]
fn key_codecs_read_list_entries() {
    let fixture = fixture();
    let codec = fixture
        .registry
        .key_codec_for_path(&[base("root"), base("item")])
        .expect("item should have a key codec");
    let cx = CodecContext::new(&fixture.registry);

    let entry = WireNode::composite(
        base("item"),
        vec![
            WireNode::leaf(base("id"), WireValue::Uint(7)),
            WireNode::leaf(base("label"), WireValue::Text("seven".to_string())),
        ],
    );
    let key = codec
        .deserialize(&entry, &cx)
        .expect("key should deserialize")
        .expect("entry should carry a key");
    let key = FixtureObject::downcast(key.as_ref()).expect("key should be a fixture object");

    assert_eq!(key.fields().len(), 1);
    assert_eq!(key.leaf(&base("id")), Some(&WireValue::Uint(7)));
    assert_eq!(
        codec.serialize(key, &cx).expect("key should serialize"),
        vec![WireNode::leaf(base("id"), WireValue::Uint(7))]
    );
}

#[test]
fn unkeyed_lookups_are_misuse() {
    let fixture = fixture();
    let root = fixture.type_at(&[base("root")]).expect("root should resolve");

    let err = fixture
        .registry
        .identifier_codec_for_identifiable(&root)
        .expect_err("root is not a keyed list");

    assert!(err.is_misuse());
}
