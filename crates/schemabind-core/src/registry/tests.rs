use super::*;
use crate::{
    error::ErrorClass,
    generator::{CodecFactory, GenerationError, GenerationInput, PrimitiveCodec},
    loader::LoadError,
    model::ModelClass,
    wire::WireValue,
};
use parking_lot::Mutex;
use schemabind_schema::{
    bindings::SchemaGeneration,
    build::{CaseSpec, ModuleBuilder, NodeSpec},
    node::{Case, LeafType},
};
use std::{collections::HashMap, thread, time::Duration};

const NS: &str = "urn:test:registry";

///
/// Stub collaborators
///

struct StubCodec;

impl PrimitiveCodec for StubCodec {
    fn serialize(
        &self,
        _object: &dyn DataObject,
        _cx: &CodecContext<'_>,
    ) -> Result<Vec<WireNode>, BindingError> {
        Ok(Vec::new())
    }

    fn deserialize(
        &self,
        _node: &WireNode,
        _cx: &CodecContext<'_>,
    ) -> Result<Option<ModelObject>, BindingError> {
        Ok(None)
    }
}

struct StubFactory;

impl CodecFactory for StubFactory {
    fn instantiate(self: Box<Self>) -> Result<Box<dyn PrimitiveCodec>, GenerationError> {
        Ok(Box::new(StubCodec))
    }
}

struct StubGenerator;

impl StubGenerator {
    fn factory() -> Result<Box<dyn CodecFactory>, GenerationError> {
        Ok(Box::new(StubFactory))
    }
}

impl CodecGenerator for StubGenerator {
    fn codec_for(
        &self,
        _input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        Self::factory()
    }

    fn key_codec_for(
        &self,
        _input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        Self::factory()
    }

    fn augmentation_codec_for(
        &self,
        _input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        Self::factory()
    }

    fn case_codec_for(
        &self,
        _input: &GenerationInput<'_>,
        _schema: &Case,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        Self::factory()
    }

    fn choice_codec_for(
        &self,
        _input: &GenerationInput<'_>,
    ) -> Result<Box<dyn CodecFactory>, GenerationError> {
        Self::factory()
    }
}

#[derive(Default)]
struct MapLoader {
    types: Mutex<HashMap<String, ModelType>>,
}

impl MapLoader {
    fn insert(&self, ty: &ModelType) {
        self.types
            .lock()
            .insert(ty.descriptor().fully_qualified_name(), ty.clone());
    }

    fn remove(&self, ty: &ModelType) {
        self.types.lock().remove(&ty.descriptor().fully_qualified_name());
    }
}

impl TypeLoader for MapLoader {
    fn load_type(&self, name: &str) -> Result<ModelType, LoadError> {
        self.types
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}

///
/// Setup
///

struct Setup {
    registry: CodecRegistry,
    loader: Arc<MapLoader>,
    generation: SchemaGeneration,
}

impl Setup {
    fn new(config: RegistryConfig) -> Self {
        let module = ModuleBuilder::new("reg", NS, None)
            .expect("module header should build")
            .child(NodeSpec::container(
                "root",
                vec![
                    NodeSpec::leaf("flag", LeafType::Boolean),
                    NodeSpec::choice(
                        "pick",
                        vec![
                            CaseSpec::new("a", vec![NodeSpec::leaf("x", LeafType::Int64)]),
                            CaseSpec::new("b", vec![NodeSpec::leaf("y", LeafType::Int64)]),
                        ],
                    ),
                    NodeSpec::list("item", &["id"], vec![NodeSpec::leaf("id", LeafType::Uint64)]),
                ],
            ))
            .identity("alg", None)
            .build()
            .expect("module should build");
        let generation =
            SchemaGeneration::from_modules(vec![module]).expect("generation should derive");

        let loader = Arc::new(MapLoader::default());
        let registry = CodecRegistry::new(
            config,
            Arc::new(StubGenerator),
            Arc::clone(&loader) as Arc<dyn TypeLoader>,
        );

        Self {
            registry,
            loader,
            generation,
        }
    }

    fn installed() -> Self {
        let setup = Self::new(RegistryConfig::default());
        setup.registry.on_schema_generated(&setup.generation);

        setup
    }

    fn path(names: &[&str]) -> SchemaPath {
        names.iter().map(|name| qn(name)).collect()
    }

    fn descriptor(&self, names: &[&str]) -> TypeDescriptor {
        self.generation
            .descriptor_for(&Self::path(names))
            .expect("path should be bound")
            .clone()
    }

    fn load(&self, class: ModelClass) -> ModelType {
        let ty = ModelType::new(class);
        self.loader.insert(&ty);

        ty
    }

    fn root(&self) -> ModelType {
        self.load(
            ModelClass::new(self.descriptor(&["root"]), ModelKind::Container)
                .with_qname(qn("root")),
        )
    }

    fn pick(&self) -> ModelType {
        self.load(ModelClass::new(self.descriptor(&["root", "pick"]), ModelKind::Choice))
    }

    fn case(&self, name: &str) -> ModelType {
        self.load(
            ModelClass::new(self.descriptor(&["root", "pick", name]), ModelKind::Case)
                .with_supertype(self.descriptor(&["root", "pick"])),
        )
    }

    fn item(&self) -> (ModelType, ModelType) {
        let item_path = Self::path(&["root", "item"]);
        let key = self.generation.bindings[0]
            .keys
            .get(&item_path)
            .expect("keyed list should have a key type")
            .clone();
        let key_type = self.load(ModelClass::new(key.clone(), ModelKind::Identifier));
        let list = self.load(ModelClass::new(
            self.descriptor(&["root", "item"]),
            ModelKind::List { identifier: Some(key) },
        ));

        (list, key_type)
    }
}

fn qn(local: &str) -> QName {
    QName::new(NS, None, local).expect("qname should build")
}

fn root_with(children: &[&str]) -> WireNode {
    WireNode::composite(
        qn("root"),
        children
            .iter()
            .map(|name| WireNode::leaf(qn(name), WireValue::Int(1)))
            .collect(),
    )
}

// ---- Tests ----

#[test]
fn concurrent_resolution_shares_one_codec() {
    let setup = Setup::installed();
    setup.pick();
    let root = setup.root();

    let handles: Vec<_> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| setup.registry.codec_for(&root).expect("root should resolve")))
            .collect();

        workers
            .into_iter()
            .map(|worker| worker.join().expect("worker should finish"))
            .collect()
    });

    assert!(handles.iter().all(|handle| handle.ptr_eq(&handles[0])));
    assert_eq!(handles[0].kind(), CodecKind::Container);
    assert!(setup.registry.is_codec_available(&root));
}

#[test]
fn repeated_resolution_hits_the_cache() {
    let setup = Setup::installed();
    setup.pick();
    let root = setup.root();

    let first = setup.registry.codec_for(&root).expect("root should resolve");
    let second = setup.registry.codec_for(&root).expect("root should resolve");

    assert!(first.ptr_eq(&second));
    let metrics = setup.registry.metrics();
    assert!(metrics.cache_hits >= 1);
    assert!(metrics.codecs_generated >= 2, "root and its choice are generated");
}

#[test]
fn identity_types_are_refused() {
    let setup = Setup::installed();
    let identity = ModelType::new(ModelClass::new(
        TypeDescriptor::new("test.registry", "Alg").expect("descriptor should build"),
        ModelKind::Identity { base: None },
    ));

    let err = setup.registry.codec_for(&identity).expect_err("identity types have no data codec");
    assert!(err.is_misuse());

    let codec = setup
        .registry
        .codec_for_identity(&identity)
        .expect("identity codec should be handed out");
    assert!(Arc::ptr_eq(&codec, &setup.registry.identity_codec()));
}

#[test]
fn choice_and_case_handles_refuse_direct_use() {
    let setup = Setup::installed();
    let pick = setup.pick();
    setup.case("a");

    let choice = setup.registry.codec_for(&pick).expect("choice should resolve");
    let err = choice
        .deserialize(&root_with(&["x"]), &setup.registry)
        .expect_err("choices are dispatch-only");

    assert!(err.is_misuse());
    assert_eq!(err.origin, ErrorOrigin::Choice);
}

#[test]
fn case_entries_are_pending_until_dispatched() {
    let setup = Setup::installed();
    let pick = setup.pick();
    let case_a = setup.case("a");
    setup.case("b");

    let choice = setup.registry.codec_for(&pick).expect("choice should resolve");
    let choice = choice.as_choice().expect("handle should be a choice");
    assert_eq!(choice.cases().len(), 2);
    assert!(choice.cases().iter().all(|case| !case.is_ready()));

    let entry = setup
        .registry
        .resolve_case(&pick, &root_with(&["x"]))
        .expect("x signals case a");
    assert_eq!(entry.descriptor(), case_a.descriptor());

    let activation = setup.registry.activate_case(&entry).expect("case a should activate");
    assert!(activation.is_for(&case_a));
    assert!(entry.is_ready());
    assert_eq!(setup.registry.metrics().cases_activated, 1);
}

#[test]
fn unmatched_children_are_ambiguous() {
    let setup = Setup::installed();
    let pick = setup.pick();

    let err = setup
        .registry
        .resolve_case(&pick, &root_with(&["flag"]))
        .expect_err("flag belongs to no case");

    assert!(err.is_ambiguous());
    assert_eq!(setup.registry.metrics().ambiguous_dispatches, 1);
}

#[test]
fn missing_schema_is_not_ready() {
    let setup = Setup::new(RegistryConfig::default());
    let root = setup.root();

    let err = setup.registry.codec_for(&root).expect_err("no schema is installed");

    assert_eq!(err.class, ErrorClass::NotReady);
}

#[test]
fn bounded_wait_times_out_while_generation_pending() {
    let setup = Setup::new(RegistryConfig {
        schema_wait_timeout_ms: Some(20),
        ..RegistryConfig::default()
    });
    let root = setup.root();
    let _guard = setup.registry.begin_generation();

    let err = setup.registry.codec_for(&root).expect_err("wait should time out");

    assert_eq!(err.class, ErrorClass::NotReady);
    assert!(err.message.contains("20ms"), "unexpected message: {}", err.message);
}

#[test]
fn waiting_request_resumes_after_install() {
    let setup = Setup::new(RegistryConfig::default());
    setup.pick();
    let root = setup.root();
    let guard = setup.registry.begin_generation();

    thread::scope(|scope| {
        let waiter = scope.spawn(|| setup.registry.codec_for(&root));

        thread::sleep(Duration::from_millis(20));
        setup.registry.on_schema_generated(&setup.generation);
        drop(guard);

        let handle = waiter.join().expect("waiter should finish").expect("root should resolve");
        assert_eq!(handle.kind(), CodecKind::Container);
    });
}

#[test]
fn reclaim_drops_entries_of_dead_types() {
    let setup = Setup::installed();
    setup.pick();
    let root = setup.root();
    let first = setup.registry.codec_for(&root).expect("root should resolve");

    setup.loader.remove(&root);
    drop(root);
    drop(first);

    assert!(setup.registry.reclaim() >= 1);
    assert!(setup.registry.metrics().entries_reclaimed >= 1);

    let reloaded = setup.root();
    assert!(!setup.registry.is_codec_available(&reloaded));
    setup.registry.codec_for(&reloaded).expect("reloaded root should resolve");
    assert!(setup.registry.is_codec_available(&reloaded));
}

#[test]
fn schema_paths_resolve_through_choices() {
    let setup = Setup::installed();
    let root = setup.root();
    let pick = setup.pick();

    let found = setup
        .registry
        .class_for_schema_path(&[qn("root")])
        .expect("root should resolve");
    assert_eq!(found, root);

    let found = setup
        .registry
        .class_for_schema_path(&[qn("root"), qn("pick")])
        .expect("choice should resolve");
    assert_eq!(found, pick);

    let err = setup
        .registry
        .class_for_schema_path(&[qn("root"), qn("missing")])
        .expect_err("no such node");
    assert_eq!(err.class, ErrorClass::Schema);
}

#[test]
fn instantiated_paths_fill_unbound_nodes() {
    let setup = Setup::installed();
    let leaf_type = setup.load(ModelClass::new(
        TypeDescriptor::new("test.registry", "XValue").expect("descriptor should build"),
        ModelKind::Container,
    ));

    setup
        .registry
        .put_path_to_class(Setup::path(&["root", "pick", "a", "x"]), &leaf_type);

    let found = setup
        .registry
        .class_for_schema_path(&[qn("root"), qn("x")])
        .expect("x should resolve through the instantiated table");
    assert_eq!(found, leaf_type);
}

#[test]
fn key_codecs_resolve_from_list_and_path() {
    let setup = Setup::installed();
    let (list, key) = setup.item();

    let by_list = setup
        .registry
        .identifier_codec_for_identifiable(&list)
        .expect("keyed list should have a key codec");
    let by_path = setup
        .registry
        .key_codec_for_path(&[qn("root"), qn("item")])
        .expect("path should lead to the same key codec");

    assert!(Arc::ptr_eq(&by_list, &by_path));
    assert_eq!(by_list.descriptor(), key.descriptor());

    let root = setup.root();
    let err = setup
        .registry
        .identifier_codec_for_identifiable(&root)
        .expect_err("containers have no key");
    assert!(err.is_misuse());
}
