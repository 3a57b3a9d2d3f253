//! Cache-miss handling: generation, adapter wrapping, case activation and
//! augmentation binding.

use crate::{
    codec::{
        AugmentableCodec, AugmentationCodec, CaseActivation, CaseCodec, ChoiceCodec, CodecKind,
        DataContainerCodec, IdentifierCodec,
    },
    error::{BindingError, ErrorOrigin},
    generator::{
        CodecFactory, CodecGenerator, GenerationError, GenerationInput, PrimitiveCodec, SchemaRef,
    },
    index::SchemaIndex,
    loader::LoadError,
    model::{ModelKind, ModelType},
    obs::MetricsEvent,
    registry::CodecRegistry,
    wire::WireNode,
};
use schemabind_schema::{
    module::AugmentationId,
    node::{Case, Choice, NodeRef, SchemaNode},
    path::SchemaPath,
    qname::QName,
    types::TypeDescriptor,
};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

impl CodecRegistry {
    ///
    /// TYPES
    ///

    /// Live type for a descriptor, loading it through the type loader when
    /// no live type is registered.
    pub fn resolve_type(&self, descriptor: &TypeDescriptor) -> Result<ModelType, BindingError> {
        if let Some(ty) = self.inner.types.resolve(descriptor) {
            return Ok(ty);
        }

        let requested = descriptor.fully_qualified_name();
        let ty = self.inner.loader.load_type(&requested)?;
        if ty.descriptor() != descriptor {
            return Err(LoadError::Mismatch {
                requested,
                found: ty.descriptor().fully_qualified_name(),
            }
            .into());
        }
        self.encounter(&ty);

        Ok(ty)
    }

    /// Type bound to an exact schema path. Copies made by `uses` resolve to
    /// the type of their declaring node.
    pub fn type_for_path(&self, path: &SchemaPath) -> Result<ModelType, BindingError> {
        let index = self.index().ok_or_else(|| {
            BindingError::not_ready(ErrorOrigin::Registry, "no schema generation is installed")
        })?;

        let original = index
            .context()
            .find_data_node(path)
            .and_then(|node| node.def().original.as_ref());
        let descriptor = self.descriptor_for_path(&index, path, original)?;

        self.resolve_type(&descriptor)
    }

    pub(super) fn descriptor_for_path(
        &self,
        index: &SchemaIndex,
        path: &SchemaPath,
        original: Option<&SchemaPath>,
    ) -> Result<TypeDescriptor, BindingError> {
        index
            .path_type(path)
            .or_else(|| original.and_then(|original| index.path_type(original)))
            .cloned()
            .or_else(|| self.inner.types.instantiated(path))
            .ok_or_else(|| {
                BindingError::unresolved(
                    ErrorOrigin::Registry,
                    format!("no type is bound to schema path {path}"),
                )
            })
    }

    ///
    /// CONTAINERS
    ///

    pub(super) fn container_codec(
        &self,
        ty: &ModelType,
    ) -> Result<Arc<DataContainerCodec>, BindingError> {
        if let Some(codec) = self.inner.containers.get(ty) {
            self.record_hit(CodecKind::Container);
            return Ok(codec);
        }
        self.record_miss(CodecKind::Container);

        let index = self.await_binding(ty.descriptor())?;
        let schema = index.schema_for(ty.descriptor());
        let input = GenerationInput {
            model_type: ty,
            context: index.context(),
            schema,
        };
        let codec = self.generate(CodecKind::Container, ty, |generator| {
            generator.codec_for(&input)
        })?;
        let augmentable = self.augmentable_for(ty, Some(index.as_ref()));
        let qname = container_qname(ty, schema)?;

        let candidate = Arc::new(DataContainerCodec::new(ty, qname, codec, augmentable));
        let cached = self.inner.containers.insert_if_absent(ty, Arc::clone(&candidate));
        self.after_insert(CodecKind::Container, ty);

        if Arc::ptr_eq(&cached, &candidate)
            && let SchemaRef::Node(node) = schema
            && let Some(container) = node.as_container()
        {
            self.materialize_choices(container.children(), &index);
        }

        Ok(cached)
    }

    // choices sit inline in their parent, so they are walked with it
    fn materialize_choices(&self, children: &[SchemaNode], index: &SchemaIndex) {
        for child in children {
            let SchemaNode::Choice(choice) = child else {
                continue;
            };

            let materialized = self
                .descriptor_for_path(index, &choice.def.path, choice.def.original.as_ref())
                .and_then(|descriptor| self.resolve_type(&descriptor))
                .and_then(|choice_type| self.choice_codec(&choice_type));
            if let Err(err) = materialized {
                warn!(
                    choice = %choice.def.path,
                    error = %err,
                    "skipping choice pre-materialization"
                );
            }

            for case in &choice.cases {
                self.materialize_choices(&case.children, index);
            }
        }
    }

    ///
    /// IDENTIFIERS
    ///

    /// Key codec for an identifier type.
    pub fn codec_for_identifier(
        &self,
        ty: &ModelType,
    ) -> Result<Arc<IdentifierCodec>, BindingError> {
        if !matches!(ty.kind(), ModelKind::Identifier) {
            return Err(BindingError::misuse(
                ErrorOrigin::Registry,
                format!("{ty} is not an identifier type"),
            ));
        }
        self.encounter(ty);

        if let Some(codec) = self.inner.identifiers.get(ty) {
            self.record_hit(CodecKind::Identifier);
            return Ok(codec);
        }
        self.record_miss(CodecKind::Identifier);

        let index = self.await_binding(ty.descriptor())?;
        let input = GenerationInput {
            model_type: ty,
            context: index.context(),
            schema: index.schema_for(ty.descriptor()),
        };
        let codec = self.generate(CodecKind::Identifier, ty, |generator| {
            generator.key_codec_for(&input)
        })?;

        let cached = self
            .inner
            .identifiers
            .insert_if_absent(ty, Arc::new(IdentifierCodec::new(ty, codec)));
        self.after_insert(CodecKind::Identifier, ty);

        Ok(cached)
    }

    ///
    /// CHOICES AND CASES
    ///

    pub(super) fn choice_codec(&self, ty: &ModelType) -> Result<Arc<ChoiceCodec>, BindingError> {
        if let Some(codec) = self.inner.choices.get(ty) {
            self.record_hit(CodecKind::Choice);
            return Ok(codec);
        }
        self.record_miss(CodecKind::Choice);

        let index = self.await_binding(ty.descriptor())?;
        let schema = index.schema_for(ty.descriptor());
        let input = GenerationInput {
            model_type: ty,
            context: index.context(),
            schema,
        };
        let codec = self.generate(CodecKind::Choice, ty, |generator| {
            generator.choice_codec_for(&input)
        })?;

        let candidate = Arc::new(ChoiceCodec::new(ty, codec));
        let cached = self.inner.choices.insert_if_absent(ty, Arc::clone(&candidate));
        self.after_insert(CodecKind::Choice, ty);

        if Arc::ptr_eq(&cached, &candidate) {
            match schema {
                SchemaRef::Node(node) => match node.as_choice() {
                    Some(choice) => self.register_cases(&cached, choice, &index),
                    None => warn!(choice = %ty, "choice type is bound to a non-choice node"),
                },
                _ => warn!(choice = %ty, "choice type has no schema node; no cases registered"),
            }
        }

        Ok(cached)
    }

    // cases are registered in schema order; `uses` copies share the
    // declaring case's entry
    fn register_cases(&self, codec: &ChoiceCodec, choice: &Choice, index: &SchemaIndex) {
        for case in &choice.cases {
            let Some((descriptor, declaring)) = index.case_binding(case) else {
                warn!(case = %case.def.path, "case has no bound type; skipping");
                continue;
            };

            let entry = self.case_entry(descriptor, Some(declaring));
            codec.add_case(Arc::clone(&entry));

            if self.inner.config.eager_case_activation
                && let Err(err) = self.activate_case(&entry)
            {
                warn!(case = %descriptor, error = %err, "skipping eager case activation");
            }
        }
    }

    /// Case entry for a descriptor, created `Pending` on first sight.
    pub(super) fn case_entry(
        &self,
        descriptor: &TypeDescriptor,
        schema: Option<&Case>,
    ) -> Arc<CaseCodec> {
        let entry = Arc::clone(
            &self
                .inner
                .case_entries
                .entry(descriptor.clone())
                .or_insert_with(|| Arc::new(CaseCodec::pending(descriptor.clone(), schema))),
        );

        if let Some(case) = schema
            && entry.schema().is_none()
            && entry.attach_schema(case)
        {
            debug!(case = %descriptor, "attached schema to captured case");
        }

        entry
    }

    /// Activated case entry for a case type. The entry is also attached to
    /// every live choice the type implements.
    pub fn case_codec(&self, ty: &ModelType) -> Result<Arc<CaseCodec>, BindingError> {
        if !matches!(ty.kind(), ModelKind::Case) {
            return Err(BindingError::misuse(
                ErrorOrigin::Choice,
                format!("{ty} is not a case type"),
            ));
        }
        if let Some(entry) = self.inner.cases.get(ty) {
            self.record_hit(CodecKind::Case);
            // a later generation may have swapped in a pending entry
            self.activate_entry(&entry, ty)?;
            return Ok(entry);
        }
        self.record_miss(CodecKind::Case);

        let entry = self.captured_case(ty)?;
        self.activate_entry(&entry, ty)?;

        let cached = self.inner.cases.insert_if_absent(ty, entry);
        self.after_insert(CodecKind::Case, ty);
        self.attach_to_choices(ty, &cached);

        Ok(cached)
    }

    /// Ready state of an entry, activating it when needed.
    pub fn activate_case(
        &self,
        entry: &Arc<CaseCodec>,
    ) -> Result<Arc<CaseActivation>, BindingError> {
        if let Some(activation) = entry.ready() {
            return Ok(activation);
        }

        let ty = self.resolve_type(entry.descriptor())?;
        let activated = self.case_codec(&ty)?;

        activated.ready().ok_or_else(|| {
            BindingError::invariant(
                ErrorOrigin::Choice,
                format!("case {} is not ready after activation", entry.descriptor()),
            )
        })
    }

    /// Case of `choice` whose children are present in `parent`.
    pub fn resolve_case(
        &self,
        choice: &ModelType,
        parent: &WireNode,
    ) -> Result<Arc<CaseCodec>, BindingError> {
        if !matches!(choice.kind(), ModelKind::Choice) {
            return Err(BindingError::misuse(
                ErrorOrigin::Choice,
                format!("{choice} is not a choice type"),
            ));
        }
        self.encounter(choice);
        let codec = self.choice_codec(choice)?;

        if let Some(case) = codec.select_case(parent) {
            self.record(MetricsEvent::CaseDispatched);
            trace!(
                choice = %choice,
                case = %case.descriptor(),
                node = %parent.qname(),
                "dispatched case"
            );
            return Ok(case);
        }

        self.record(MetricsEvent::AmbiguousDispatch);
        Err(BindingError::ambiguous(format!(
            "no case of {choice} accepts the children of '{}'",
            parent.qname()
        )))
    }

    fn captured_case(&self, ty: &ModelType) -> Result<Arc<CaseCodec>, BindingError> {
        let descriptor = ty.descriptor();
        if let Some(entry) = self.inner.case_entries.get(descriptor) {
            return Ok(Arc::clone(&entry));
        }

        let index = self.await_binding(descriptor)?;
        let schema = match index.schema_for(descriptor) {
            SchemaRef::Node(NodeRef::Case(case)) => Some(case),
            _ => None,
        };
        if schema.is_none() {
            warn!(case = %descriptor, "no schema node for case; registering it without schema");
        }

        Ok(self.case_entry(descriptor, schema))
    }

    fn activate_entry(
        &self,
        entry: &CaseCodec,
        ty: &ModelType,
    ) -> Result<Arc<CaseActivation>, BindingError> {
        if let Some(activation) = entry.ready()
            && activation.is_for(ty)
        {
            return Ok(activation);
        }

        let Some(case) = entry.schema() else {
            return Err(BindingError::unresolved(
                ErrorOrigin::Choice,
                format!("case {ty} has no schema node"),
            ));
        };
        let index = self.await_binding(ty.descriptor())?;
        let input = GenerationInput {
            model_type: ty,
            context: index.context(),
            schema: SchemaRef::Node(NodeRef::Case(case)),
        };
        let codec = self.generate(CodecKind::Case, ty, |generator| {
            generator.case_codec_for(&input, case)
        })?;

        let activation = entry.activate(ty, codec);
        self.record(MetricsEvent::CaseActivated);
        debug!(case = %ty, "activated case codec");

        Ok(activation)
    }

    fn attach_to_choices(&self, ty: &ModelType, entry: &Arc<CaseCodec>) {
        for supertype in &ty.supertypes {
            if let Some(choice) = self.inner.choices.get_live(supertype)
                && choice.add_case(Arc::clone(entry))
            {
                debug!(case = %ty, choice = %supertype, "attached case to materialized choice");
            }
        }
    }

    ///
    /// AUGMENTATIONS
    ///

    /// Augmentation codec, bound to the augmentable codec of its target.
    /// A missing or non-augmentable target leaves the codec orphaned: it
    /// is returned but never spliced into a composite.
    pub fn codec_for_augmentation(
        &self,
        ty: &ModelType,
    ) -> Result<Arc<AugmentationCodec>, BindingError> {
        let ModelKind::Augmentation { target } = ty.kind() else {
            return Err(BindingError::misuse(
                ErrorOrigin::Augmentation,
                format!("{ty} is not an augmentation type"),
            ));
        };
        self.encounter(ty);

        let (codec, fresh) = match self.inner.augmentations.get(ty) {
            Some(codec) => {
                self.record_hit(CodecKind::Augmentation);
                (codec, false)
            }
            None => {
                self.record_miss(CodecKind::Augmentation);
                (self.generate_augmentation(ty)?, true)
            }
        };
        self.bind_augmentation(&codec, target.as_ref(), fresh);

        Ok(codec)
    }

    /// Augmentable codec of `ty`, or `None` for types that do not accept
    /// augmentations.
    pub fn augmentable_codec(
        &self,
        ty: &ModelType,
    ) -> Result<Option<Arc<AugmentableCodec>>, BindingError> {
        if !ty.augmentable {
            return Ok(None);
        }
        let index = self.index();

        Ok(self.augmentable_for(ty, index.as_deref()))
    }

    fn generate_augmentation(
        &self,
        ty: &ModelType,
    ) -> Result<Arc<AugmentationCodec>, BindingError> {
        let index = self.await_binding(ty.descriptor())?;
        let input = GenerationInput {
            model_type: ty,
            context: index.context(),
            schema: index.schema_for(ty.descriptor()),
        };
        let codec = self.generate(CodecKind::Augmentation, ty, |generator| {
            generator.augmentation_codec_for(&input)
        })?;

        let cached = self
            .inner
            .augmentations
            .insert_if_absent(ty, Arc::new(AugmentationCodec::new(ty, ty.qname.clone(), codec)));
        self.after_insert(CodecKind::Augmentation, ty);

        Ok(cached)
    }

    fn bind_augmentation(
        &self,
        codec: &Arc<AugmentationCodec>,
        target: Option<&TypeDescriptor>,
        fresh: bool,
    ) {
        let orphaned = |reason: &str| {
            if fresh {
                warn!(augmentation = %codec.descriptor(), reason, "orphaned augmentation");
                self.record(MetricsEvent::OrphanedAugmentation);
            }
        };

        let Some(target) = target else {
            orphaned("no target declared");
            return;
        };
        let target_type = match self.resolve_type(target) {
            Ok(target_type) => target_type,
            Err(err) => {
                orphaned(&err.to_string());
                return;
            }
        };

        let index = self.index();
        match self.augmentable_for(&target_type, index.as_deref()) {
            Some(augmentable) => {
                if augmentable.register(Arc::clone(codec)) {
                    debug!(
                        augmentation = %codec.descriptor(),
                        target = %target,
                        "bound augmentation"
                    );
                }
            }
            None => orphaned("target does not accept augmentations"),
        }
    }

    // inserted before preloading, so nested lookups reuse the entry
    pub(super) fn augmentable_for(
        &self,
        ty: &ModelType,
        index: Option<&SchemaIndex>,
    ) -> Option<Arc<AugmentableCodec>> {
        if !ty.augmentable {
            return None;
        }
        if let Some(codec) = self.inner.augmentables.get(ty) {
            self.record_hit(CodecKind::Augmentable);
            return Some(codec);
        }
        self.record_miss(CodecKind::Augmentable);

        let candidate = Arc::new(AugmentableCodec::new(ty.descriptor().clone()));
        let cached = self.inner.augmentables.insert_if_absent(ty, Arc::clone(&candidate));
        self.after_insert(CodecKind::Augmentable, ty);

        if Arc::ptr_eq(&cached, &candidate)
            && self.inner.config.preload_augmentations
            && let Some(index) = index
        {
            self.preload_augmentations(ty, index);
        }

        Some(cached)
    }

    // declared augmentations of the node and everything beneath it
    fn preload_augmentations(&self, ty: &ModelType, index: &SchemaIndex) {
        let SchemaRef::Node(node) = index.schema_for(ty.descriptor()) else {
            return;
        };
        let mut ids = node.augmentations().to_vec();
        if let Some(container) = node.as_container() {
            collect_augmentation_ids(container.children(), &mut ids);
        }

        for id in ids {
            let Some(descriptor) = index.augmentation_type(&id) else {
                continue;
            };
            let loaded = self
                .resolve_type(descriptor)
                .and_then(|augmentation| self.codec_for_augmentation(&augmentation));
            if let Err(err) = loaded {
                warn!(
                    target_type = %ty,
                    augmentation = %descriptor,
                    error = %err,
                    "skipping augmentation preload"
                );
            }
        }
    }

    ///
    /// GENERATION
    ///

    // factory, instantiation and the registration callback; failures are
    // counted and logged here
    fn generate(
        &self,
        kind: CodecKind,
        ty: &ModelType,
        request: impl FnOnce(&dyn CodecGenerator) -> Result<Box<dyn CodecFactory>, GenerationError>,
    ) -> Result<Arc<dyn PrimitiveCodec>, BindingError> {
        let mixins = self.mixins();
        let generated = request(self.inner.generator.as_ref())
            .and_then(|factory| factory.instantiate())
            .and_then(|mut codec| {
                codec.prepare(&mixins)?;
                Ok(codec)
            });

        match generated {
            Ok(codec) => {
                self.record(MetricsEvent::CodecGenerated { kind });
                debug!(kind = %kind, ty = %ty, "generated codec");
                Ok(Arc::from(codec))
            }
            Err(err) => {
                self.record(MetricsEvent::GenerationFailed { kind });
                error!(kind = %kind, ty = %ty, error = %err, "codec generation failed");
                Err(err.into())
            }
        }
    }

    fn record_hit(&self, kind: CodecKind) {
        self.record(MetricsEvent::CacheHit { kind });
    }

    fn record_miss(&self, kind: CodecKind) {
        self.record(MetricsEvent::CacheMiss { kind });
    }
}

fn collect_augmentation_ids(children: &[SchemaNode], out: &mut Vec<AugmentationId>) {
    for child in children {
        match child {
            // choice augmentations only add cases, which dispatch through the choice
            SchemaNode::Choice(choice) => {
                for case in &choice.cases {
                    out.extend_from_slice(&case.augmentations);
                    collect_augmentation_ids(&case.children, out);
                }
            }
            SchemaNode::Container(container) => {
                out.extend_from_slice(&container.augmentations);
                collect_augmentation_ids(&container.children, out);
            }
            SchemaNode::List(list) => {
                out.extend_from_slice(&list.augmentations);
                collect_augmentation_ids(&list.children, out);
            }
            SchemaNode::Leaf(_) | SchemaNode::LeafList(_) => {}
        }
    }
}

// composite name: the type's declared name, else its node's
fn container_qname(ty: &ModelType, schema: SchemaRef<'_>) -> Result<QName, BindingError> {
    if let Some(qname) = &ty.qname {
        return Ok(qname.clone());
    }

    match schema {
        SchemaRef::Node(node) => Ok(node.def().qname.clone()),
        _ => Err(BindingError::unresolved(
            ErrorOrigin::Registry,
            format!("{ty} declares no name and is not bound to a schema node"),
        )),
    }
}
