use crate::{
    generator::PrimitiveCodec,
    model::{ModelType, WeakModelType},
    wire::WireNode,
};
use parking_lot::RwLock;
use schemabind_schema::{
    node::{Case, SchemaNode},
    qname::QName,
    types::TypeDescriptor,
};
use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, OnceLock},
};

///
/// ChoiceCodec
///
/// Choice entry: the generated choice codec plus the cases registered
/// against it, in registration order.
///

pub struct ChoiceCodec {
    descriptor: TypeDescriptor,
    ty: WeakModelType,
    codec: Arc<dyn PrimitiveCodec>,
    cases: RwLock<Vec<Arc<CaseCodec>>>,
}

impl ChoiceCodec {
    #[must_use]
    pub fn new(ty: &ModelType, codec: Arc<dyn PrimitiveCodec>) -> Self {
        Self {
            descriptor: ty.descriptor().clone(),
            ty: ty.downgrade(),
            codec,
            cases: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn model_type(&self) -> Option<ModelType> {
        self.ty.upgrade()
    }

    #[must_use]
    pub fn primitive(&self) -> &Arc<dyn PrimitiveCodec> {
        &self.codec
    }

    /// Register a case; returns false when its descriptor is already present.
    pub fn add_case(&self, case: Arc<CaseCodec>) -> bool {
        let mut cases = self.cases.write();
        if cases.iter().any(|known| known.descriptor() == case.descriptor()) {
            return false;
        }
        cases.push(case);

        true
    }

    /// Register a case, replacing a different entry for the same
    /// descriptor. Returns false when this exact entry is already present.
    pub fn put_case(&self, case: Arc<CaseCodec>) -> bool {
        let mut cases = self.cases.write();
        match cases.iter_mut().find(|known| known.descriptor() == case.descriptor()) {
            Some(known) if Arc::ptr_eq(known, &case) => false,
            Some(known) => {
                *known = case;
                true
            }
            None => {
                cases.push(case);
                true
            }
        }
    }

    #[must_use]
    pub fn cases(&self) -> Vec<Arc<CaseCodec>> {
        self.cases.read().clone()
    }

    /// First registered case accepting the children of `parent`.
    #[must_use]
    pub fn select_case(&self, parent: &WireNode) -> Option<Arc<CaseCodec>> {
        self.cases
            .read()
            .iter()
            .find(|case| case.accepts(parent))
            .cloned()
    }
}

impl fmt::Debug for ChoiceCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoiceCodec")
            .field("descriptor", &self.descriptor)
            .field("cases", &self.cases.read().len())
            .finish_non_exhaustive()
    }
}

///
/// CaseCodec
///
/// Case entry. Created `Pending` from schema metadata alone; the
/// primitive codec is attached the first time the case is needed.
///

pub struct CaseCodec {
    descriptor: TypeDescriptor,
    schema: OnceLock<CaseSchema>,
    state: RwLock<CodecState>,
}

#[derive(Debug)]
struct CaseSchema {
    case: Case,
    matcher: CaseMatcher,
}

impl CaseCodec {
    #[must_use]
    pub fn pending(descriptor: TypeDescriptor, schema: Option<&Case>) -> Self {
        let codec = Self {
            descriptor,
            schema: OnceLock::new(),
            state: RwLock::new(CodecState::Pending),
        };
        if let Some(case) = schema {
            codec.attach_schema(case);
        }

        codec
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Attach schema metadata to an entry captured without it. Returns
    /// false when the entry already had a schema.
    pub fn attach_schema(&self, case: &Case) -> bool {
        self.schema
            .set(CaseSchema {
                case: case.clone(),
                matcher: CaseMatcher::new(case),
            })
            .is_ok()
    }

    #[must_use]
    pub fn schema(&self) -> Option<&Case> {
        self.schema.get().map(|schema| &schema.case)
    }

    #[must_use]
    pub fn matcher(&self) -> Option<&CaseMatcher> {
        self.schema.get().map(|schema| &schema.matcher)
    }

    /// Whether the children of `parent` signal this case.
    #[must_use]
    pub fn accepts(&self, parent: &WireNode) -> bool {
        self.matcher().is_some_and(|matcher| matcher.matches(parent))
    }

    #[must_use]
    pub fn state(&self) -> CodecState {
        self.state.read().clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), CodecState::Ready(_))
    }

    /// Activation usable for live types, if any.
    #[must_use]
    pub fn ready(&self) -> Option<Arc<CaseActivation>> {
        match &*self.state.read() {
            CodecState::Ready(activation) if activation.ty.is_live() => {
                Some(Arc::clone(activation))
            }
            _ => None,
        }
    }

    /// Move to `Ready`. A live activation for the same type wins over a
    /// concurrent one; an activation whose type died is replaced.
    pub fn activate(&self, ty: &ModelType, codec: Arc<dyn PrimitiveCodec>) -> Arc<CaseActivation> {
        let mut state = self.state.write();
        if let CodecState::Ready(current) = &*state
            && current.ty.points_to(ty)
        {
            return Arc::clone(current);
        }

        let activation = Arc::new(CaseActivation {
            ty: ty.downgrade(),
            codec,
        });
        *state = CodecState::Ready(Arc::clone(&activation));

        activation
    }
}

impl fmt::Debug for CaseCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseCodec")
            .field("descriptor", &self.descriptor)
            .field("has_schema", &self.schema.get().is_some())
            .field("ready", &self.is_ready())
            .finish()
    }
}

///
/// CodecState
///

#[derive(Clone, Debug)]
pub enum CodecState {
    Pending,
    Ready(Arc<CaseActivation>),
}

///
/// CaseActivation
///

pub struct CaseActivation {
    ty: WeakModelType,
    codec: Arc<dyn PrimitiveCodec>,
}

impl CaseActivation {
    #[must_use]
    pub fn model_type(&self) -> Option<ModelType> {
        self.ty.upgrade()
    }

    /// True when this activation was made for `ty`.
    #[must_use]
    pub fn is_for(&self, ty: &ModelType) -> bool {
        self.ty.points_to(ty)
    }

    #[must_use]
    pub fn codec(&self) -> &dyn PrimitiveCodec {
        self.codec.as_ref()
    }
}

impl fmt::Debug for CaseActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseActivation")
            .field("live", &self.ty.is_live())
            .finish_non_exhaustive()
    }
}

///
/// CaseMatcher
///
/// Structural test deciding whether a parent composite carries a case.
/// Nested choices contribute the names of all their cases' children.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CaseMatcher {
    /// Child must share the parent's module and use one of these local names.
    Local(BTreeSet<String>),

    /// Child must carry one of these exact names.
    Qualified(BTreeSet<QName>),
}

impl CaseMatcher {
    #[must_use]
    pub fn new(case: &Case) -> Self {
        let mut qnames = BTreeSet::new();
        collect_wire_names(&case.children, &mut qnames);

        if case.def.augmenting && !case.def.added_by_uses {
            Self::Qualified(qnames)
        } else {
            Self::Local(qnames.iter().map(|qname| qname.local_name().to_string()).collect())
        }
    }

    #[must_use]
    pub fn matches(&self, parent: &WireNode) -> bool {
        let owner = parent.qname();

        match self {
            Self::Local(names) => parent
                .child_qnames()
                .any(|child| child.same_module(owner) && names.contains(child.local_name())),
            Self::Qualified(qnames) => parent.child_qnames().any(|child| qnames.contains(child)),
        }
    }
}

fn collect_wire_names(children: &[SchemaNode], out: &mut BTreeSet<QName>) {
    for child in children {
        match child {
            SchemaNode::Choice(choice) => {
                for case in &choice.cases {
                    collect_wire_names(&case.children, out);
                }
            }
            other => {
                out.insert(other.qname().clone());
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
