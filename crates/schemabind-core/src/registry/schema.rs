//! Schema generations: installation, waiting for metadata and path lookup.

use crate::{
    codec::{CaseCodec, CaseMatcher, IdentifierCodec},
    error::{BindingError, ErrorOrigin},
    generator::SchemaRef,
    index::SchemaIndex,
    lifecycle::{GenerationGuard, WaitOutcome},
    model::ModelType,
    obs::MetricsEvent,
    registry::CodecRegistry,
};
use dashmap::mapref::entry::Entry;
use schemabind_schema::{
    bindings::SchemaGeneration, node::Case, qname::QName, types::TypeDescriptor,
};
use std::{fmt, sync::Arc};
use tracing::debug;

impl CodecRegistry {
    /// Announce a schema generation in progress. Requests for metadata
    /// that is not installed yet block until the guard drops.
    #[must_use]
    pub fn begin_generation(&self) -> GenerationGuard {
        self.inner.lock.begin_generation()
    }

    /// Build and publish the index of a new generation. Case entries are
    /// registered before publication, so readers of the new index always
    /// find them; live choices and cached case entries follow right after,
    /// before waiters are released. Lookups that do not wait may dispatch
    /// through the previous case list until then.
    pub fn on_schema_generated(&self, generation: &SchemaGeneration) {
        let number = self.index().map_or(1, |index| index.generation() + 1);
        let index = Arc::new(SchemaIndex::build(number, generation));

        let cases = index.declared_cases();
        let replaced: Vec<_> = cases
            .iter()
            .filter_map(|(descriptor, case)| self.preregister_case(descriptor, case))
            .collect();

        self.inner.index.store(Some(Arc::clone(&index)));

        for entry in &replaced {
            if self.inner.cases.replace(entry.descriptor(), Arc::clone(entry)) {
                debug!(case = %entry.descriptor(), "replaced cached case entry");
            }
        }
        let attached = self.refresh_choices(&index);

        self.inner.lock.notify_installed();
        self.record(MetricsEvent::SchemaInstalled);
        debug!(
            generation = number,
            cases = cases.len(),
            attached,
            "installed schema generation"
        );
    }

    /// Model type for a data path (choice and case names may be omitted).
    pub fn class_for_schema_path(&self, names: &[QName]) -> Result<ModelType, BindingError> {
        let display = PathDisplay(names);
        let found = self.await_schema(&display, || {
            let index = self.index()?;
            let found = index.context().find_node(names).is_ok();
            found.then_some(index)
        })?;

        // nothing pending: report why the path does not resolve
        let index = match found {
            Some(index) => index,
            None => self.index().ok_or_else(|| {
                BindingError::not_ready(ErrorOrigin::Registry, "no schema generation is installed")
            })?,
        };

        let node = index.context().find_node(names)?;
        let descriptor =
            self.descriptor_for_path(&index, node.path(), node.def().original.as_ref())?;

        self.resolve_type(&descriptor)
    }

    /// Key codec of the keyed list at a data path.
    pub fn key_codec_for_path(
        &self,
        names: &[QName],
    ) -> Result<Arc<IdentifierCodec>, BindingError> {
        let list = self.class_for_schema_path(names)?;

        self.identifier_codec_for_identifiable(&list)
    }

    /// Installed index binding `descriptor`, waiting for a pending
    /// generation to publish it. When nothing is pending the current
    /// index is returned as is.
    pub(super) fn await_binding(
        &self,
        descriptor: &TypeDescriptor,
    ) -> Result<Arc<SchemaIndex>, BindingError> {
        let found = self.await_schema(descriptor, || {
            self.index().filter(|index| index.binds(descriptor))
        })?;

        found.or_else(|| self.index()).ok_or_else(|| {
            BindingError::not_ready(
                ErrorOrigin::Registry,
                format!("no schema generation is installed for {descriptor}"),
            )
        })
    }

    // Ready maps to Some, Idle to None, TimedOut to a not-ready error
    fn await_schema<T>(
        &self,
        subject: &dyn fmt::Display,
        probe: impl FnMut() -> Option<T>,
    ) -> Result<Option<T>, BindingError> {
        let timeout = self.inner.config.schema_wait_timeout();

        match self.inner.lock.wait_until(timeout, probe) {
            WaitOutcome::Ready(found) => Ok(Some(found)),
            WaitOutcome::Idle => Ok(None),
            WaitOutcome::TimedOut => Err(BindingError::not_ready(
                ErrorOrigin::Registry,
                format!(
                    "schema for {subject} was not installed within {}ms",
                    timeout.map_or(0, |timeout| timeout.as_millis())
                ),
            )),
        }
    }

    // keeps entries whose dispatch rule is unchanged, so choices built
    // against an earlier generation keep sharing them; returns the new
    // entry when one was replaced
    fn preregister_case(&self, descriptor: &TypeDescriptor, case: &Case) -> Option<Arc<CaseCodec>> {
        match self.inner.case_entries.entry(descriptor.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.schema().is_none() {
                    current.attach_schema(case);
                    None
                } else if current.matcher() == Some(&CaseMatcher::new(case)) {
                    None
                } else {
                    let entry = Arc::new(CaseCodec::pending(descriptor.clone(), Some(case)));
                    occupied.insert(Arc::clone(&entry));
                    Some(entry)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(CaseCodec::pending(descriptor.clone(), Some(case))));
                None
            }
        }
    }

    // live choices pick up cases the generation added and swap entries
    // replaced above; returns how many cases were attached or swapped
    fn refresh_choices(&self, index: &SchemaIndex) -> usize {
        let mut attached = 0;
        for choice in self.inner.choices.values() {
            let SchemaRef::Node(node) = index.schema_for(choice.descriptor()) else {
                continue;
            };
            let Some(schema) = node.as_choice() else {
                continue;
            };

            for case in &schema.cases {
                let Some((descriptor, declaring)) = index.case_binding(case) else {
                    continue;
                };
                if choice.put_case(self.case_entry(descriptor, Some(declaring))) {
                    debug!(
                        choice = %choice.descriptor(),
                        case = %descriptor,
                        "refreshed choice case"
                    );
                    attached += 1;
                }
            }
        }

        attached
    }
}

///
/// PathDisplay
///

struct PathDisplay<'a>(&'a [QName]);

impl fmt::Display for PathDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for qname in self.0 {
            write!(f, "/{qname}")?;
        }

        Ok(())
    }
}
