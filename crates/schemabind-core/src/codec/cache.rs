use crate::model::{ModelType, WeakModelType};
use dashmap::{DashMap, mapref::entry::Entry};
use schemabind_schema::types::TypeDescriptor;
use std::sync::Arc;

///
/// Slot
///

#[derive(Debug)]
struct Slot<V> {
    owner: WeakModelType,
    value: Arc<V>,
}

///
/// WeakCache
///
/// Descriptor-sharded cache whose entries belong to one loaded type.
/// A lookup only hits when the slot's owner is the caller's live type,
/// so a reloaded type never sees the previous type's value.
///

#[derive(Debug)]
pub struct WeakCache<V> {
    map: DashMap<TypeDescriptor, Slot<V>>,
}

impl<V> Default for WeakCache<V> {
    fn default() -> Self {
        Self { map: DashMap::new() }
    }
}

impl<V> WeakCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, ty: &ModelType) -> Option<Arc<V>> {
        let slot = self.map.get(ty.descriptor())?;

        slot.owner.points_to(ty).then(|| Arc::clone(&slot.value))
    }

    /// Value for whichever type currently owns the descriptor, if alive.
    #[must_use]
    pub fn get_live(&self, descriptor: &TypeDescriptor) -> Option<Arc<V>> {
        let slot = self.map.get(descriptor)?;

        slot.owner.is_live().then(|| Arc::clone(&slot.value))
    }

    /// Insert unless a value for this live type exists; returns the value
    /// that ended up cached. Slots owned by another type are replaced.
    pub fn insert_if_absent(&self, ty: &ModelType, value: Arc<V>) -> Arc<V> {
        match self.map.entry(ty.descriptor().clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().owner.points_to(ty) {
                    return Arc::clone(&occupied.get().value);
                }
                occupied.insert(Slot {
                    owner: ty.downgrade(),
                    value: Arc::clone(&value),
                });
                value
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    owner: ty.downgrade(),
                    value: Arc::clone(&value),
                });
                value
            }
        }
    }

    #[must_use]
    pub fn contains(&self, ty: &ModelType) -> bool {
        self.map
            .get(ty.descriptor())
            .is_some_and(|slot| slot.owner.points_to(ty))
    }

    /// Swap the value held for a live owner; returns false when no live
    /// slot exists for the descriptor.
    pub fn replace(&self, descriptor: &TypeDescriptor, value: Arc<V>) -> bool {
        match self.map.get_mut(descriptor) {
            Some(mut slot) if slot.owner.is_live() => {
                slot.value = value;
                true
            }
            _ => false,
        }
    }

    /// Remove slots whose owner died; returns how many were removed.
    pub fn purge(&self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, slot| slot.owner.is_live());

        before.saturating_sub(self.map.len())
    }

    /// Snapshot of the live values.
    #[must_use]
    pub fn values(&self) -> Vec<Arc<V>> {
        self.map
            .iter()
            .filter(|slot| slot.owner.is_live())
            .map(|slot| Arc::clone(&slot.value))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
