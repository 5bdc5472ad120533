//! Ordered, id keyed collections of model entities
use std::ops::Index;

use indexmap::map::Values;
use indexmap::IndexMap;

use crate::metabolic_model::error::ModelError;

/// Something stored in a [`Registry`], identified by a unique string id
pub trait Entity {
    /// Kind of entity, used in error messages
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Insertion ordered collection of entities keyed by their id
///
/// Entries can be looked up by id or by position. Mutation is only available inside the
/// crate so that the owning [`Model`](crate::metabolic_model::model::Model) can keep the
/// optimization problem and back references consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct Registry<T: Entity> {
    entries: IndexMap<String, T>,
}

impl<T: Entity> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T: Entity> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an entity by id, failing with [`ModelError::NotFound`] if it is absent
    pub fn get_by_id(&self, id: &str) -> Result<&T, ModelError> {
        self.entries
            .get(id)
            .ok_or_else(|| ModelError::not_found(T::KIND, id))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Position of an entity in the registry
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.get_index_of(id)
    }

    /// Entity at a position
    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.entries.get_index(index).map(|(_, entity)| entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> Values<'_, String, T> {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|id| id.as_str())
    }

    /// Entities in the half open position range `start..end`, clamped to the registry length
    pub fn slice(&self, start: usize, end: usize) -> Vec<&T> {
        let end = end.min(self.len());
        let start = start.min(end);
        (start..end).filter_map(|idx| self.get_index(idx)).collect()
    }

    /// Entities for which the predicate holds, in registry order
    pub fn query<F: Fn(&T) -> bool>(&self, predicate: F) -> Vec<&T> {
        self.iter().filter(|entity| predicate(entity)).collect()
    }

    // region crate mutation
    /// Insert at the end, returns false (and leaves the registry untouched) on a duplicate id
    pub(crate) fn insert(&mut self, entity: T) -> bool {
        if self.entries.contains_key(entity.id()) {
            return false;
        }
        self.entries.insert(entity.id().to_string(), entity);
        true
    }

    /// Insert at a position, used to restore an entity where it was removed from
    pub(crate) fn shift_insert(&mut self, index: usize, entity: T) -> bool {
        if self.entries.contains_key(entity.id()) {
            return false;
        }
        let index = index.min(self.entries.len());
        self.entries
            .shift_insert(index, entity.id().to_string(), entity);
        true
    }

    /// Remove an entity, returning its former position and the entity
    pub(crate) fn remove(&mut self, id: &str) -> Option<(usize, T)> {
        self.entries
            .shift_remove_full(id)
            .map(|(index, _, entity)| (index, entity))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }
    // endregion crate mutation
}

impl<T: Entity> Index<usize> for Registry<T> {
    type Output = T;

    /// Entity at a position, panics when out of range like slice indexing
    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl<'r, T: Entity> IntoIterator for &'r Registry<T> {
    type Item = &'r T;
    type IntoIter = Values<'r, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
