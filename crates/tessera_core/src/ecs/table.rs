//! # Packed Component Table
//!
//! Dense, contiguous component storage keyed by entity.
//!
//! The table keeps three structures aligned:
//! - `entities[i]`: the entity owning row `i`
//! - `components[i]`: that entity's component
//! - the sparse index: `sparse[entities[i]] == i`
//!
//! Insertion appends, removal swaps the last row into the hole, so every
//! operation is O(1) but a row's slot changes when another row is removed.

use std::cmp::Ordering;
use std::ops::{Index, IndexMut};

use bytemuck::Pod;
use tracing::debug;

use super::component::{absent_entity, ComponentTable};
use super::entity::{Entity, EntityIndex, EntityRange, NULL_ENTITY};
use super::sparse::{to_entity_index, SparseIndex};
use super::traverse::{drive, TraverseCallback};
use crate::config::TableConfig;
use crate::error::StorageResult;

/// Dense storage for one component type with unstable slots.
///
/// # Example
///
/// ```rust
/// use tessera_core::PackedComponentTable;
///
/// let mut table = PackedComponentTable::new();
/// table.add(1, "one");
/// table.add(2, "two");
/// table.remove(1);
///
/// assert_eq!(table.count(), 1);
/// assert_eq!(table.get(2), Some(&"two"));
/// assert_eq!(table.unstable_index(2), Some(0)); // moved into the hole
/// ```
#[derive(Clone, Debug)]
pub struct PackedComponentTable<T> {
    /// Entity -> dense slot.
    sparse: SparseIndex,
    /// Owner of each dense slot.
    entities: Vec<Entity>,
    /// Component of each dense slot.
    components: Vec<T>,
}

impl<T> Default for PackedComponentTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PackedComponentTable<T> {
    /// Creates an empty table with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sparse: SparseIndex::new(),
            entities: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Creates an empty table from a configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Sparse page size and row reserve; `component_page_size` is unused here
    ///
    /// # Returns
    ///
    /// An empty table with `config.reserve` rows preallocated.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn with_config(config: &TableConfig) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self {
            sparse: SparseIndex::with_page_size(config.entity_page_size)?,
            entities: Vec::with_capacity(config.reserve),
            components: Vec::with_capacity(config.reserve),
        })
    }

    /// Number of live rows.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the table has no row.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks if `entity` has a row in this table.
    #[inline]
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.find_index(entity).is_some()
    }

    /// Owners of each dense slot, in slot order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Components in slot order.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[T] {
        &self.components
    }

    /// Mutable components in slot order.
    #[inline]
    pub fn components_mut(&mut self) -> &mut [T] {
        &mut self.components
    }

    /// Inserts a row for `entity`.
    ///
    /// The returned reference is invalidated by the next structural change.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `entity` is already present or is [`NULL_ENTITY`].
    pub fn add(&mut self, entity: Entity, component: T) -> &mut T {
        debug_assert!(entity != NULL_ENTITY, "cannot attach a component to the null entity");
        debug_assert!(!self.exists(entity), "entity {entity} already has a component");

        let slot = self.entities.len();
        self.sparse.add(entity, to_entity_index(slot));
        self.entities.push(entity);
        self.components.push(component);
        &mut self.components[slot]
    }

    /// Overwrites the component of `entity` if present, inserts it otherwise.
    pub fn try_add(&mut self, entity: Entity, component: T) -> &mut T {
        match self.find_index(entity) {
            Some(slot) => {
                let current = &mut self.components[slot];
                *current = component;
                current
            }
            None => self.add(entity, component),
        }
    }

    /// Runs `update` on the component of `entity`, inserting a default one first
    /// if the entity has none.
    pub fn try_add_with<F>(&mut self, entity: Entity, update: F) -> &mut T
    where
        T: Default,
        F: FnOnce(&mut T),
    {
        let component = match self.find_index(entity) {
            Some(slot) => &mut self.components[slot],
            None => self.add(entity, T::default()),
        };
        update(&mut *component);
        component
    }

    /// Inserts a clone of `component` for every entity of `range`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if any entity of `range` is already present.
    pub fn add_range(&mut self, range: EntityRange, component: &T)
    where
        T: Clone,
    {
        self.add_range_with(range, |_| component.clone());
    }

    /// Inserts `make(entity)` for every entity of `range`.
    ///
    /// The collision check scans every existing row and only runs in debug builds.
    ///
    /// # Arguments
    ///
    /// * `range` - Entities to attach, appended in ascending order
    /// * `make` - Builds the component of each entity
    ///
    /// If `make` panics, the rows added before it stay and the table remains
    /// consistent.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if any entity of `range` is already present.
    pub fn add_range_with<F>(&mut self, range: EntityRange, mut make: F)
    where
        F: FnMut(Entity) -> T,
    {
        debug_assert!(
            !self.entities.iter().any(|&entity| range.contains(entity)),
            "range {range:?} collides with existing rows"
        );

        let size = range.size() as usize;
        self.entities.reserve(size);
        self.components.reserve(size);
        for entity in range {
            // Built before any bookkeeping so a panicking `make` leaves no partial row
            let component = make(entity);
            self.sparse.add(entity, to_entity_index(self.entities.len()));
            self.entities.push(entity);
            self.components.push(component);
        }
        debug!(begin = range.begin, end = range.end, count = self.count(), "packed table range added");
    }

    /// Removes the row of `entity`, moving the last row into its slot.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `entity` is absent.
    pub fn remove(&mut self, entity: Entity) {
        let slot = self.find_index(entity);
        debug_assert!(slot.is_some(), "entity {entity} is not attached to this table");
        if let Some(slot) = slot {
            drop(self.remove_at(entity, slot));
        }
    }

    /// Removes the row of `entity` if present.
    ///
    /// Returns `true` if a row was removed.
    pub fn try_remove(&mut self, entity: Entity) -> bool {
        match self.find_index(entity) {
            Some(slot) => {
                drop(self.remove_at(entity, slot));
                true
            }
            None => false,
        }
    }

    /// Removes every row whose entity lies in `range`.
    ///
    /// Holes are filled from the tail: while holes remain, a tail row that is
    /// itself removed is dropped, otherwise the last surviving row moves into
    /// the smallest remaining hole. O(n + k) for k removed rows.
    pub fn remove_range(&mut self, range: EntityRange) {
        // Ascending by construction, walked from both ends below
        let holes: Vec<usize> = self
            .entities
            .iter()
            .enumerate()
            .filter(|&(_, &entity)| range.contains(entity))
            .map(|(slot, _)| slot)
            .collect();
        if holes.is_empty() {
            return;
        }

        let (mut smallest, mut largest) = (0, holes.len());
        while smallest < largest {
            let last = self.entities.len() - 1;
            let hole = if holes[largest - 1] == last {
                largest -= 1;
                last
            } else {
                smallest += 1;
                holes[smallest - 1]
            };
            let removed = self.entities[hole];
            drop(self.remove_at(removed, hole));
        }
        debug!(
            begin = range.begin,
            end = range.end,
            removed = holes.len(),
            count = self.count(),
            "packed table range removed"
        );
    }

    /// Removes the row of `entity` and returns its component.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is absent.
    #[must_use]
    pub fn extract(&mut self, entity: Entity) -> T {
        match self.find_index(entity) {
            Some(slot) => self.remove_at(entity, slot),
            None => absent_entity(entity),
        }
    }

    /// Component of `entity`, if present.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.find_index(entity).map(|slot| &self.components[slot])
    }

    /// Mutable component of `entity`, if present.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.find_index(entity).map(|slot| &mut self.components[slot])
    }

    /// Current dense slot of `entity`, if present.
    ///
    /// Invalidated by any removal or sort.
    #[inline]
    #[must_use]
    pub fn unstable_index(&self, entity: Entity) -> Option<EntityIndex> {
        self.find_index(entity).map(to_entity_index)
    }

    /// Component at dense slot `slot`.
    #[inline]
    #[must_use]
    pub fn at_index(&self, slot: EntityIndex) -> Option<&T> {
        self.components.get(slot as usize)
    }

    /// Mutable component at dense slot `slot`.
    #[inline]
    pub fn at_index_mut(&mut self, slot: EntityIndex) -> Option<&mut T> {
        self.components.get_mut(slot as usize)
    }

    /// Iterates over `(entity, component)` rows in slot order.
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Entity, &T)> + ExactSizeIterator {
        self.entities.iter().copied().zip(self.components.iter())
    }

    /// Iterates mutably over `(entity, component)` rows in slot order.
    #[inline]
    pub fn iter_mut(
        &mut self,
    ) -> impl DoubleEndedIterator<Item = (Entity, &mut T)> + ExactSizeIterator {
        self.entities.iter().copied().zip(self.components.iter_mut())
    }

    /// Sorts rows by comparing components.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.sort_rows(|_, lhs, _, rhs| compare(lhs, rhs));
    }

    /// Sorts rows by comparing entities.
    pub fn sort_by_entity<F>(&mut self, mut compare: F)
    where
        F: FnMut(Entity, Entity) -> Ordering,
    {
        self.sort_rows(|lhs, _, rhs, _| compare(lhs, rhs));
    }

    /// Sorts the entity list, then permutes components along the sparse
    /// index's permutation cycles so no second component buffer is needed.
    fn sort_rows<F>(&mut self, mut compare: F)
    where
        F: FnMut(Entity, &T, Entity, &T) -> Ordering,
    {
        let Self {
            sparse,
            entities,
            components,
        } = self;

        entities.sort_unstable_by(|&lhs, &rhs| {
            let lhs_component = &components[sparse.at(lhs) as usize];
            let rhs_component = &components[sparse.at(rhs) as usize];
            compare(lhs, lhs_component, rhs, rhs_component)
        });
        sparse.realign(entities, |a, b| components.swap(a, b));
        debug!(count = entities.len(), "packed table sorted");
    }

    /// Visits rows in slot order. See [`crate::ecs::traverse`] for callback shapes.
    #[inline]
    pub fn traverse<M, C>(&mut self, mut callback: C)
    where
        C: TraverseCallback<T, M>,
    {
        drive(self.iter_mut(), &mut callback);
    }

    /// Drops every row, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.components.clear();
        self.sparse.clear();
    }

    /// Drops every row and frees all backing memory.
    pub fn release(&mut self) {
        self.entities = Vec::new();
        self.components = Vec::new();
        self.sparse.release();
        debug!("packed table released");
    }

    /// Dense slot of `entity`, validated against the entity list.
    #[inline]
    fn find_index(&self, entity: Entity) -> Option<usize> {
        let slot = self.sparse.get(entity)? as usize;
        (self.entities.get(slot) == Some(&entity)).then_some(slot)
    }

    /// Swap-removes the row at `slot`, which must belong to `entity`.
    fn remove_at(&mut self, entity: Entity, slot: usize) -> T {
        self.sparse.remove(entity);
        self.entities.swap_remove(slot);
        let component = self.components.swap_remove(slot);
        if let Some(&moved) = self.entities.get(slot) {
            self.sparse.add(moved, to_entity_index(slot));
        }
        component
    }
}

impl<T: Pod> PackedComponentTable<T> {
    /// Raw bytes of the dense component storage, e.g. for buffer uploads.
    #[inline]
    #[must_use]
    pub fn component_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.components)
    }
}

impl<T> Index<Entity> for PackedComponentTable<T> {
    type Output = T;

    #[inline]
    fn index(&self, entity: Entity) -> &T {
        self.get(entity).unwrap_or_else(|| absent_entity(entity))
    }
}

impl<T> IndexMut<Entity> for PackedComponentTable<T> {
    #[inline]
    fn index_mut(&mut self, entity: Entity) -> &mut T {
        match self.find_index(entity) {
            Some(slot) => &mut self.components[slot],
            None => absent_entity(entity),
        }
    }
}

impl<T> ComponentTable<T> for PackedComponentTable<T> {
    const IS_STABLE: bool = false;

    fn count(&self) -> usize {
        Self::count(self)
    }

    fn exists(&self, entity: Entity) -> bool {
        Self::exists(self, entity)
    }

    fn add(&mut self, entity: Entity, component: T) -> &mut T {
        Self::add(self, entity, component)
    }

    fn try_add(&mut self, entity: Entity, component: T) -> &mut T {
        Self::try_add(self, entity, component)
    }

    fn try_add_with<F>(&mut self, entity: Entity, update: F) -> &mut T
    where
        T: Default,
        F: FnOnce(&mut T),
    {
        Self::try_add_with(self, entity, update)
    }

    fn add_range_with<F>(&mut self, range: EntityRange, make: F)
    where
        F: FnMut(Entity) -> T,
    {
        Self::add_range_with(self, range, make);
    }

    fn remove(&mut self, entity: Entity) {
        Self::remove(self, entity);
    }

    fn try_remove(&mut self, entity: Entity) -> bool {
        Self::try_remove(self, entity)
    }

    fn remove_range(&mut self, range: EntityRange) {
        Self::remove_range(self, range);
    }

    fn extract(&mut self, entity: Entity) -> T {
        Self::extract(self, entity)
    }

    fn get(&self, entity: Entity) -> Option<&T> {
        Self::get(self, entity)
    }

    fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        Self::get_mut(self, entity)
    }

    fn unstable_index(&self, entity: Entity) -> Option<EntityIndex> {
        Self::unstable_index(self, entity)
    }

    fn at_index(&self, slot: EntityIndex) -> Option<&T> {
        Self::at_index(self, slot)
    }

    fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        Self::sort_by(self, compare);
    }

    fn sort_by_entity<F>(&mut self, compare: F)
    where
        F: FnMut(Entity, Entity) -> Ordering,
    {
        Self::sort_by_entity(self, compare);
    }

    fn traverse<M, C>(&mut self, callback: C)
    where
        C: TraverseCallback<T, M>,
    {
        Self::traverse(self, callback);
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn release(&mut self) {
        Self::release(self);
    }
}
