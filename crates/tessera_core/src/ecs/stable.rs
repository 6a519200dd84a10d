//! # Stable Component Table
//!
//! Paged component storage whose slots survive unrelated removals.
//!
//! ```text
//! entities:   [ 4 ][ 9 ][NUL][ 2 ][NUL][ 7 ]      tombstones: [4, 2]
//!               |    |         |         |
//! pages:      [ d4 | d9 | -- | d2 ] [ -- | d7 | -- | -- ]
//! ```
//!
//! Removal drops the component in place, marks the slot with
//! [`NULL_ENTITY`] and pushes it on the tombstone list; no other row moves.
//! Insertion reuses the most recently freed tombstone before growing.
//! [`StableComponentTable::pack`] is the only operation that renumbers
//! slots: it moves tail rows into the holes and truncates.

use std::cmp::Ordering;
use std::ops::{Index, IndexMut};

use tracing::debug;

use super::component::{absent_entity, ComponentTable};
use super::entity::{Entity, EntityIndex, EntityRange, NULL_ENTITY};
use super::sparse::{to_entity_index, SparseIndex};
use super::traverse::{drive, TraverseCallback};
use crate::config::{default_component_page_size, TableConfig};
use crate::error::StorageResult;

/// Fixed-size pages of optional components, addressed by slot.
///
/// A cell is `Some` iff the matching entity slot is live.
#[derive(Clone, Debug)]
struct ComponentPages<T> {
    pages: Vec<Box<[Option<T>]>>,
    /// `log2(page_size)`.
    page_shift: u32,
    /// `page_size - 1`.
    element_mask: usize,
}

impl<T> ComponentPages<T> {
    fn new(page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two());
        Self {
            pages: Vec::new(),
            page_shift: page_size.trailing_zeros(),
            element_mask: page_size - 1,
        }
    }

    #[inline]
    const fn page_size(&self) -> usize {
        self.element_mask + 1
    }

    #[inline]
    const fn split(&self, slot: usize) -> (usize, usize) {
        (slot >> self.page_shift, slot & self.element_mask)
    }

    #[inline]
    fn get(&self, slot: usize) -> Option<&T> {
        let (page, element) = self.split(slot);
        self.pages.get(page)?[element].as_ref()
    }

    #[inline]
    fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        let (page, element) = self.split(slot);
        self.pages.get_mut(page)?[element].as_mut()
    }

    /// Cell at `slot`, growing pages on demand.
    #[inline]
    fn cell_mut(&mut self, slot: usize) -> &mut Option<T> {
        let (page, element) = self.split(slot);
        while self.pages.len() <= page {
            let fresh: Vec<Option<T>> = (0..self.page_size()).map(|_| None).collect();
            self.pages.push(fresh.into_boxed_slice());
        }
        &mut self.pages[page][element]
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let taken = self.cell_mut(a).take();
        let other = std::mem::replace(self.cell_mut(b), taken);
        *self.cell_mut(a) = other;
    }

    /// Drops pages that lie entirely past the first `len` slots.
    fn truncate(&mut self, len: usize) {
        let needed = (len + self.element_mask) >> self.page_shift;
        self.pages.truncate(needed);
    }
}

/// Paged storage for one component type with stable slots.
///
/// # Example
///
/// ```rust
/// use tessera_core::StableComponentTable;
///
/// let mut table = StableComponentTable::new();
/// table.add(1, "one");
/// table.add(2, "two");
/// let slot = table.unstable_index(2).unwrap();
///
/// table.remove(1);
/// assert_eq!(table.at_index(slot), Some(&"two")); // unchanged until pack
///
/// table.pack();
/// assert_eq!(table.unstable_index(2), Some(0));
/// ```
#[derive(Clone, Debug)]
pub struct StableComponentTable<T> {
    /// Entity -> slot.
    sparse: SparseIndex,
    /// Owner of each slot, [`NULL_ENTITY`] for tombstones.
    entities: Vec<Entity>,
    /// Free slots, most recently freed last.
    tombstones: Vec<EntityIndex>,
    /// Component of each slot.
    pages: ComponentPages<T>,
}

impl<T> Default for StableComponentTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StableComponentTable<T> {
    /// Creates an empty table with default page sizes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sparse: SparseIndex::new(),
            entities: Vec::new(),
            tombstones: Vec::new(),
            pages: ComponentPages::new(default_component_page_size::<T>()),
        }
    }

    /// Creates an empty table from a configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Sparse page size, component page size override and
    ///   entity list reserve
    ///
    /// # Returns
    ///
    /// An empty table. Component pages are allocated on first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn with_config(config: &TableConfig) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self {
            sparse: SparseIndex::with_page_size(config.entity_page_size)?,
            entities: Vec::with_capacity(config.reserve),
            tombstones: Vec::new(),
            pages: ComponentPages::new(config.component_page_size_for::<T>()),
        })
    }

    /// Number of live rows.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len() - self.tombstones.len()
    }

    /// Returns `true` if the table has no live row.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of freed slots awaiting reuse or [`StableComponentTable::pack`].
    #[inline]
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Components per page.
    #[inline]
    #[must_use]
    pub const fn component_page_size(&self) -> usize {
        self.pages.page_size()
    }

    /// Checks if `entity` has a row in this table.
    #[inline]
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.find_index(entity).is_some()
    }

    /// Owner of each slot, [`NULL_ENTITY`] marking tombstones.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Inserts a row for `entity`, reusing the most recently freed slot if any.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `entity` is already present or is [`NULL_ENTITY`].
    pub fn add(&mut self, entity: Entity, component: T) -> &mut T {
        debug_assert!(entity != NULL_ENTITY, "cannot attach a component to the null entity");
        debug_assert!(!self.exists(entity), "entity {entity} already has a component");

        let slot = if let Some(slot) = self.tombstones.pop() {
            let slot = slot as usize;
            self.entities[slot] = entity;
            slot
        } else {
            self.entities.push(entity);
            self.entities.len() - 1
        };
        self.sparse.add(entity, to_entity_index(slot));
        self.insert_component(slot, component)
    }

    /// Overwrites the component of `entity` if present, inserts it otherwise.
    pub fn try_add(&mut self, entity: Entity, component: T) -> &mut T {
        match self.find_index(entity) {
            Some(slot) => self.pages.cell_mut(slot).insert(component),
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
            Some(slot) => self.pages.cell_mut(slot).get_or_insert_with(T::default),
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
    /// Rows are appended after the last slot; tombstones are left for
    /// single insertions.
    ///
    /// # Arguments
    ///
    /// * `range` - Entities to attach, in ascending order
    /// * `make` - Builds the component of each entity, before its slot is taken
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

        self.entities.reserve(range.size() as usize);
        for entity in range {
            let component = make(entity);
            let slot = self.entities.len();
            self.entities.push(entity);
            self.sparse.add(entity, to_entity_index(slot));
            self.insert_component(slot, component);
        }
        debug!(begin = range.begin, end = range.end, count = self.count(), "stable table range added");
    }

    /// Removes the row of `entity`, leaving a tombstone in its slot.
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

    /// Removes every present row whose entity lies in `range`.
    ///
    /// Linear in the size of `range`, not of the table.
    pub fn remove_range(&mut self, range: EntityRange) {
        let mut removed = 0_usize;
        for entity in range {
            if let Some(slot) = self.find_index(entity) {
                drop(self.remove_at(entity, slot));
                removed += 1;
            }
        }
        debug!(
            begin = range.begin,
            end = range.end,
            removed,
            tombstones = self.tombstones.len(),
            "stable table range removed"
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
        self.pages.get(self.find_index(entity)?)
    }

    /// Mutable component of `entity`, if present.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = self.find_index(entity)?;
        self.pages.get_mut(slot)
    }

    /// Slot of `entity`, if present.
    ///
    /// Stays valid across unrelated insertions and removals until the next
    /// [`StableComponentTable::pack`] or sort.
    #[inline]
    #[must_use]
    pub fn unstable_index(&self, entity: Entity) -> Option<EntityIndex> {
        self.find_index(entity).map(to_entity_index)
    }

    /// Component at `slot`, `None` for tombstones and out-of-range slots.
    #[inline]
    #[must_use]
    pub fn at_index(&self, slot: EntityIndex) -> Option<&T> {
        let slot = slot as usize;
        if slot >= self.entities.len() {
            return None;
        }
        self.pages.get(slot)
    }

    /// Mutable component at `slot`, `None` for tombstones and out-of-range slots.
    #[inline]
    pub fn at_index_mut(&mut self, slot: EntityIndex) -> Option<&mut T> {
        let slot = slot as usize;
        if slot >= self.entities.len() {
            return None;
        }
        self.pages.get_mut(slot)
    }

    /// Iterates over live `(entity, component)` rows in slot order, skipping tombstones.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Entity, &T)> {
        self.entities
            .iter()
            .enumerate()
            .filter(|&(_, &entity)| entity != NULL_ENTITY)
            .filter_map(|(slot, &entity)| Some((entity, self.pages.get(slot)?)))
    }

    /// Iterates mutably over live `(entity, component)` rows in slot order.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (Entity, &mut T)> {
        let page_size = self.pages.page_size();
        self.entities
            .chunks(page_size)
            .zip(self.pages.pages.iter_mut())
            .flat_map(|(owners, page)| owners.iter().copied().zip(page.iter_mut()))
            .filter(|&(entity, _)| entity != NULL_ENTITY)
            .filter_map(|(entity, cell)| Some((entity, cell.as_mut()?)))
    }

    /// Moves tail rows into tombstoned slots until storage is contiguous.
    ///
    /// While holes remain, a tail slot that is itself a tombstone is dropped,
    /// otherwise the last live row moves into the smallest remaining hole.
    /// Every slot obtained before this call must be looked up again.
    pub fn pack(&mut self) {
        if self.tombstones.is_empty() {
            return;
        }

        let mut holes = std::mem::take(&mut self.tombstones);
        let hole_count = holes.len();
        holes.sort_unstable_by(|lhs, rhs| rhs.cmp(lhs));

        let (mut largest, mut smallest) = (0, holes.len());
        while largest < smallest {
            let last = self.entities.len() - 1;
            if holes[largest] as usize == last {
                self.entities.pop();
                largest += 1;
                continue;
            }

            smallest -= 1;
            let hole = holes[smallest] as usize;
            let Some(entity) = self.entities.pop() else {
                break;
            };
            self.pages.swap(hole, last);
            self.entities[hole] = entity;
            self.sparse.add(entity, to_entity_index(hole));
        }

        holes.clear();
        self.tombstones = holes;
        self.pages.truncate(self.entities.len());
        debug!(filled = hole_count, count = self.count(), "stable table packed");
    }

    /// Sorts rows by comparing components. Packs first.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.sort_rows(|_, lhs, _, rhs| compare(lhs, rhs));
    }

    /// Sorts rows by comparing entities. Packs first.
    pub fn sort_by_entity<F>(&mut self, mut compare: F)
    where
        F: FnMut(Entity, Entity) -> Ordering,
    {
        self.sort_rows(|lhs, _, rhs, _| compare(lhs, rhs));
    }

    /// Sorting only works over contiguous rows, so this packs first: slot
    /// stability is void for the whole call and afterwards.
    fn sort_rows<F>(&mut self, mut compare: F)
    where
        F: FnMut(Entity, &T, Entity, &T) -> Ordering,
    {
        self.pack();

        let Self {
            sparse,
            entities,
            pages,
            ..
        } = self;

        entities.sort_unstable_by(|&lhs, &rhs| {
            let lhs_component = pages.get(sparse.at(lhs) as usize);
            let rhs_component = pages.get(sparse.at(rhs) as usize);
            match (lhs_component, rhs_component) {
                (Some(lhs_component), Some(rhs_component)) => {
                    compare(lhs, lhs_component, rhs, rhs_component)
                }
                // Packed rows are always live
                _ => Ordering::Equal,
            }
        });
        sparse.realign(entities, |a, b| pages.swap(a, b));
        debug!(count = entities.len(), "stable table sorted");
    }

    /// Visits live rows in slot order. See [`crate::ecs::traverse`] for callback shapes.
    #[inline]
    pub fn traverse<M, C>(&mut self, mut callback: C)
    where
        C: TraverseCallback<T, M>,
    {
        drive(self.iter_mut(), &mut callback);
    }

    /// Drops every live component, keeping pages and capacity.
    pub fn clear(&mut self) {
        for (slot, &entity) in self.entities.iter().enumerate() {
            if entity != NULL_ENTITY {
                drop(self.pages.cell_mut(slot).take());
            }
        }
        self.entities.clear();
        self.tombstones.clear();
        self.sparse.clear();
    }

    /// Drops every live component and frees all pages.
    pub fn release(&mut self) {
        self.clear();
        self.pages.pages = Vec::new();
        self.entities = Vec::new();
        self.tombstones = Vec::new();
        self.sparse.release();
        debug!("stable table released");
    }

    /// Slot of `entity`, validated against the entity list.
    #[inline]
    fn find_index(&self, entity: Entity) -> Option<usize> {
        let slot = self.sparse.get(entity)? as usize;
        (self.entities.get(slot) == Some(&entity)).then_some(slot)
    }

    fn insert_component(&mut self, slot: usize, component: T) -> &mut T {
        let cell = self.pages.cell_mut(slot);
        debug_assert!(cell.is_none(), "slot {slot} still holds a component");
        cell.insert(component)
    }

    /// Tombstones the slot of `entity` and moves its component out.
    fn remove_at(&mut self, entity: Entity, slot: usize) -> T {
        self.sparse.remove(entity);
        self.entities[slot] = NULL_ENTITY;
        self.tombstones.push(to_entity_index(slot));
        match self.pages.cell_mut(slot).take() {
            Some(component) => component,
            None => absent_entity(entity),
        }
    }
}

impl<T> Index<Entity> for StableComponentTable<T> {
    type Output = T;

    #[inline]
    fn index(&self, entity: Entity) -> &T {
        self.get(entity).unwrap_or_else(|| absent_entity(entity))
    }
}

impl<T> IndexMut<Entity> for StableComponentTable<T> {
    #[inline]
    fn index_mut(&mut self, entity: Entity) -> &mut T {
        self.find_index(entity)
            .and_then(|slot| self.pages.get_mut(slot))
            .unwrap_or_else(|| absent_entity(entity))
    }
}

impl<T> ComponentTable<T> for StableComponentTable<T> {
    const IS_STABLE: bool = true;

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
