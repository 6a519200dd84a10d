//! # Sparse Index
//!
//! Paged map from entity id to table slot.
//!
//! An entity id is split into `(page, element)` with a power-of-two page
//! size. Pages are allocated lazily on first write and are never shrunk
//! implicitly. Unwritten entries read as [`NULL_ENTITY_INDEX`].
//!
//! The sparse index is an acceleration structure: a table's dense entity
//! list stays authoritative for membership, so a stale entry here is not
//! an error.

use super::entity::{Entity, EntityIndex, NULL_ENTITY_INDEX};
use crate::config::{check_page_size, DEFAULT_ENTITY_PAGE_SIZE};
use crate::error::StorageResult;

/// Paged entity -> slot map.
#[derive(Clone, Debug)]
pub struct SparseIndex {
    /// Lazily allocated pages, `None` until first written.
    pages: Vec<Option<Box<[EntityIndex]>>>,
    /// `log2(page_size)`.
    page_shift: u32,
    /// `page_size - 1`.
    element_mask: usize,
}

impl Default for SparseIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseIndex {
    /// Creates an empty index with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::from_page_size(DEFAULT_ENTITY_PAGE_SIZE)
    }

    /// Creates an empty index with `page_size` entries per page.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::InvalidPageSize`] if `page_size` is not a
    /// non-zero power of two.
    pub fn with_page_size(page_size: usize) -> StorageResult<Self> {
        check_page_size("entity", page_size)?;
        Ok(Self::from_page_size(page_size))
    }

    fn from_page_size(page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two());
        Self {
            pages: Vec::new(),
            page_shift: page_size.trailing_zeros(),
            element_mask: page_size - 1,
        }
    }

    /// Entries per page.
    #[inline]
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.element_mask + 1
    }

    /// Number of page slots (allocated or not) currently tracked.
    #[inline]
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[inline]
    const fn split(&self, entity: Entity) -> (usize, usize) {
        let entity = entity as usize;
        (entity >> self.page_shift, entity & self.element_mask)
    }

    /// Records `slot` for `entity`, allocating its page if needed.
    #[inline]
    pub fn add(&mut self, entity: Entity, slot: EntityIndex) {
        let (page_index, element_index) = self.split(entity);
        let page_size = self.page_size();
        if page_index >= self.pages.len() {
            self.pages.resize_with(page_index + 1, || None);
        }
        let page = self.pages[page_index]
            .get_or_insert_with(|| vec![NULL_ENTITY_INDEX; page_size].into_boxed_slice());
        page[element_index] = slot;
    }

    /// Reads the slot of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if the entity's page was never allocated. Callers must know the
    /// entity was written before; use [`SparseIndex::get`] to probe.
    #[inline]
    #[must_use]
    pub fn at(&self, entity: Entity) -> EntityIndex {
        let (page_index, element_index) = self.split(entity);
        match &self.pages[page_index] {
            Some(page) => page[element_index],
            None => panic!("sparse page of entity {entity} is not allocated"),
        }
    }

    /// Reads the slot of `entity` without allocating, `None` if unset.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<EntityIndex> {
        let (page_index, element_index) = self.split(entity);
        let slot = self.pages.get(page_index)?.as_ref()?[element_index];
        (slot != NULL_ENTITY_INDEX).then_some(slot)
    }

    /// Resets the entry of `entity` to [`NULL_ENTITY_INDEX`].
    #[inline]
    pub fn remove(&mut self, entity: Entity) {
        if let Some(entry) = self.entry_mut(entity) {
            *entry = NULL_ENTITY_INDEX;
        }
    }

    /// Reads then resets the entry of `entity`.
    #[inline]
    pub fn extract(&mut self, entity: Entity) -> EntityIndex {
        self.entry_mut(entity)
            .map_or(NULL_ENTITY_INDEX, |entry| std::mem::replace(entry, NULL_ENTITY_INDEX))
    }

    /// Checks whether the page backing `entity` has been allocated.
    #[inline]
    #[must_use]
    pub fn page_exists(&self, entity: Entity) -> bool {
        let (page_index, _) = self.split(entity);
        matches!(self.pages.get(page_index), Some(Some(_)))
    }

    /// Resets every allocated page to [`NULL_ENTITY_INDEX`], keeping the memory.
    pub fn clear(&mut self) {
        for page in self.pages.iter_mut().flatten() {
            page.fill(NULL_ENTITY_INDEX);
        }
    }

    /// Frees every page and returns to the pristine state.
    pub fn release(&mut self) {
        self.pages = Vec::new();
    }

    /// Realigns a secondary sequence after `entities` was reordered.
    ///
    /// On entry every entry of this index still holds the slot its entity had
    /// before the reorder. Each permutation cycle is followed once, calling
    /// `swap(a, b)` so the secondary sequence ends in the order of `entities`
    /// (at most one swap per displaced row), and entries are rewritten to the
    /// new slots as the cycle closes.
    pub(crate) fn realign<S>(&mut self, entities: &[Entity], mut swap: S)
    where
        S: FnMut(usize, usize),
    {
        for position in 0..entities.len() {
            let mut current = position;
            let mut next = self.at(entities[current]) as usize;
            while current != next {
                let origin = self.at(entities[next]) as usize;
                swap(next, origin);
                self.add(entities[current], to_entity_index(current));
                current = next;
                next = origin;
            }
        }
    }

    #[inline]
    fn entry_mut(&mut self, entity: Entity) -> Option<&mut EntityIndex> {
        let (page_index, element_index) = self.split(entity);
        self.pages
            .get_mut(page_index)?
            .as_mut()
            .map(|page| &mut page[element_index])
    }
}

/// Narrows a dense position to a slot number.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_entity_index(slot: usize) -> EntityIndex {
    debug_assert!(slot < NULL_ENTITY_INDEX as usize, "slot {slot} overflows EntityIndex");
    slot as EntityIndex
}
