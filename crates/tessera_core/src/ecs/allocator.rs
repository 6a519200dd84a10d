//! # Entity Allocator
//!
//! Issues and recycles entity ids for one owning system.

use tracing::{debug, trace};

use super::entity::{Entity, EntityRange, NULL_ENTITY};

/// Free-list allocator of entity ids.
///
/// Fresh ids come from a high-water mark starting at `1`. Freed ids are kept
/// as a list of ranges in insertion order and coalesced opportunistically
/// with a neighbour; this is not a defragmenting allocator.
///
/// Freeing an id that was never allocated, or freeing it twice, is a caller
/// error and goes undetected. The fresh space ends below [`NULL_ENTITY`].
///
/// # Example
///
/// ```rust
/// use tessera_core::EntityAllocator;
///
/// let mut allocator = EntityAllocator::new();
/// let player = allocator.allocate();
/// let crowd = allocator.allocate_range(100);
/// assert_eq!(player, 1);
/// assert_eq!(crowd.begin, 2);
///
/// allocator.free_range(crowd);
/// assert_eq!(allocator.high_water_mark(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EntityAllocator {
    /// Last id handed out from the fresh space, `0` when none.
    last_entity: Entity,
    /// Recycled ids, in insertion order.
    free_entities: Vec<EntityRange>,
}

impl EntityAllocator {
    /// Creates an allocator with no id handed out.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_entity: 0,
            free_entities: Vec::new(),
        }
    }

    /// Highest id ever handed out from the fresh space and not retracted.
    #[inline]
    #[must_use]
    pub const fn high_water_mark(&self) -> Entity {
        self.last_entity
    }

    /// Recycled id ranges, in the order they were recorded.
    #[inline]
    #[must_use]
    pub fn free_ranges(&self) -> &[EntityRange] {
        &self.free_entities
    }

    /// Returns an unused id.
    ///
    /// The front free range is consumed first, otherwise the high-water mark
    /// grows by one.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the fresh space is exhausted.
    pub fn allocate(&mut self) -> Entity {
        let Some(front) = self.free_entities.first_mut() else {
            debug_assert!(
                self.last_entity < NULL_ENTITY - 1,
                "entity id space exhausted"
            );
            self.last_entity += 1;
            trace!(entity = self.last_entity, "entity allocated");
            return self.last_entity;
        };

        let entity = front.begin;
        front.begin += 1;
        if front.is_empty() {
            self.free_entities.remove(0);
        }
        trace!(entity, "entity recycled");
        entity
    }

    /// Returns `count` contiguous unused ids.
    ///
    /// Takes the front of the first free range large enough (first fit, in
    /// list order), otherwise grows the high-water mark by `count`.
    ///
    /// # Arguments
    ///
    /// * `count` - Number of ids to reserve; `0` yields an empty range
    ///
    /// # Returns
    ///
    /// The half-open range of reserved ids. Its end never passes
    /// [`NULL_ENTITY`].
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the fresh space cannot hold `count` more ids.
    pub fn allocate_range(&mut self, count: Entity) -> EntityRange {
        let fit = self
            .free_entities
            .iter()
            .position(|free| free.size() >= count);

        let range = if let Some(position) = fit {
            let free = &mut self.free_entities[position];
            let range = EntityRange::new(free.begin, free.begin + count);
            free.begin += count;
            if free.is_empty() {
                self.free_entities.remove(position);
            }
            range
        } else {
            debug_assert!(
                count < NULL_ENTITY - self.last_entity,
                "entity id space cannot hold {count} more ids"
            );
            let range = EntityRange::new(self.last_entity + 1, self.last_entity + 1 + count);
            self.last_entity += count;
            range
        };

        debug!(begin = range.begin, end = range.end, recycled = fit.is_some(), "entity range allocated");
        range
    }

    /// Gives `entity` back.
    ///
    /// The last fresh id only lowers the high-water mark. Any other id extends
    /// the first adjacent free range, or starts a new one.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `entity` is `0` or [`NULL_ENTITY`], neither
    /// of which is ever handed out.
    pub fn free(&mut self, entity: Entity) {
        debug_assert!(
            entity != 0 && entity != NULL_ENTITY,
            "entity {entity} was never allocated"
        );
        trace!(entity, "entity freed");
        if entity == self.last_entity {
            self.last_entity = entity.saturating_sub(1);
            return;
        }

        for free in &mut self.free_entities {
            if free.end == entity {
                free.end += 1;
                return;
            }
            if free.begin == entity + 1 {
                free.begin = entity;
                return;
            }
        }
        self.free_entities.push(EntityRange::new(entity, entity + 1));
    }

    /// Gives every id of `range` back. Empty ranges are ignored.
    ///
    /// A range ending at the high-water mark retracts it to `range.begin - 1`.
    /// Otherwise the range is joined to the first adjacent free range, or
    /// recorded as a new one.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if a non-empty `range` starts at `0`.
    pub fn free_range(&mut self, range: EntityRange) {
        if range.is_empty() {
            return;
        }
        debug_assert!(range.begin != 0, "entity 0 was never allocated");
        debug!(begin = range.begin, end = range.end, "entity range freed");

        if range.end - 1 == self.last_entity {
            self.last_entity = range.begin.saturating_sub(1);
            return;
        }

        for free in &mut self.free_entities {
            if free.end == range.begin {
                free.end = range.end;
                return;
            }
            if free.begin == range.end {
                free.begin = range.begin;
                return;
            }
        }
        self.free_entities.push(range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_entity_is_one() {
        let mut allocator = EntityAllocator::new();
        assert_eq!(allocator.allocate(), 1);
        allocator.free(1);
        assert_eq!(allocator.high_water_mark(), 0);
        assert_eq!(allocator.allocate(), 1);
    }

    #[test]
    fn test_free_coalesces_neighbours() {
        let mut allocator = EntityAllocator::new();
        for _ in 0..10 {
            allocator.allocate();
        }

        allocator.free(4);
        allocator.free(5);
        allocator.free(3);
        assert_eq!(allocator.free_ranges(), &[EntityRange::new(3, 6)]);

        allocator.free(8);
        assert_eq!(
            allocator.free_ranges(),
            &[EntityRange::new(3, 6), EntityRange::new(8, 9)]
        );
        assert_eq!(allocator.high_water_mark(), 10);
    }

    #[test]
    fn test_allocate_reuses_front_range() {
        let mut allocator = EntityAllocator::new();
        allocator.allocate_range(10);
        allocator.free(7);
        allocator.free(2);

        assert_eq!(allocator.allocate(), 7);
        assert_eq!(allocator.allocate(), 2);
        assert!(allocator.free_ranges().is_empty());
        assert_eq!(allocator.allocate(), 11);
    }

    #[test]
    fn test_allocate_range_first_fit() {
        let mut allocator = EntityAllocator::new();
        allocator.allocate_range(100);
        allocator.free_range(EntityRange::new(10, 12));
        allocator.free_range(EntityRange::new(40, 50));
        allocator.free_range(EntityRange::new(20, 30));

        assert_eq!(allocator.allocate_range(5), EntityRange::new(40, 45));
        assert_eq!(allocator.allocate_range(5), EntityRange::new(45, 50));
        assert_eq!(
            allocator.free_ranges(),
            &[EntityRange::new(10, 12), EntityRange::new(20, 30)]
        );
        assert_eq!(allocator.allocate_range(20), EntityRange::new(101, 121));
        assert_eq!(allocator.high_water_mark(), 120);
    }

    #[test]
    fn test_free_range_retracts_high_water_mark() {
        let mut allocator = EntityAllocator::new();
        let first = allocator.allocate_range(8);
        let second = allocator.allocate_range(8);
        assert_eq!(second, EntityRange::new(9, 17));

        allocator.free_range(second);
        assert_eq!(allocator.high_water_mark(), 8);
        allocator.free_range(first);
        assert_eq!(allocator.high_water_mark(), 0);
        assert!(allocator.free_ranges().is_empty());

        allocator.free_range(EntityRange::new(5, 5));
        assert_eq!(allocator.high_water_mark(), 0);
    }

    #[test]
    fn test_free_range_joins_adjacent_ranges() {
        let mut allocator = EntityAllocator::new();
        allocator.allocate_range(50);
        allocator.free_range(EntityRange::new(10, 20));
        allocator.free_range(EntityRange::new(20, 25));
        allocator.free_range(EntityRange::new(5, 10));
        assert_eq!(allocator.free_ranges(), &[EntityRange::new(5, 25)]);
    }

    #[test]
    fn test_last_fresh_id_is_below_null() {
        let mut allocator = EntityAllocator::new();
        let bulk = allocator.allocate_range(NULL_ENTITY - 2);
        assert_eq!(bulk, EntityRange::new(1, NULL_ENTITY - 1));

        let last = allocator.allocate();
        assert_eq!(last, NULL_ENTITY - 1);
        assert_ne!(last, NULL_ENTITY);

        allocator.free(last);
        assert_eq!(allocator.allocate_range(1), EntityRange::new(NULL_ENTITY - 1, NULL_ENTITY));
    }

    #[test]
    #[should_panic(expected = "entity id space exhausted")]
    fn test_allocate_past_last_id_panics() {
        let mut allocator = EntityAllocator::new();
        allocator.allocate_range(NULL_ENTITY - 1);
        allocator.allocate();
    }

    #[test]
    #[should_panic(expected = "cannot hold")]
    fn test_allocate_range_past_last_id_panics() {
        let mut allocator = EntityAllocator::new();
        allocator.allocate_range(10);
        allocator.allocate_range(NULL_ENTITY - 10);
    }

    #[test]
    #[should_panic(expected = "entity 0 was never allocated")]
    fn test_free_zero_panics() {
        let mut allocator = EntityAllocator::new();
        allocator.free(0);
    }
}
