//! # Entity Identifiers
//!
//! Entities are plain integer identifiers. They carry no data and no
//! generation counter: component tables key their rows directly by id.
//!
//! - `NULL_ENTITY` (all bits set) marks "no entity" and empty slots
//! - `EntityRange` is a half-open interval used by bulk operations

use std::ops::Range;

/// Identifier of an entity.
pub type Entity = u32;

/// Slot number inside a component table.
pub type EntityIndex = Entity;

/// Reserved "no entity" value. Never a valid live id.
pub const NULL_ENTITY: Entity = Entity::MAX;

/// Reserved "no slot" value stored in unwritten sparse entries.
pub const NULL_ENTITY_INDEX: EntityIndex = EntityIndex::MAX;

/// Half-open interval `[begin, end)` of entity ids.
///
/// # Example
///
/// ```rust
/// use tessera_core::EntityRange;
///
/// let range = EntityRange::new(10, 14);
/// assert_eq!(range.size(), 4);
/// assert!(range.contains(13));
/// assert!(!range.contains(14));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntityRange {
    /// First entity of the range.
    pub begin: Entity,
    /// One past the last entity of the range.
    pub end: Entity,
}

impl EntityRange {
    /// Creates a new range.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `begin > end`.
    #[inline]
    #[must_use]
    pub const fn new(begin: Entity, end: Entity) -> Self {
        debug_assert!(begin <= end, "EntityRange begin must not exceed end");
        Self { begin, end }
    }

    /// Number of entities covered by the range.
    #[inline]
    #[must_use]
    pub const fn size(self) -> Entity {
        self.end - self.begin
    }

    /// Returns `true` if the range covers no entity.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.begin == self.end
    }

    /// Checks if an entity lies inside the range.
    #[inline]
    #[must_use]
    pub const fn contains(self, entity: Entity) -> bool {
        entity >= self.begin && entity < self.end
    }

    /// Iterates over every entity of the range in ascending order.
    #[inline]
    pub fn iter(self) -> Range<Entity> {
        self.begin..self.end
    }
}

impl From<Range<Entity>> for EntityRange {
    #[inline]
    fn from(range: Range<Entity>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl IntoIterator for EntityRange {
    type Item = Entity;
    type IntoIter = Range<Entity>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_size() {
        let range = EntityRange::new(0, 100);
        assert_eq!(range.size(), 100);
        assert!(!range.is_empty());
        assert!(EntityRange::new(7, 7).is_empty());
    }

    #[test]
    fn test_range_contains() {
        let range = EntityRange::from(5..8);
        assert!(!range.contains(4));
        assert!(range.contains(5));
        assert!(range.contains(7));
        assert!(!range.contains(8));
        assert_eq!(range.into_iter().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn test_null_sentinels() {
        assert_eq!(NULL_ENTITY, u32::MAX);
        assert_eq!(NULL_ENTITY_INDEX, u32::MAX);
    }
}
