//! # Components and Tables
//!
//! Components are opaque values: the engine only moves, constructs and
//! drops them. Each component type picks exactly one table kind through
//! [`Component::Storage`]:
//!
//! - [`PackedComponentTable`]: dense, slots move on removal
//! - [`StableComponentTable`]: paged, slots survive unrelated removals
//!   until the next `pack`
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{Component, ComponentTable, PackedComponentTable, StableComponentTable, Storage};
//!
//! struct Health(u32);
//! struct Mesh(String);
//!
//! impl Component for Health {
//!     type Storage = PackedComponentTable<Self>;
//! }
//!
//! impl Component for Mesh {
//!     type Storage = StableComponentTable<Self>;
//! }
//!
//! let mut health = Storage::<Health>::default();
//! health.add(1, Health(100));
//! assert!(!<Storage<Health> as ComponentTable<Health>>::IS_STABLE);
//! assert!(<Storage<Mesh> as ComponentTable<Mesh>>::IS_STABLE);
//! ```
//!
//! [`PackedComponentTable`]: super::PackedComponentTable
//! [`StableComponentTable`]: super::StableComponentTable

use std::cmp::Ordering;

use super::entity::{Entity, EntityIndex, EntityRange};
use super::traverse::TraverseCallback;

/// Marker trait for component types, binding each type to one table kind.
pub trait Component: Sized + 'static {
    /// The table kind holding this component.
    type Storage: ComponentTable<Self>;
}

/// The table type registered for component `C`.
pub type Storage<C> = <C as Component>::Storage;

/// Interface shared by both table kinds.
///
/// Preconditions (`add` on a present entity, `remove`/`extract` on an absent
/// one) are checked with debug assertions only.
pub trait ComponentTable<T>: Default {
    /// `true` if slot numbers survive unrelated removals.
    const IS_STABLE: bool;

    /// Number of live rows.
    fn count(&self) -> usize;

    /// Returns `true` if the table holds no live row.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Checks if `entity` has a row in this table.
    fn exists(&self, entity: Entity) -> bool;

    /// Inserts a row for an absent entity.
    fn add(&mut self, entity: Entity, component: T) -> &mut T;

    /// Overwrites the row of `entity` if present, inserts it otherwise.
    fn try_add(&mut self, entity: Entity, component: T) -> &mut T;

    /// Runs `update` on the row of `entity`, default-inserting it first if absent.
    fn try_add_with<F>(&mut self, entity: Entity, update: F) -> &mut T
    where
        T: Default,
        F: FnOnce(&mut T);

    /// Inserts one row per entity of `range`, built by `make`.
    fn add_range_with<F>(&mut self, range: EntityRange, make: F)
    where
        F: FnMut(Entity) -> T;

    /// Removes the row of a present entity.
    fn remove(&mut self, entity: Entity);

    /// Removes the row of `entity` if present.
    fn try_remove(&mut self, entity: Entity) -> bool;

    /// Removes every present row whose entity lies in `range`.
    fn remove_range(&mut self, range: EntityRange);

    /// Removes the row of a present entity and returns its component.
    fn extract(&mut self, entity: Entity) -> T;

    /// Component of `entity`, if present.
    fn get(&self, entity: Entity) -> Option<&T>;

    /// Mutable component of `entity`, if present.
    fn get_mut(&mut self, entity: Entity) -> Option<&mut T>;

    /// Current slot of `entity`, if present.
    fn unstable_index(&self, entity: Entity) -> Option<EntityIndex>;

    /// Component stored at `slot`, if the slot is live.
    fn at_index(&self, slot: EntityIndex) -> Option<&T>;

    /// Sorts rows by component.
    fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering;

    /// Sorts rows by entity.
    fn sort_by_entity<F>(&mut self, compare: F)
    where
        F: FnMut(Entity, Entity) -> Ordering;

    /// Visits live rows in slot order.
    fn traverse<M, C>(&mut self, callback: C)
    where
        C: TraverseCallback<T, M>;

    /// Drops every row, keeping capacity.
    fn clear(&mut self);

    /// Drops every row and frees capacity.
    fn release(&mut self);
}

/// Fatal precondition failure: `entity` has no row in the table.
#[cold]
#[track_caller]
pub(crate) fn absent_entity(entity: Entity) -> ! {
    panic!("entity {entity} is not attached to this table")
}
