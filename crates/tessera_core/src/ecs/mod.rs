//! # Entity Component Storage
//!
//! Sparse-set component tables keyed by plain entity ids.
//!
//! ## Layout
//!
//! - Entity ids are handed out by an [`EntityAllocator`] owned by one system
//! - Every table owns a paged [`SparseIndex`] from entity to slot
//! - The dense entity list of a table is authoritative for membership
//! - No table references another, no locking: one writer per table

mod allocator;
mod component;
mod entity;
mod sparse;
mod stable;
mod table;
pub mod traverse;

pub use allocator::EntityAllocator;
pub use component::{Component, ComponentTable, Storage};
pub use entity::{Entity, EntityIndex, EntityRange, NULL_ENTITY, NULL_ENTITY_INDEX};
pub use sparse::SparseIndex;
pub use stable::StableComponentTable;
pub use table::PackedComponentTable;
pub use traverse::{TraverseCallback, TraverseFlow};
