//! # TESSERA Core Storage
//!
//! Component storage engine for an entity component system:
//! - Plain integer entity ids recycled through a range free-list
//! - O(1) entity -> slot lookup through paged sparse arrays
//! - Two table kinds per component type, packed or slot-stable
//!
//! ## Architecture Rules
//!
//! 1. **Tables are independent** - Each owns its sparse index and storage
//! 2. **Dense lists are authoritative** - Sparse entries may be stale
//! 3. **One writer per table** - No locks, the scheduler serializes access
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{EntityAllocator, PackedComponentTable, StableComponentTable};
//!
//! let mut allocator = EntityAllocator::new();
//! let mut positions = PackedComponentTable::new();
//! let mut meshes = StableComponentTable::new();
//!
//! let ship = allocator.allocate();
//! positions.add(ship, [0.0_f32, 0.0, 0.0]);
//! meshes.add(ship, String::from("ship.mesh"));
//!
//! positions.traverse(|position: &mut [f32; 3]| position[1] += 1.0);
//! assert_eq!(positions[ship], [0.0, 1.0, 0.0]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::TableConfig;
pub use ecs::{
    Component, ComponentTable, Entity, EntityAllocator, EntityIndex, EntityRange,
    PackedComponentTable, SparseIndex, StableComponentTable, Storage, TraverseCallback,
    TraverseFlow, NULL_ENTITY, NULL_ENTITY_INDEX,
};
pub use error::{StorageError, StorageResult};
