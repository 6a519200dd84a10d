//! # Entity Churn Tests
//!
//! An owning system allocates ids, attaches components to both table kinds
//! and despawns entities frame after frame, the way a scheduler drives the
//! storage layer.
//!
//! Run with: cargo test --test entity_churn_test -- --nocapture

use std::collections::BTreeSet;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{
    Entity, EntityAllocator, EntityRange, PackedComponentTable, StableComponentTable,
};

/// Minimal owning system: one allocator, one table of each kind.
#[derive(Default)]
struct System {
    allocator: EntityAllocator,
    positions: PackedComponentTable<[f32; 2]>,
    names: StableComponentTable<String>,
    alive: BTreeSet<Entity>,
}

impl System {
    fn spawn(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        assert!(self.alive.insert(entity), "entity {entity} handed out twice");
        self.positions.add(entity, [0.0, 0.0]);
        self.names.add(entity, format!("entity-{entity}"));
        entity
    }

    fn spawn_batch(&mut self, count: Entity) -> EntityRange {
        let range = self.allocator.allocate_range(count);
        for entity in range {
            assert!(self.alive.insert(entity), "entity {entity} handed out twice");
        }
        self.positions.add_range(range, &[1.0, 1.0]);
        self.names.add_range_with(range, |entity| format!("entity-{entity}"));
        range
    }

    fn despawn(&mut self, entity: Entity) {
        assert!(self.alive.remove(&entity));
        self.positions.remove(entity);
        self.names.remove(entity);
        self.allocator.free(entity);
    }

    fn despawn_batch(&mut self, range: EntityRange) {
        for entity in range {
            assert!(self.alive.remove(&entity));
        }
        self.positions.remove_range(range);
        self.names.remove_range(range);
        self.allocator.free_range(range);
    }

    fn assert_consistent(&self) {
        assert_eq!(self.positions.count(), self.alive.len());
        assert_eq!(self.names.count(), self.alive.len());
        for &entity in &self.alive {
            assert!(self.positions.exists(entity));
            assert_eq!(self.names[entity], format!("entity-{entity}"));
        }
    }
}

/// Test: Despawned ids come back and never collide with live ones.
#[test]
fn test_ids_recycled_without_collision() {
    let mut system = System::default();
    let first = system.spawn();
    assert_eq!(first, 1);
    let batch = system.spawn_batch(20);
    assert_eq!(batch, EntityRange::new(2, 22));

    system.despawn(5);
    system.despawn(6);
    assert_eq!(system.spawn(), 5);
    assert_eq!(system.spawn(), 6);

    system.despawn_batch(EntityRange::new(10, 15));
    let reused = system.spawn_batch(3);
    assert_eq!(reused, EntityRange::new(10, 13));
    system.assert_consistent();
}

/// Test: Random frame-by-frame churn keeps ids unique and tables aligned.
#[test]
fn test_random_churn() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut system = System::default();

    for frame in 0..200 {
        for _ in 0..rng.gen_range(0..20) {
            system.spawn();
        }
        if rng.gen_bool(0.3) {
            system.spawn_batch(rng.gen_range(1..32));
        }

        let alive: Vec<Entity> = system.alive.iter().copied().collect();
        for &entity in &alive {
            if rng.gen_bool(0.2) {
                system.despawn(entity);
            }
        }

        system.positions.traverse(|position: &mut [f32; 2]| position[0] += 1.0);
        if frame % 50 == 49 {
            system.names.pack();
            system.positions.sort_by_entity(|lhs, rhs| lhs.cmp(&rhs));
        }
        system.assert_consistent();
    }

    let alive: Vec<Entity> = system.alive.iter().copied().collect();
    for entity in alive {
        system.despawn(entity);
    }
    assert!(system.positions.is_empty());
    assert!(system.names.is_empty());
}

/// Test: Bulk spawn and despawn of one million entities.
#[test]
fn verify_million_entity_batch() {
    const COUNT: Entity = 1_000_000;

    let mut allocator = EntityAllocator::new();
    let mut positions = PackedComponentTable::<[f32; 2]>::new();
    let mut slots = StableComponentTable::<u64>::new();

    let start = Instant::now();
    let range = allocator.allocate_range(COUNT);
    positions.add_range(range, &[0.0, 0.0]);
    slots.add_range_with(range, u64::from);
    let spawned = start.elapsed();

    let mut visited = 0_u32;
    positions.traverse(|_entity: Entity| visited += 1);
    assert_eq!(visited, COUNT);

    let start = Instant::now();
    positions.remove_range(range);
    slots.remove_range(range);
    allocator.free_range(range);
    let despawned = start.elapsed();

    println!("\n  spawn   {COUNT} entities: {:>10.3} ms", spawned.as_secs_f64() * 1000.0);
    println!("  despawn {COUNT} entities: {:>10.3} ms", despawned.as_secs_f64() * 1000.0);

    assert!(positions.is_empty());
    assert!(slots.is_empty());
    assert_eq!(allocator.high_water_mark(), 0);
}
