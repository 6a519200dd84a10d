//! # Component Table Benchmark
//!
//! Compares the packed and stable tables on the operations a frame hits:
//! bulk insertion, traversal, random lookup, churn and sorting.
//!
//! Run with: `cargo bench --package tessera_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{
    ComponentTable, Entity, EntityAllocator, EntityRange, PackedComponentTable,
    StableComponentTable,
};

/// Entities per table in the steady-state benchmarks.
const ENTITY_COUNT: Entity = 100_000;

#[derive(Clone, Copy, Default)]
struct Transform {
    position: [f32; 3],
    velocity: [f32; 3],
}

fn filled<S: ComponentTable<Transform>>(count: Entity) -> S {
    let mut table = S::default();
    table.add_range_with(EntityRange::new(0, count), |entity| Transform {
        position: [entity as f32, 0.0, 0.0],
        velocity: [1.0, 0.5, 0.25],
    });
    table
}

/// Benchmark: Bulk insertion of a fresh range.
fn bench_add_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_range");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::new("packed", count), &count, |b, &count| {
            b.iter(|| black_box(filled::<PackedComponentTable<Transform>>(count).count()));
        });
        group.bench_with_input(BenchmarkId::new("stable", count), &count, |b, &count| {
            b.iter(|| black_box(filled::<StableComponentTable<Transform>>(count).count()));
        });
    }

    group.finish();
}

/// Benchmark: Integrating every transform once.
fn bench_traverse(c: &mut Criterion) {
    let mut packed = filled::<PackedComponentTable<Transform>>(ENTITY_COUNT);
    let mut stable = filled::<StableComponentTable<Transform>>(ENTITY_COUNT);
    // A quarter of the stable slots are tombstones
    for entity in (0..ENTITY_COUNT).step_by(4) {
        stable.remove(entity);
    }

    let integrate = |transform: &mut Transform| {
        for axis in 0..3 {
            transform.position[axis] += transform.velocity[axis] * 0.016;
        }
    };

    let mut group = c.benchmark_group("traverse");
    group.bench_function("packed_100K", |b| b.iter(|| packed.traverse(integrate)));
    group.bench_function("stable_100K_holes", |b| b.iter(|| stable.traverse(integrate)));
    stable.pack();
    group.bench_function("stable_100K_packed", |b| b.iter(|| stable.traverse(integrate)));
    group.finish();
}

/// Benchmark: Random entity lookups (worst case for cache).
fn bench_random_get(c: &mut Criterion) {
    let packed = filled::<PackedComponentTable<Transform>>(ENTITY_COUNT);
    let stable = filled::<StableComponentTable<Transform>>(ENTITY_COUNT);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let lookups: Vec<Entity> = (0..10_000).map(|_| rng.gen_range(0..ENTITY_COUNT)).collect();

    let mut group = c.benchmark_group("random_get");
    group.bench_function("packed_10K", |b| {
        b.iter(|| {
            let mut sum = 0.0_f32;
            for &entity in &lookups {
                if let Some(transform) = packed.get(entity) {
                    sum += transform.position[0];
                }
            }
            black_box(sum)
        });
    });
    group.bench_function("stable_10K", |b| {
        b.iter(|| {
            let mut sum = 0.0_f32;
            for &entity in &lookups {
                if let Some(transform) = stable.get(entity) {
                    sum += transform.position[0];
                }
            }
            black_box(sum)
        });
    });
    group.finish();
}

/// Benchmark: Despawn then respawn 10K entities through the allocator.
fn bench_churn(c: &mut Criterion) {
    fn churn<S: ComponentTable<Transform>>(table: &mut S, allocator: &mut EntityAllocator) {
        for entity in (1..=ENTITY_COUNT).step_by(10) {
            table.remove(entity);
            allocator.free(entity);
        }
        for _ in 0..ENTITY_COUNT / 10 {
            let entity = allocator.allocate();
            table.add(entity, Transform::default());
        }
    }

    let mut group = c.benchmark_group("churn_10K");

    let mut allocator = EntityAllocator::new();
    let range = allocator.allocate_range(ENTITY_COUNT);
    let mut packed = PackedComponentTable::<Transform>::new();
    packed.add_range(range, &Transform::default());
    group.bench_function("packed", |b| b.iter(|| churn(&mut packed, &mut allocator)));

    let mut allocator = EntityAllocator::new();
    let range = allocator.allocate_range(ENTITY_COUNT);
    let mut stable = StableComponentTable::<Transform>::new();
    stable.add_range(range, &Transform::default());
    group.bench_function("stable", |b| b.iter(|| churn(&mut stable, &mut allocator)));

    group.finish();
}

/// Benchmark: Sorting rows by component value.
fn bench_sort(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let shuffled: Vec<f32> = (0..ENTITY_COUNT).map(|_| rng.gen_range(0.0..1000.0)).collect();
    let fill = |entity: Entity| Transform {
        position: [shuffled[entity as usize], 0.0, 0.0],
        velocity: [0.0; 3],
    };
    let by_x = |lhs: &Transform, rhs: &Transform| lhs.position[0].total_cmp(&rhs.position[0]);

    let mut group = c.benchmark_group("sort_100K");
    group.sample_size(20);
    group.bench_function("packed", |b| {
        b.iter(|| {
            let mut table = PackedComponentTable::new();
            table.add_range_with(EntityRange::new(0, ENTITY_COUNT), fill);
            table.sort_by(by_x);
            black_box(table.count())
        });
    });
    group.bench_function("stable", |b| {
        b.iter(|| {
            let mut table = StableComponentTable::new();
            table.add_range_with(EntityRange::new(0, ENTITY_COUNT), fill);
            table.sort_by(by_x);
            black_box(table.count())
        });
    });
    group.finish();
}

/// Benchmark: Compacting a stable table after heavy removal.
fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("stable_pack_100K");

    for stride in [2, 16] {
        group.bench_with_input(BenchmarkId::new("every_nth_removed", stride), &stride, |b, &stride| {
            b.iter(|| {
                let mut table = filled::<StableComponentTable<Transform>>(ENTITY_COUNT);
                for entity in (0..ENTITY_COUNT).step_by(stride) {
                    table.remove(entity);
                }
                table.pack();
                black_box(table.count())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_add_range,
    bench_traverse,
    bench_random_get,
    bench_churn,
    bench_sort,
    bench_pack,
);
criterion_main!(benches);
