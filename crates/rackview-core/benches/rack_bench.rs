//! Criterion benchmarks for [`RackAllocator`] fit checks and placement.
//!
//! Run with:
//! ```bash
//! cargo bench --package rackview-core --bench rack_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rackview_core::{AttributeValue, ModelObject, RackAllocator, RackGeometry};

fn equipment(id: usize, position: i64, span: i64) -> ModelObject {
    ModelObject::new(format!("eq-{id}"), "Router", format!("R{id}"))
        .with_attribute("position", AttributeValue::Integer(position))
        .with_attribute("rackUnits", AttributeValue::Integer(span))
}

/// A 42-unit rack filled with 2-unit equipment on every odd position.
fn full_rack() -> (RackAllocator, Vec<ModelObject>) {
    let mut rack = RackAllocator::new(42, true, RackGeometry::default());
    let items: Vec<_> = (0..21).map(|i| equipment(i, 1 + 2 * i as i64, 2)).collect();
    for item in &items {
        rack.add_equipment(item).expect("fixture must fit");
    }
    (rack, items)
}

fn bench_is_rackable(c: &mut Criterion) {
    let (rack, _) = full_rack();
    let candidate = equipment(99, 41, 2);
    c.bench_function("is_rackable_full_rack", |b| {
        b.iter(|| rack.is_rackable(black_box(&candidate), None))
    });
}

fn bench_add_free_cycle(c: &mut Criterion) {
    let mut rack = RackAllocator::new(42, false, RackGeometry::default());
    let item = equipment(0, 20, 4);
    c.bench_function("add_free_cycle", |b| {
        b.iter(|| {
            let placed = rack.add_equipment(black_box(&item));
            let freed = rack.free_equipment_rack_units(&item.id);
            (placed.is_ok(), freed.is_ok())
        })
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let (rack, _) = full_rack();
    c.bench_function("snapshot_full_rack", |b| b.iter(|| black_box(&rack).snapshot()));
}

fn bench_audit(c: &mut Criterion) {
    let (rack, items) = full_rack();
    let empty = RackAllocator::new(rack.rack_units(), rack.is_ascending(), rack.geometry());
    c.bench_function("audit_21_items", |b| b.iter(|| empty.audit(black_box(&items))));
}

criterion_group!(benches, bench_is_rackable, bench_add_free_cycle, bench_snapshot, bench_audit);
criterion_main!(benches);
