//! Integration tests for rack-unit allocation.
//!
//! Exercises [`RackAllocator`] through the public API with equipment objects
//! shaped the way the inventory reports them.

use rackview_core::{AttributeValue, Fit, ModelObject, RackAllocator, RackGeometry};

fn equipment(id: &str, position: i64, span: i64) -> ModelObject {
    ModelObject::new(id, "Router", id)
        .with_attribute("position", AttributeValue::Integer(position))
        .with_attribute("rackUnits", AttributeValue::Integer(span))
}

fn spans_overlap(a: (i64, i64), b: (i64, i64)) -> bool {
    let (a_start, a_end) = (a.0, a.0 + a.1);
    let (b_start, b_end) = (b.0, b.0 + b.1);
    a_start < b_end && b_start < a_end
}

#[test]
fn test_four_unit_rack_example() {
    let mut rack = RackAllocator::new(4, true, RackGeometry::default());
    rack.add_equipment(&equipment("a", 1, 2)).expect("fits in an empty rack");

    assert!(!rack.is_rackable(&equipment("b", 2, 1), None));
    assert!(rack.is_rackable(&equipment("c", 3, 2), None));
}

#[test]
fn test_rackable_equipment_never_overlaps_placed_equipment() {
    const UNITS: i64 = 8;
    for a_pos in 1..=UNITS {
        for a_span in 1..=(UNITS - a_pos + 1) {
            let mut rack = RackAllocator::new(UNITS as u32, true, RackGeometry::default());
            rack.add_equipment(&equipment("a", a_pos, a_span)).expect("a fits");

            for b_pos in 1..=UNITS {
                for b_span in 1..=UNITS {
                    let b = equipment("b", b_pos, b_span);
                    if rack.is_rackable(&b, None) {
                        assert!(
                            !spans_overlap((a_pos, a_span), (b_pos, b_span)),
                            "a={a_pos}+{a_span} b={b_pos}+{b_span}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_ascending_and_descending_numbering_mirror_each_other() {
    let mut ascending = RackAllocator::new(42, true, RackGeometry::default());
    let mut descending = RackAllocator::new(42, false, RackGeometry::default());

    let top_asc = ascending.add_equipment(&equipment("e", 1, 1)).unwrap().unwrap();
    let top_desc = descending.add_equipment(&equipment("e", 42, 1)).unwrap().unwrap();

    assert_eq!(top_asc.draw_row, top_desc.draw_row);
    assert_eq!(top_asc.y, top_desc.y);
}

#[test]
fn test_multi_unit_equipment_mirrors_across_numbering() {
    for span in 1..=4u32 {
        for position in 1..=(42 - span + 1) {
            let asc = RackAllocator::new(42, true, RackGeometry::default());
            let desc = RackAllocator::new(42, false, RackGeometry::default());
            let mirrored = 44 - position - span;

            assert_eq!(asc.draw_row(position, span), desc.draw_row(mirrored, span));
        }
    }
}

#[test]
fn test_add_free_then_rackable_again() {
    let mut rack = RackAllocator::new(12, true, RackGeometry::default());
    let e = equipment("e", 5, 3);

    rack.add_equipment(&e).expect("fits");
    rack.free_equipment_rack_units("e").expect("placed");

    assert!(rack.is_rackable(&e, None));
    assert!(rack.units().iter().all(|u| u.available));
    assert_eq!(rack.rack_units_counter(), 0);
}

#[test]
fn test_move_within_own_footprint() {
    let mut rack = RackAllocator::new(10, true, RackGeometry::default());
    let e = equipment("e", 4, 4);
    rack.add_equipment(&e).expect("fits");

    assert_eq!(rack.can_be_moved(&e, 5), Ok(Fit::Fits { position: 5, span: 4 }));
    let moved = rack.move_equipment(&e, 5).expect("move succeeds").expect("still placed");

    assert_eq!(moved.position, 5);
    assert!(rack.unit(4).is_some_and(|u| u.available));
    assert!(rack.unit(8).is_some_and(|u| !u.available));
}

#[test]
fn test_snapshot_reports_units_and_placements() {
    let mut rack = RackAllocator::new(6, false, RackGeometry::default());
    rack.add_equipment(&equipment("a", 1, 2)).expect("fits");
    rack.add_equipment(&equipment("b", 0, 2)).expect("unplaced is fine");

    let snapshot = rack.snapshot();

    assert_eq!(snapshot.units.len(), 6);
    assert_eq!(snapshot.placements.len(), 1);
    assert_eq!(snapshot.placements[0].draw_row, 4);
    assert_eq!(snapshot.used_units, 2);
    assert_eq!(snapshot.height, 6 * 20 + 5 * 2);
}
