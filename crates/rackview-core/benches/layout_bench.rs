//! Criterion benchmarks for layout decoding and placement.
//!
//! A device render decodes one document per device plus one per custom
//! shape, so decode and place dominate the cost of a large chassis.
//!
//! Run with:
//! ```bash
//! cargo bench --package rackview-core --bench layout_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rackview_core::{Bounds, LayoutDocument, RenderFrame};

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Builds a chassis layout with `n` slots and a label per slot.
fn chassis_document(n: usize) -> Vec<u8> {
    let mut xml = String::from(r#"<layout width="1000" height="400">"#);
    xml.push_str(
        r#"<shape type="container" x="0" y="0" width="1000" height="400" opaque="true"/>"#,
    );
    for i in 0..n {
        let x = 10 + (i as i32 % 20) * 49;
        let y = 10 + (i as i32 / 20) * 60;
        xml.push_str(&format!(
            r#"<shape type="rectangle" x="{x}" y="{y}" width="45" height="50" name="slot-{i}"
                      isSlot="true" color="-8355712"/>"#
        ));
        xml.push_str(&format!(
            r#"<shape type="label" x="{x}" y="{}" width="45" height="8" label="{i}"
                      fontSize="6"/>"#,
            y + 50
        ));
    }
    xml.push_str("</layout>");
    xml.into_bytes()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_parse");
    for n in [8usize, 64, 256] {
        let bytes = chassis_document(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bytes, |b, bytes| {
            b.iter(|| LayoutDocument::parse(black_box(bytes)))
        });
    }
    group.finish();
}

fn bench_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_place");
    let frame = RenderFrame::fit(Bounds::new(4, 4, 300, 120));
    for n in [8usize, 64, 256] {
        let document = LayoutDocument::parse(&chassis_document(n)).expect("fixture must decode");
        group.bench_with_input(BenchmarkId::from_parameter(n), &document, |b, document| {
            b.iter(|| document.place(black_box(&frame)))
        });
    }
    group.finish();
}

fn bench_to_xml(c: &mut Criterion) {
    let document = LayoutDocument::parse(&chassis_document(64)).expect("fixture must decode");
    c.bench_function("layout_to_xml_64", |b| b.iter(|| black_box(&document).to_xml()));
}

criterion_group!(benches, bench_parse, bench_place, bench_to_xml);
criterion_main!(benches);
