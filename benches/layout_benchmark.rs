//! Benchmarks for layout resolution and rendering.
//!
//! Run with: cargo bench
//!
//! Documents are synthetic: each page carries a few tables, the text lines
//! duplicating their cells, and free text around them.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use repdf::layout::{apply_column_grid, OverlapResolver, PlacementPlanner};
use repdf::render::{CanvasRenderer, RecordingSurface, RenderReport};
use repdf::{
    CellGeometry, CellValue, ExtractedDocument, FontState, PageSize, Rect, TablePrimitive, TextPrimitive,
};

/// Build a document with `pages` pages, three 4x3 tables per page.
fn create_document(pages: u32) -> ExtractedDocument {
    let mut doc = ExtractedDocument::new();

    for page in 1..=pages {
        doc.add_page(page, PageSize::letter());

        for t in 0..3 {
            let top = 100.0 + t as f32 * 200.0;
            let rows: Vec<Vec<CellValue>> = (0..4)
                .map(|r| (0..3).map(|c| CellValue::text(format!("cell {} {}", r, c))).collect())
                .collect();
            let cells: Vec<CellGeometry> = (0..4)
                .flat_map(|_| {
                    [
                        CellGeometry::keyed(72.0, 200.0),
                        CellGeometry::keyed(200.0, 330.0),
                        CellGeometry::keyed(330.0, 540.0),
                    ]
                })
                .collect();
            doc.add_table(
                TablePrimitive::new(page, Rect::from_corners(72.0, top, 540.0, top + 60.0), rows)
                    .with_cells(cells),
            );

            for r in 0..4 {
                let y = top + 2.0 + r as f32 * 15.0;
                doc.add_block(TextPrimitive::new(page, Rect::new(80.0, y, 100.0, 10.0), "cell"));
            }
        }

        for line in 0..20 {
            let y = 40.0 + line as f32 * 36.0;
            doc.add_block(TextPrimitive::new(
                page,
                Rect::new(560.0, y, 40.0, 10.0),
                format!("margin note {}", line),
            ));
        }
    }

    doc
}

/// Benchmark overlap resolution and grid inference.
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for pages in [1, 10, 50].iter() {
        let doc = create_document(*pages);

        group.bench_function(format!("{}_pages", pages), |b| {
            b.iter(|| {
                let mut doc = doc.clone();
                OverlapResolver::new().resolve(&mut doc.blocks, &doc.tables);
                apply_column_grid(&mut doc.tables);
                black_box(doc)
            });
        });
    }

    group.finish();
}

/// Benchmark page planning.
fn bench_plan(c: &mut Criterion) {
    let doc = create_document(20);
    let planner = PlacementPlanner::new();

    c.bench_function("plan_20_pages", |b| {
        b.iter(|| planner.plan(black_box(&doc)).unwrap());
    });
}

/// Benchmark the full draw loop against an in-memory surface.
fn bench_render(c: &mut Criterion) {
    let doc = create_document(20);
    let renderer = CanvasRenderer::new();

    c.bench_function("render_20_pages", |b| {
        b.iter(|| {
            let mut surface = RecordingSurface::new();
            let mut report = RenderReport::new("Helvetica", FontState::Fallback);
            renderer
                .render(black_box(&doc), &mut surface, &mut report)
                .unwrap();
            report
        });
    });
}

criterion_group!(benches, bench_resolve, bench_plan, bench_render);
criterion_main!(benches);
