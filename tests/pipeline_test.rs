//! End-to-end tests: extraction, substitution and rebuild.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use repdf::{
    extract_file, load_manifest, save_manifest, CellValue, ExtractOptions, ExtractedDocument,
    FnTransform, FontConfig, IdentityTransform, ImagePrimitive, PageSize, Pipeline,
    PipelineOptions, Rect, Repdf, Result, TablePrimitive, TextPrimitive,
};
use tempfile::TempDir;

/// Two-page PDF: a heading and a 3x3 grid of cells on page 1, a note on page 2.
fn write_source_pdf(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let text_op = |ops: &mut Vec<Operation>, size: i64, x: i64, y: i64, text: &str| {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
        ops.push(Operation::new("ET", vec![]));
    };

    let mut first = Vec::new();
    text_op(&mut first, 14, 72, 740, "Quarterly summary");
    let cells = [["Region", "Units", "Revenue"], ["North", "120", "4800"], ["South", "95", "3900"]];
    for (r, row) in cells.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            text_op(&mut first, 10, 100 + 100 * c as i64, 600 - 15 * r as i64, *text);
        }
    }
    let mut second = Vec::new();
    text_op(&mut second, 12, 72, 700, "Notes follow");

    let mut kids: Vec<Object> = Vec::new();
    for ops in [first, second] {
        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn upper() -> FnTransform<impl Fn(&str, &str) -> Result<String>> {
    FnTransform(|text: &str, _: &str| -> Result<String> { Ok(text.to_uppercase()) })
}

#[test]
fn test_extract_then_prepare() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("source.pdf");
    write_source_pdf(&input);

    let options = ExtractOptions::new().sequential().with_image_dir(dir.path().join("img"));
    let mut doc = extract_file(&input, options).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.tables.len(), 1);
    assert!(doc.blocks.iter().any(|b| b.text == "North"));

    let stats = Pipeline::new(upper()).prepare(&mut doc);

    assert!(stats.suppressed_blocks >= 9);
    assert!(doc.blocks.iter().all(|b| b.text != "NORTH"));
    assert!(doc.blocks.iter().any(|b| b.text == "QUARTERLY SUMMARY"));
    assert!(doc.blocks.iter().any(|b| b.page == 2 && b.text == "NOTES FOLLOW"));
    assert_eq!(doc.tables[0].rows[1][0], CellValue::text("NORTH"));
    assert_eq!(doc.tables[0].column_widths.len(), 3);
}

#[test]
fn test_rebuild_pdf_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("source.pdf");
    let output = dir.path().join("source.hi.pdf");
    write_source_pdf(&input);

    let report = Repdf::new()
        .with_transform(upper())
        .with_fonts(FontConfig::builtin_only())
        .with_image_dir(dir.path().join("img"))
        .sequential()
        .rebuild(&input, &output)
        .unwrap();

    assert_eq!(report.page_count(), 2);
    assert_eq!(report.skipped_count(), 0);
    assert!(report.suppressed_blocks > 0);

    let rebuilt = Document::load(&output).unwrap();
    assert_eq!(rebuilt.get_pages().len(), 2);
}

#[test]
fn test_substitution_keeps_geometry() {
    let mut doc = ExtractedDocument::new();
    doc.add_page(1, PageSize::letter());
    doc.add_block(TextPrimitive::new(1, Rect::new(72.0, 72.0, 200.0, 24.0), "first\nsecond"));
    doc.add_table(TablePrimitive::new(
        1,
        Rect::from_corners(72.0, 300.0, 400.0, 360.0),
        vec![vec!["a".into(), CellValue::Number(1.0)], vec![CellValue::Empty, "b".into()]],
    ));

    let original = doc.clone();
    let pipeline = Pipeline::with_options(IdentityTransform, PipelineOptions::default());
    pipeline.prepare(&mut doc);

    assert_eq!(doc.blocks, original.blocks);
    assert_eq!(doc.tables[0].rows, original.tables[0].rows);
    assert_eq!(doc.tables[0].bbox, original.tables[0].bbox);

    let translated = {
        let mut doc = original.clone();
        Pipeline::new(upper()).prepare(&mut doc);
        doc
    };
    assert_eq!(translated.blocks[0].bbox, original.blocks[0].bbox);
    assert_eq!(translated.blocks[0].text, "FIRST\nSECOND");
    assert_eq!(translated.tables[0].rows[0][1], CellValue::Number(1.0));
    assert_eq!(translated.tables[0].rows[1][0], CellValue::Empty);
}

#[test]
fn test_failing_transform_keeps_source() {
    let dir = TempDir::new().unwrap();
    let mut doc = ExtractedDocument::new();
    doc.add_page(1, PageSize::letter());
    doc.add_block(TextPrimitive::new(1, Rect::new(72.0, 72.0, 200.0, 12.0), "keep me"));

    let failing = FnTransform(|_: &str, _: &str| -> Result<String> {
        Err(repdf::Error::Transform("backend offline".into()))
    });
    let report = Repdf::new()
        .with_transform(failing)
        .with_fonts(FontConfig::builtin_only())
        .rebuild_document(doc, dir.path().join("out.pdf"))
        .unwrap();
    assert_eq!(report.drawn_count(), 1);
}

#[test]
fn test_manifest_rebuild() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("doc.json");
    let logo = dir.path().join("logo.png");
    image::GrayImage::from_pixel(2, 2, image::Luma([90])).save(&logo).unwrap();

    let mut doc = ExtractedDocument::new();
    doc.add_page(1, PageSize::a4());
    doc.add_block(TextPrimitive::new(1, Rect::new(72.0, 72.0, 200.0, 12.0), "Hello"));
    doc.add_image(ImagePrimitive::placed(1, Rect::new(300.0, 72.0, 40.0, 40.0), "logo.png"));
    doc.add_image(ImagePrimitive::unplaced(3, "logo.png"));
    save_manifest(&doc, &manifest).unwrap();

    let loaded = load_manifest(&manifest).unwrap();
    assert_eq!(loaded.images[0].path, logo);

    let output = dir.path().join("out.pdf");
    let report = Repdf::new()
        .with_fonts(FontConfig::builtin_only())
        .rebuild_manifest(&manifest, &output)
        .unwrap();

    assert_eq!(report.page_count(), 3);
    assert_eq!(report.drawn_count(), 3);
    assert_eq!(Document::load(&output).unwrap().get_pages().len(), 3);
}

#[test]
fn test_manifest_column_widths_survive() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("doc.json");
    std::fs::write(
        &manifest,
        r#"{"page_sizes": {"1": [612, 792]},
            "tables": [{"page": 1, "bbox": [100, 100, 300, 160],
                        "data": [["a", "b", "c"]], "col_widths": [80, 40, 80]}]}"#,
    )
    .unwrap();

    let mut doc = load_manifest(&manifest).unwrap();
    Pipeline::new(IdentityTransform).prepare(&mut doc);
    assert_eq!(doc.tables[0].column_widths, vec![80.0, 40.0, 80.0]);

    let plans = repdf::layout::PlacementPlanner::new().plan(&doc).unwrap();
    assert_eq!(plans[0].tables[0].column_widths, vec![80.0, 40.0, 80.0]);
}
