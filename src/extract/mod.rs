//! Extraction of layout primitives from source documents.
//!
//! Two sources are supported: PDF files, read with [`PdfExtractor`], and
//! JSON manifests produced by any other parser, read with [`load_manifest`].

mod content;
mod detect;
mod images;
mod lines;
mod options;
mod pdf_extractor;
mod tables;

pub use content::{ContentScanner, ImageInvocation, Matrix, PageContent, TextSpan};
pub use detect::{is_pdf, sniff_bytes, sniff_path, PdfHeader};
pub use images::ImageExporter;
pub use lines::{group_into_lines, TextLine};
pub use options::{ErrorMode, ExtractOptions, PageSelection};
pub use pdf_extractor::PdfExtractor;
pub use tables::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::ExtractedDocument;

/// Extract a PDF file with the given options.
pub fn extract_file<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<ExtractedDocument> {
    PdfExtractor::open_with_options(path, options)?.extract()
}

/// Read an extraction manifest.
///
/// Relative image paths are resolved against the manifest's directory.
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<ExtractedDocument> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .map_err(|e| Error::Manifest(format!("{}: {}", path.display(), e)))?;
    let mut doc = ExtractedDocument::from_json(&json)?;

    if let Some(base) = path.parent() {
        for image in &mut doc.images {
            if image.path.is_relative() {
                image.path = base.join(&image.path);
            }
        }
    }

    log::debug!(
        "manifest {}: {} blocks, {} tables, {} images",
        path.display(),
        doc.blocks.len(),
        doc.tables.len(),
        doc.images.len()
    );
    Ok(doc)
}

/// Write an extraction manifest.
pub fn save_manifest<P: AsRef<Path>>(doc: &ExtractedDocument, path: P) -> Result<()> {
    fs::write(path, doc.to_json(true)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_manifest_relative_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(
            &path,
            r#"{"images": [{"page": 1, "bbox": null, "image_file": "img/a.png"},
                           {"page": 1, "bbox": null, "image_file": "/abs/b.png"}]}"#,
        )
        .unwrap();

        let doc = load_manifest(&path).unwrap();
        assert_eq!(doc.images[0].path, dir.path().join("img/a.png"));
        assert_eq!(doc.images[1].path, PathBuf::from("/abs/b.png"));
    }

    #[test]
    fn test_manifest_errors() {
        assert!(matches!(
            load_manifest("/nonexistent/doc.json"),
            Err(Error::Manifest(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_manifest(&path), Err(Error::Manifest(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut doc = ExtractedDocument::new();
        doc.add_page(1, crate::model::PageSize::a4());

        save_manifest(&doc, &path).unwrap();
        assert_eq!(load_manifest(&path).unwrap(), doc);
    }
}
