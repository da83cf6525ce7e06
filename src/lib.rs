//! # repdf
//!
//! Layout-preserving PDF reconstruction with substituted content.
//!
//! This library takes the text lines, tables and images of a source
//! document, replaces their text (typically with a translation) and draws
//! everything back onto fresh pages of the same size, at the same places.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repdf::{FnTransform, Repdf};
//!
//! fn main() -> repdf::Result<()> {
//!     let shout = FnTransform(|text: &str, _target: &str| -> repdf::Result<String> {
//!         Ok(text.to_uppercase())
//!     });
//!
//!     let report = Repdf::new()
//!         .with_transform(shout)
//!         .rebuild("document.pdf", "document.rebuilt.pdf")?;
//!     println!("{} pages, {} skipped draws", report.page_count(), report.skipped_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - **Extraction** ([`extract`]): text lines, stream-mode tables and image
//!   XObjects from a PDF, or a JSON manifest from any other parser
//! - **Overlap resolution** ([`layout::OverlapResolver`]): text lines inside a
//!   table box are dropped so table content is drawn once
//! - **Grid inference** ([`layout::apply_column_grid`]): column widths from cell edges
//! - **Substitution** ([`transform`]): text replaced, boxes untouched
//! - **Rendering** ([`render`]): pages planned and drawn with a font fallback chain

pub mod error;
pub mod extract;
pub mod font;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod transform;

// Re-export commonly used types
pub use error::{Error, Result};
pub use extract::{
    extract_file, is_pdf, load_manifest, save_manifest, ErrorMode, ExtractOptions, PageSelection,
    PdfExtractor,
};
pub use font::{FontConfig, FontResolution, FontState, ResolvedFont};
pub use layout::{OverlapPolicy, OverlapResolver, PlacementOptions, PlacementPlanner};
pub use model::{
    CanvasRect, CellGeometry, CellValue, ExtractedDocument, ImagePrimitive, PageSize, Rect,
    TablePrimitive, TextPrimitive,
};
pub use pipeline::{Pipeline, PipelineOptions, PrepareStats, Repdf};
pub use render::{CanvasRenderer, DrawOutcome, RenderOptions, RenderReport};
pub use transform::{ContentTransform, FnTransform, IdentityTransform};

use std::path::Path;

/// Extract a PDF and rebuild it unchanged, with default settings.
///
/// # Example
///
/// ```no_run
/// let report = repdf::rebuild_file("document.pdf", "copy.pdf").unwrap();
/// assert!(report.output.is_some());
/// ```
pub fn rebuild_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<RenderReport> {
    Repdf::new().rebuild(input, output)
}

/// Rebuild a document with a content transform, writing to `output`.
///
/// # Example
///
/// ```no_run
/// use repdf::{rebuild_with, load_manifest, IdentityTransform};
///
/// let doc = load_manifest("document.json").unwrap();
/// rebuild_with(doc, &IdentityTransform, "hi", "out.pdf").unwrap();
/// ```
pub fn rebuild_with<T, Q>(
    doc: ExtractedDocument,
    transform: &T,
    target: &str,
    output: Q,
) -> Result<RenderReport>
where
    T: ContentTransform + ?Sized,
    Q: AsRef<Path>,
{
    let options = PipelineOptions {
        target: target.to_string(),
        ..PipelineOptions::default()
    };
    Pipeline::with_options(transform, options).rebuild(doc, output.as_ref())
}

/// Render a JSON manifest as-is.
pub fn render_manifest<P: AsRef<Path>, Q: AsRef<Path>>(manifest: P, output: Q) -> Result<RenderReport> {
    Repdf::new().rebuild_manifest(manifest, output)
}
