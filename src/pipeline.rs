//! End-to-end rebuild: extract, resolve, substitute, render.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::extract::{self, ExtractOptions, PageSelection};
use crate::font::{FontConfig, FontResolution};
use crate::layout::{apply_column_grid, OverlapPolicy, OverlapResolver};
use crate::model::ExtractedDocument;
use crate::render::{CanvasRenderer, RenderOptions, RenderReport};
use crate::transform::{
    substitute_blocks, substitute_tables, ContentTransform, IdentityTransform, SubstitutionStats,
};

/// Default target language code.
pub const DEFAULT_TARGET: &str = "hi";

/// Settings shared by every stage of a rebuild.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Target passed to the content transform
    pub target: String,
    /// When free text counts as duplicated by a table
    pub overlap: OverlapPolicy,
    /// Extraction settings
    pub extract: ExtractOptions,
    /// Font fallback chain
    pub fonts: FontConfig,
    /// Output settings
    pub render: RenderOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            overlap: OverlapPolicy::default(),
            extract: ExtractOptions::default(),
            fonts: FontConfig::default(),
            render: RenderOptions::default(),
        }
    }
}

/// What the resolve and substitute stages did to a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareStats {
    /// Text blocks removed as table duplicates
    pub suppressed_blocks: usize,
    /// Substitution counters for text blocks
    pub blocks: SubstitutionStats,
    /// Substitution counters for tables
    pub tables: SubstitutionStats,
}

/// A configured rebuild pipeline around one content transform.
pub struct Pipeline<T> {
    options: PipelineOptions,
    transform: T,
}

impl<T: ContentTransform> Pipeline<T> {
    /// Create a pipeline with default options.
    pub fn new(transform: T) -> Self {
        Self::with_options(transform, PipelineOptions::default())
    }

    /// Create a pipeline with custom options.
    pub fn with_options(transform: T, options: PipelineOptions) -> Self {
        Self { options, transform }
    }

    /// The active options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Resolve overlaps, infer column grids and substitute content in place.
    pub fn prepare(&self, doc: &mut ExtractedDocument) -> PrepareStats {
        let resolver = OverlapResolver::with_policy(self.options.overlap);
        let suppressed_blocks = resolver.resolve(&mut doc.blocks, &doc.tables);

        apply_column_grid(&mut doc.tables);

        let target = &self.options.target;
        let blocks = substitute_blocks(&self.transform, &mut doc.blocks, target);
        let tables = substitute_tables(&self.transform, &mut doc.tables, target);
        log::info!(
            "substituted {} blocks and {} tables ({} kept source content)",
            blocks.replaced,
            tables.replaced,
            blocks.failed + tables.failed
        );

        PrepareStats {
            suppressed_blocks,
            blocks,
            tables,
        }
    }

    /// Rebuild an already extracted document into `output`.
    pub fn rebuild(&self, mut doc: ExtractedDocument, output: &Path) -> Result<RenderReport> {
        let stats = self.prepare(&mut doc);

        let font = FontResolution::resolve(&self.options.fonts);
        let renderer = CanvasRenderer::with_options(self.options.render.clone());
        let mut report = renderer.render_to_file(&doc, &font, output)?;
        report.suppressed_blocks = stats.suppressed_blocks;

        log::info!(
            "wrote {} ({} pages, {} drawn, {} skipped)",
            output.display(),
            report.page_count(),
            report.drawn_count(),
            report.skipped_count()
        );
        Ok(report)
    }

    /// Extract a PDF and rebuild it into `output`.
    pub fn rebuild_file(&self, input: &Path, output: &Path) -> Result<RenderReport> {
        let doc = extract::extract_file(input, self.options.extract.clone())?;
        self.rebuild(doc, output)
    }

    /// Load a JSON manifest and rebuild it into `output`.
    pub fn rebuild_manifest(&self, manifest: &Path, output: &Path) -> Result<RenderReport> {
        let doc = extract::load_manifest(manifest)?;
        self.rebuild(doc, output)
    }
}

/// Boxed transform used by [`Repdf`].
pub type BoxedTransform = Box<dyn ContentTransform + Send + Sync>;

/// Builder for rebuilding documents.
///
/// # Example
///
/// ```no_run
/// use repdf::Repdf;
///
/// let report = Repdf::new()
///     .with_target("hi")
///     .with_image_dir("./images")
///     .lenient()
///     .rebuild("input.pdf", "output.pdf")?;
/// println!("{} pages", report.page_count());
/// # Ok::<(), repdf::Error>(())
/// ```
pub struct Repdf {
    options: PipelineOptions,
    transform: BoxedTransform,
}

impl Repdf {
    /// Create a builder that keeps the source text.
    pub fn new() -> Self {
        Self {
            options: PipelineOptions::default(),
            transform: Box::new(IdentityTransform),
        }
    }

    /// Set the content transform.
    pub fn with_transform<T>(mut self, transform: T) -> Self
    where
        T: ContentTransform + Send + Sync + 'static,
    {
        self.transform = Box::new(transform);
        self
    }

    /// Set the target language.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.options.target = target.into();
        self
    }

    /// Set the overlap policy.
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.options.overlap = policy;
        self
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.options.extract = options;
        self
    }

    /// Set render options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.options.render = options;
        self
    }

    /// Set the font fallback chain.
    pub fn with_fonts(mut self, fonts: FontConfig) -> Self {
        self.options.fonts = fonts;
        self
    }

    /// Skip failing pages during extraction.
    pub fn lenient(mut self) -> Self {
        self.options.extract = self.options.extract.lenient();
        self
    }

    /// Disable parallel extraction.
    pub fn sequential(mut self) -> Self {
        self.options.extract = self.options.extract.sequential();
        self
    }

    /// Directory extracted images are written to.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.extract = self.options.extract.with_image_dir(dir);
        self
    }

    /// Restrict extraction to some pages.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options.extract = self.options.extract.with_pages(pages);
        self
    }

    /// The collected options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Finish building.
    pub fn build(self) -> Pipeline<BoxedTransform> {
        Pipeline::with_options(self.transform, self.options)
    }

    /// Extract and rebuild a PDF file.
    pub fn rebuild<P: AsRef<Path>, Q: AsRef<Path>>(self, input: P, output: Q) -> Result<RenderReport> {
        self.build().rebuild_file(input.as_ref(), output.as_ref())
    }

    /// Rebuild from a JSON manifest.
    pub fn rebuild_manifest<P: AsRef<Path>, Q: AsRef<Path>>(
        self,
        manifest: P,
        output: Q,
    ) -> Result<RenderReport> {
        self.build().rebuild_manifest(manifest.as_ref(), output.as_ref())
    }

    /// Rebuild an in-memory document.
    pub fn rebuild_document<Q: AsRef<Path>>(self, doc: ExtractedDocument, output: Q) -> Result<RenderReport> {
        self.build().rebuild(doc, output.as_ref())
    }

    /// Run [`Repdf::rebuild`] on the blocking thread pool.
    #[cfg(feature = "async")]
    pub async fn rebuild_async(self, input: PathBuf, output: PathBuf) -> Result<RenderReport> {
        tokio::task::spawn_blocking(move || self.rebuild(input, output))
            .await
            .map_err(|e| crate::Error::Other(format!("rebuild task failed: {}", e)))?
    }
}

impl Default for Repdf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{CellGeometry, CellValue, PageSize, Rect, TablePrimitive, TextPrimitive};
    use crate::transform::FnTransform;

    fn table_doc() -> ExtractedDocument {
        let mut doc = ExtractedDocument::new();
        doc.add_page(1, PageSize::letter());
        doc.add_table(
            TablePrimitive::new(
                1,
                Rect::from_corners(100.0, 100.0, 300.0, 160.0),
                vec![vec!["a".into(), "b".into(), "c".into()]],
            )
            .with_cells(vec![
                CellGeometry::keyed(100.0, 180.0),
                CellGeometry::keyed(180.0, 220.0),
                CellGeometry::keyed(220.0, 300.0),
            ]),
        );
        doc.add_block(TextPrimitive::new(1, Rect::new(110.0, 110.0, 50.0, 10.0), "inside"));
        doc.add_block(TextPrimitive::new(1, Rect::new(72.0, 400.0, 50.0, 10.0), "outside"));
        doc
    }

    #[test]
    fn test_prepare_stages() {
        let pipeline = Pipeline::new(FnTransform(|t: &str, _: &str| -> Result<String> {
            Ok(t.to_uppercase())
        }));
        let mut doc = table_doc();
        let stats = pipeline.prepare(&mut doc);

        assert_eq!(stats.suppressed_blocks, 1);
        assert_eq!(stats.blocks.replaced, 1);
        assert_eq!(stats.tables.replaced, 1);
        assert_eq!(doc.blocks[0].text, "OUTSIDE");
        assert_eq!(doc.tables[0].column_widths, vec![80.0, 40.0, 80.0]);
        assert_eq!(doc.tables[0].rows[0][2], CellValue::text("C"));
    }

    #[test]
    fn test_rebuild_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");
        let report = Repdf::new()
            .with_fonts(FontConfig::builtin_only())
            .rebuild_document(table_doc(), &output)
            .unwrap();

        assert!(output.exists());
        assert_eq!(report.output.as_deref(), Some(output.as_path()));
        assert_eq!(report.page_count(), 1);
        assert_eq!(report.suppressed_blocks, 1);
    }

    #[test]
    fn test_empty_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Repdf::new()
            .with_fonts(FontConfig::builtin_only())
            .rebuild_document(ExtractedDocument::new(), dir.path().join("x.pdf"));
        assert!(matches!(result, Err(Error::NoPages)));
    }

    #[test]
    fn test_builder_options() {
        let builder = Repdf::new()
            .with_target("fr")
            .lenient()
            .sequential()
            .with_overlap_policy(OverlapPolicy::MinCoverage(0.5));
        let options = builder.options();
        assert_eq!(options.target, "fr");
        assert!(!options.extract.parallel);
        assert_eq!(options.overlap, OverlapPolicy::MinCoverage(0.5));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_rebuild_async_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = Repdf::new()
            .rebuild_async(dir.path().join("missing.pdf"), dir.path().join("out.pdf"))
            .await;
        assert!(result.is_err());
    }
}
