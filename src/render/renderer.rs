//! Page-by-page replay of placement plans onto a surface.

use std::path::Path;

use super::options::RenderOptions;
use super::pdf_surface::PdfSurface;
use super::result::{DrawOutcome, PageOutcome, RenderReport};
use super::surface::DrawSurface;
use crate::error::Result;
use crate::font::FontResolution;
use crate::layout::{PagePlan, PlacementPlanner, PrimitiveKind};
use crate::model::ExtractedDocument;

/// Draws resolved documents onto a [`DrawSurface`].
#[derive(Debug, Clone, Default)]
pub struct CanvasRenderer {
    options: RenderOptions,
}

impl CanvasRenderer {
    /// Create a renderer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a renderer with custom options.
    pub fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    /// The active options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Plan and draw every page of `doc`.
    ///
    /// Pages are emitted from 1 to the highest page index seen, empty ones
    /// included. Only surface lifecycle failures and [`Error::NoPages`](crate::Error::NoPages)
    /// abort; a primitive that cannot be drawn is recorded as skipped.
    pub fn render<S: DrawSurface>(
        &self,
        doc: &ExtractedDocument,
        surface: &mut S,
        report: &mut RenderReport,
    ) -> Result<()> {
        let planner = PlacementPlanner::with_options(self.options.placement.clone());
        let plans = planner.plan(doc)?;
        log::info!("Rendering {} pages", plans.len());

        for plan in &plans {
            let outcome = self.render_page(plan, surface)?;
            if outcome.skipped_count() > 0 {
                log::debug!(
                    "page {}: {} drawn, {} skipped",
                    outcome.page,
                    outcome.drawn_count(),
                    outcome.skipped_count()
                );
            }
            report.pages.push(outcome);
        }
        Ok(())
    }

    /// Draw one page: images, then tables, then text, then seal it.
    pub fn render_page<S: DrawSurface>(&self, plan: &PagePlan, surface: &mut S) -> Result<PageOutcome> {
        let mut outcome = PageOutcome::new(plan.page, plan.size);
        outcome.record_plan_skips(&plan.skipped);

        surface.begin_page(plan.size)?;

        for image in &plan.images {
            let result = match surface.draw_image(&image.path, image.rect) {
                Ok(()) => DrawOutcome::Drawn,
                Err(e) => {
                    log::warn!("Skipping image on page {}: {}", plan.page, e);
                    DrawOutcome::Skipped(e.to_string())
                }
            };
            outcome.record(PrimitiveKind::Image, result);
        }

        for table in &plan.tables {
            let result = match surface.draw_table(table) {
                Ok(()) => DrawOutcome::Drawn,
                Err(e) => {
                    log::warn!("Skipping table on page {}: {}", plan.page, e);
                    DrawOutcome::Skipped(e.to_string())
                }
            };
            outcome.record(PrimitiveKind::Table, result);
        }

        for text in &plan.texts {
            let result = match surface.draw_block(text) {
                Ok(()) => DrawOutcome::Drawn,
                Err(e) => {
                    log::warn!("Skipping text on page {}: {}", plan.page, e);
                    DrawOutcome::Skipped(e.to_string())
                }
            };
            outcome.record(PrimitiveKind::Text, result);
        }

        surface.finish_page()?;
        Ok(outcome)
    }

    /// Render `doc` to a PDF file at `path` using the resolved font.
    pub fn render_to_file(
        &self,
        doc: &ExtractedDocument,
        font: &FontResolution,
        path: &Path,
    ) -> Result<RenderReport> {
        let mut report = RenderReport::new(font.font().name(), font.state());
        let mut surface = PdfSurface::new(font.font().clone(), &self.options);

        self.render(doc, &mut surface, &mut report)?;
        surface.save(path)?;

        report.output = Some(path.to_path_buf());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontState;
    use crate::model::{ImagePrimitive, PageSize, Rect, TablePrimitive, TextPrimitive};
    use crate::render::{RecordingSurface, SurfaceOp};

    fn report() -> RenderReport {
        RenderReport::new("Helvetica", FontState::Fallback)
    }

    #[test]
    fn test_draw_order_per_page() {
        let mut doc = ExtractedDocument::new();
        doc.add_page(1, PageSize::letter());
        doc.add_block(TextPrimitive::new(1, Rect::new(10.0, 10.0, 100.0, 12.0), "text"));
        doc.add_table(TablePrimitive::new(
            1,
            Rect::from_corners(100.0, 300.0, 200.0, 340.0),
            vec![vec!["cell".into()]],
        ));
        doc.add_image(ImagePrimitive::unplaced(1, "img.png"));

        let mut surface = RecordingSurface::new();
        let mut report = report();
        CanvasRenderer::new()
            .render(&doc, &mut surface, &mut report)
            .unwrap();

        let ops = surface.page_ops(0);
        assert!(matches!(ops[0], SurfaceOp::Image { .. }));
        assert!(matches!(ops[1], SurfaceOp::Table(_)));
        assert!(matches!(ops[2], SurfaceOp::Text { .. }));
        assert_eq!(report.drawn_count(), 3);
    }

    #[test]
    fn test_failed_image_does_not_abort() {
        let mut doc = ExtractedDocument::new();
        doc.add_page(1, PageSize::letter());
        doc.add_image(ImagePrimitive::unplaced(1, "/nonexistent/a.png"));
        doc.add_block(TextPrimitive::new(1, Rect::new(10.0, 10.0, 100.0, 12.0), "still here"));
        doc.add_block(TextPrimitive::new(2, Rect::new(10.0, 10.0, 100.0, 12.0), "next page"));

        let mut surface = RecordingSurface::new().with_image_check();
        let mut report = report();
        CanvasRenderer::new()
            .render(&doc, &mut surface, &mut report)
            .unwrap();

        assert_eq!(surface.texts(), vec!["still here", "next page"]);
        assert_eq!(report.skipped_count(), 1);
        let skips: Vec<_> = report.skips().collect();
        assert_eq!(skips[0].0, 1);
        assert_eq!(skips[0].1, PrimitiveKind::Image);
    }

    #[test]
    fn test_every_page_sealed() {
        let mut doc = ExtractedDocument::new();
        doc.add_block(TextPrimitive::new(3, Rect::new(10.0, 10.0, 100.0, 12.0), "third"));

        let mut surface = RecordingSurface::new();
        let mut report = report();
        CanvasRenderer::new()
            .render(&doc, &mut surface, &mut report)
            .unwrap();

        let begins = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::BeginPage(_)))
            .count();
        let finishes = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::FinishPage))
            .count();
        assert_eq!(begins, 3);
        assert_eq!(finishes, 3);
        assert_eq!(report.page_count(), 3);
    }

    #[test]
    fn test_bad_line_skips_whole_block() {
        use crate::layout::{PlannedLine, PlannedText};

        let line = |text: &str, y: f32| PlannedLine {
            text: text.to_string(),
            x: 72.0,
            y,
        };
        let plan = PagePlan {
            page: 1,
            size: PageSize::letter(),
            images: Vec::new(),
            tables: Vec::new(),
            texts: vec![
                PlannedText {
                    lines: vec![line("kept", 700.0)],
                    font_size: 9.0,
                },
                PlannedText {
                    lines: vec![line("half", 650.0), line("broken", f32::NAN)],
                    font_size: 9.0,
                },
                PlannedText {
                    lines: vec![line("after", 600.0)],
                    font_size: 9.0,
                },
            ],
            skipped: Vec::new(),
        };

        let mut surface = RecordingSurface::new();
        let outcome = CanvasRenderer::new().render_page(&plan, &mut surface).unwrap();

        assert_eq!(surface.texts(), vec!["kept", "after"]);
        assert_eq!(outcome.drawn_count(), 2);
        assert_eq!(outcome.skipped_count(), 1);
    }
}
