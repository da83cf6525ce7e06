//! Drawing surface abstraction.
//!
//! The renderer only talks to a [`DrawSurface`]. [`PdfSurface`](super::PdfSurface)
//! writes a PDF file; [`RecordingSurface`] keeps the operations in memory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::layout::{PlannedLine, PlannedTable, PlannedText};
use crate::model::{CanvasRect, PageSize};

/// A canvas that pages are drawn onto, one at a time.
///
/// All coordinates are in canvas space (bottom-left origin). Between
/// `finish_page` and the next `begin_page` no page is open and draw calls
/// must fail. A draw call that fails leaves the page as it was.
pub trait DrawSurface {
    /// Open a new page.
    fn begin_page(&mut self, size: PageSize) -> Result<()>;

    /// Draw the image file stretched into `rect`.
    fn draw_image(&mut self, path: &Path, rect: CanvasRect) -> Result<()>;

    /// Draw one line of text with its baseline starting at `(x, y)`.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32) -> Result<()>;

    /// Draw every line of a text block, or none of them.
    fn draw_block(&mut self, block: &PlannedText) -> Result<()>;

    /// Draw a table grid and its cell text, or nothing.
    fn draw_table(&mut self, table: &PlannedTable) -> Result<()>;

    /// Seal the open page.
    fn finish_page(&mut self) -> Result<()>;

    /// Write everything to `path`, replacing any existing file.
    fn save(&mut self, path: &Path) -> Result<()>;
}

/// Reject baselines and sizes that cannot be written to a content stream.
pub(crate) fn check_text_position(x: f32, y: f32, font_size: f32) -> Result<()> {
    if x.is_finite() && y.is_finite() && font_size.is_finite() && font_size > 0.0 {
        Ok(())
    } else {
        Err(Error::MalformedGeometry(format!(
            "text at ({}, {}) with size {}",
            x, y, font_size
        )))
    }
}

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    /// `begin_page`
    BeginPage(PageSize),
    /// `draw_image`
    Image {
        /// Image file
        path: PathBuf,
        /// Target rect
        rect: CanvasRect,
    },
    /// `draw_text`
    Text {
        /// Text
        text: String,
        /// Baseline x
        x: f32,
        /// Baseline y
        y: f32,
        /// Font size
        font_size: f32,
    },
    /// `draw_table`
    Table(PlannedTable),
    /// `finish_page`
    FinishPage,
    /// `save`
    Save(PathBuf),
}

/// In-memory surface for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<SurfaceOp>,
    page_open: bool,
    check_images: bool,
}

impl RecordingSurface {
    /// Create an empty recording surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail image draws whose file does not exist, like a real surface would.
    pub fn with_image_check(mut self) -> Self {
        self.check_images = true;
        self
    }

    /// Recorded operations in call order.
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Number of pages begun.
    pub fn page_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SurfaceOp::BeginPage(_)))
            .count()
    }

    /// Operations between the `index`-th (0-based) `BeginPage` and its `FinishPage`.
    pub fn page_ops(&self, index: usize) -> Vec<&SurfaceOp> {
        self.ops
            .split(|op| matches!(op, SurfaceOp::BeginPage(_)))
            .nth(index + 1)
            .map(|ops| {
                ops.iter()
                    .take_while(|op| !matches!(op, SurfaceOp::FinishPage))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every text line drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn require_page(&self) -> Result<()> {
        if self.page_open {
            Ok(())
        } else {
            Err(Error::Other("no open page".into()))
        }
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_page(&mut self, size: PageSize) -> Result<()> {
        if self.page_open {
            return Err(Error::Other("previous page not finished".into()));
        }
        self.page_open = true;
        self.ops.push(SurfaceOp::BeginPage(size));
        Ok(())
    }

    fn draw_image(&mut self, path: &Path, rect: CanvasRect) -> Result<()> {
        self.require_page()?;
        if self.check_images && !path.is_file() {
            return Err(Error::AssetIo {
                path: path.to_path_buf(),
                reason: "file not found".into(),
            });
        }
        self.ops.push(SurfaceOp::Image {
            path: path.to_path_buf(),
            rect,
        });
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32) -> Result<()> {
        self.require_page()?;
        check_text_position(x, y, font_size)?;
        self.ops.push(SurfaceOp::Text {
            text: text.to_string(),
            x,
            y,
            font_size,
        });
        Ok(())
    }

    fn draw_block(&mut self, block: &PlannedText) -> Result<()> {
        self.require_page()?;
        check_lines(&block.lines, block.font_size)?;
        self.ops.extend(block.lines.iter().map(|line| SurfaceOp::Text {
            text: line.text.clone(),
            x: line.x,
            y: line.y,
            font_size: block.font_size,
        }));
        Ok(())
    }

    fn draw_table(&mut self, table: &PlannedTable) -> Result<()> {
        self.require_page()?;
        check_lines(&table.cell_lines(), table.font_size)?;
        self.ops.push(SurfaceOp::Table(table.clone()));
        Ok(())
    }

    fn finish_page(&mut self) -> Result<()> {
        self.require_page()?;
        self.page_open = false;
        self.ops.push(SurfaceOp::FinishPage);
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        if self.page_open {
            return Err(Error::Other("cannot save with an open page".into()));
        }
        self.ops.push(SurfaceOp::Save(path.to_path_buf()));
        Ok(())
    }
}

fn check_lines(lines: &[PlannedLine], font_size: f32) -> Result<()> {
    lines
        .iter()
        .try_for_each(|line| check_text_position(line.x, line.y, font_size))
}
