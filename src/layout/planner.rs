//! Final draw geometry for every primitive, page by page.
//!
//! This is the only place where extraction-space boxes are converted to
//! canvas space. The produced [`PagePlan`]s are plain data; the renderer
//! replays them against a drawing surface.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::model::{
    CanvasRect, ExtractedDocument, ImagePrimitive, PageSize, TablePrimitive, TextPrimitive,
};

/// Placement constants.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOptions {
    /// Font size of free text lines
    pub text_font_size: f32,

    /// Vertical advance between free text lines
    pub line_step: f32,

    /// Font size of table cells
    pub table_font_size: f32,

    /// Inner padding of table cells
    pub cell_padding: f32,

    /// Stroke width of table grid lines
    pub grid_line_width: f32,

    /// Distance of the fallback image slot from the right and top page edges
    pub fallback_image_inset: f32,

    /// Size `(width, height)` of the fallback image slot
    pub fallback_image_size: (f32, f32),
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            text_font_size: 9.0,
            line_step: 12.0,
            table_font_size: 8.0,
            cell_padding: 2.0,
            grid_line_width: 0.5,
            fallback_image_inset: 150.0,
            fallback_image_size: (140.0, 100.0),
        }
    }
}

impl PlacementOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free text font size.
    pub fn with_text_font_size(mut self, size: f32) -> Self {
        self.text_font_size = size;
        self
    }

    /// Set the line advance of free text.
    pub fn with_line_step(mut self, step: f32) -> Self {
        self.line_step = step;
        self
    }

    /// Set the table cell font size.
    pub fn with_table_font_size(mut self, size: f32) -> Self {
        self.table_font_size = size;
        self
    }
}

/// Kind of primitive, for outcome reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Image
    Image,
    /// Table
    Table,
    /// Text block
    Text,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveKind::Image => write!(f, "image"),
            PrimitiveKind::Table => write!(f, "table"),
            PrimitiveKind::Text => write!(f, "text"),
        }
    }
}

/// A primitive that was left out of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSkip {
    /// What was skipped
    pub kind: PrimitiveKind,
    /// Why
    pub reason: String,
}

/// An image placement in canvas space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedImage {
    /// Image file
    pub path: PathBuf,
    /// Target rect
    pub rect: CanvasRect,
    /// Whether the fallback slot was used
    pub fallback: bool,
}

/// One line of text at a baseline position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    /// Text to draw
    pub text: String,
    /// Left of the baseline
    pub x: f32,
    /// Baseline height
    pub y: f32,
}

/// A text block laid out as lines.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedText {
    /// Lines in draw order
    pub lines: Vec<PlannedLine>,
    /// Font size
    pub font_size: f32,
}

/// A table laid out as a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTable {
    /// Outer rect
    pub rect: CanvasRect,
    /// Widths of the drawn columns
    pub column_widths: Vec<f32>,
    /// Height of every row
    pub row_height: f32,
    /// Cell text, row by row; short rows leave trailing cells empty
    pub rows: Vec<Vec<String>>,
    /// Cell font size
    pub font_size: f32,
    /// Cell padding
    pub padding: f32,
    /// Grid stroke width
    pub line_width: f32,
}

impl PlannedTable {
    /// X positions of the vertical grid lines, left to right.
    pub fn column_lines(&self) -> Vec<f32> {
        let mut x = self.rect.x;
        let mut lines = vec![x];
        for w in &self.column_widths {
            x += w;
            lines.push(x);
        }
        lines
    }

    /// Y positions of the horizontal grid lines, top to bottom.
    pub fn row_lines(&self) -> Vec<f32> {
        (0..=self.rows.len())
            .map(|i| self.rect.top() - i as f32 * self.row_height)
            .collect()
    }

    /// Text lines of every non-empty cell, positioned inside the cell.
    pub fn cell_lines(&self) -> Vec<PlannedLine> {
        let columns = self.column_lines();
        let leading = self.font_size * 1.2;
        let mut out = Vec::new();

        for (r, row) in self.rows.iter().enumerate() {
            let row_top = self.rect.top() - r as f32 * self.row_height;
            for (c, value) in row.iter().enumerate() {
                let Some(&left) = columns.get(c) else {
                    break;
                };
                let mut baseline = row_top - self.padding - self.font_size;
                for line in value.split('\n') {
                    if !line.is_empty() {
                        out.push(PlannedLine {
                            text: line.to_string(),
                            x: left + self.padding,
                            y: baseline,
                        });
                    }
                    baseline -= leading;
                }
            }
        }
        out
    }
}

/// Everything to draw on one output page, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// Page number (1-indexed)
    pub page: u32,
    /// Output page size
    pub size: PageSize,
    /// Drawn first
    pub images: Vec<PlannedImage>,
    /// Drawn second
    pub tables: Vec<PlannedTable>,
    /// Drawn last
    pub texts: Vec<PlannedText>,
    /// Primitives dropped while planning
    pub skipped: Vec<PlanSkip>,
}

impl PagePlan {
    fn empty(page: u32, size: PageSize) -> Self {
        Self {
            page,
            size,
            images: Vec::new(),
            tables: Vec::new(),
            texts: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Check if nothing is drawn on this page.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.tables.is_empty() && self.texts.is_empty()
    }
}

/// Computes page plans from resolved primitives.
#[derive(Debug, Clone, Default)]
pub struct PlacementPlanner {
    options: PlacementOptions,
}

impl PlacementPlanner {
    /// Create a planner with default placement constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a planner with custom placement constants.
    pub fn with_options(options: PlacementOptions) -> Self {
        Self { options }
    }

    /// Plan every page from 1 to the highest page index seen.
    pub fn plan(&self, doc: &ExtractedDocument) -> Result<Vec<PagePlan>> {
        let page_count = doc.page_count();
        if page_count == 0 {
            return Err(Error::NoPages);
        }

        let mut plans: Vec<PagePlan> = (1..=page_count)
            .map(|page| PagePlan::empty(page, doc.page_sizes.resolve(page)))
            .collect();

        // Page 0 is not a valid index; anything reported there is dropped.
        for image in &doc.images {
            match plans.get_mut(index_of(image.page)) {
                Some(plan) => {
                    let placed = self.place_image(image, plan.size);
                    plan.images.push(placed);
                }
                None => log::warn!("image on invalid page {} skipped", image.page),
            }
        }

        for table in &doc.tables {
            let Some(plan) = plans.get_mut(index_of(table.page)) else {
                log::warn!("table on invalid page {} skipped", table.page);
                continue;
            };
            match self.place_table(table, plan.size) {
                Ok(placed) => plan.tables.push(placed),
                Err(e) => {
                    log::warn!("Skipping table on page {}: {}", table.page, e);
                    plan.skipped.push(PlanSkip {
                        kind: PrimitiveKind::Table,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for block in &doc.blocks {
            let Some(plan) = plans.get_mut(index_of(block.page)) else {
                log::warn!("text block on invalid page {} skipped", block.page);
                continue;
            };
            match self.place_text(block, plan.size) {
                Ok(placed) => plan.texts.push(placed),
                Err(e) => {
                    log::warn!("Skipping text block on page {}: {}", block.page, e);
                    plan.skipped.push(PlanSkip {
                        kind: PrimitiveKind::Text,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(plans)
    }

    /// Place an image at its box, or in the fallback slot when it has none.
    pub fn place_image(&self, image: &ImagePrimitive, page: PageSize) -> PlannedImage {
        match image.rect() {
            Some(rect) => PlannedImage {
                path: image.path.clone(),
                rect: rect.to_canvas(page.height),
                fallback: false,
            },
            None => PlannedImage {
                path: image.path.clone(),
                rect: self.fallback_slot(page),
                fallback: true,
            },
        }
    }

    /// Fixed slot near the top-right corner for images without a box.
    pub fn fallback_slot(&self, page: PageSize) -> CanvasRect {
        let inset = self.options.fallback_image_inset;
        let (width, height) = self.options.fallback_image_size;
        CanvasRect::new(page.width - inset, page.height - inset, width, height)
    }

    /// Lay out a table as a grid filling its box.
    pub fn place_table(&self, table: &TablePrimitive, page: PageSize) -> Result<PlannedTable> {
        let rect = table.rect()?;
        let columns = table.column_count();
        if table.is_empty() || columns == 0 {
            return Err(Error::MalformedGeometry("table has no cells".into()));
        }

        let column_widths = if table.column_widths.len() == columns {
            table.column_widths.clone()
        } else {
            if !table.column_widths.is_empty() {
                log::debug!(
                    "table on page {}: {} inferred widths for {} columns, splitting evenly",
                    table.page,
                    table.column_widths.len(),
                    columns
                );
            }
            vec![rect.width / columns as f32; columns]
        };

        let rows = table
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.display()).collect())
            .collect::<Vec<Vec<String>>>();

        Ok(PlannedTable {
            rect: rect.to_canvas(page.height),
            column_widths,
            row_height: rect.height / rows.len() as f32,
            rows,
            font_size: self.options.table_font_size,
            padding: self.options.cell_padding,
            line_width: self.options.grid_line_width,
        })
    }

    /// Lay out a text block, one line per input line, from the top of its box down.
    pub fn place_text(&self, block: &TextPrimitive, page: PageSize) -> Result<PlannedText> {
        let rect = block.rect()?.to_canvas(page.height);
        let font_size = self.options.text_font_size;

        let mut baseline = rect.top() - font_size;
        let mut lines = Vec::with_capacity(block.line_count());
        for line in block.lines() {
            lines.push(PlannedLine {
                text: line.to_string(),
                x: rect.x,
                y: baseline,
            });
            baseline -= self.options.line_step;
        }

        Ok(PlannedText { lines, font_size })
    }
}

fn index_of(page: u32) -> usize {
    (page as usize).wrapping_sub(1)
}
