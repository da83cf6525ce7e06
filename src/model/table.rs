//! Table types.

use serde::{Deserialize, Serialize};

use super::{BoxForm, RawBox, Rect};
use crate::error::{Error, Result};

/// A detected table region with its cell content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePrimitive {
    /// Page number (1-indexed)
    pub page: u32,

    /// Box as `[x0, y0, x1, y1]` in extraction space
    #[serde(default)]
    pub bbox: Option<RawBox>,

    /// Cell values, row by row
    #[serde(rename = "data", default)]
    pub rows: Vec<Vec<CellValue>>,

    /// Raw cell geometry reported by the extractor
    #[serde(default)]
    pub cells: Vec<CellGeometry>,

    /// Inferred column widths (empty = even split)
    #[serde(rename = "col_widths", default)]
    pub column_widths: Vec<f32>,
}

impl TablePrimitive {
    /// Create a table from its corner box and rows.
    pub fn new(page: u32, rect: Rect, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            page,
            bbox: Some(RawBox::corners(rect.x, rect.y, rect.right(), rect.bottom())),
            rows,
            cells: Vec::new(),
            column_widths: Vec::new(),
        }
    }

    /// Attach raw cell geometry.
    pub fn with_cells(mut self, cells: Vec<CellGeometry>) -> Self {
        self.cells = cells;
        self
    }

    /// Normalized box, or `MalformedGeometry` if missing or invalid.
    pub fn rect(&self) -> Result<Rect> {
        self.bbox
            .as_ref()
            .ok_or_else(|| Error::MalformedGeometry("table has no bbox".into()))?
            .normalize(BoxForm::Corners)
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.display())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single cell value.
///
/// Deserializes from a JSON string, number or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Text content
    Text(String),
    /// Numeric content
    Number(f64),
    /// Empty cell
    Empty,
}

impl CellValue {
    /// Create a text cell.
    pub fn text(text: impl Into<String>) -> Self {
        CellValue::Text(text.into())
    }

    /// Text to draw for this cell.
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// The text payload if this cell carries non-empty text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<Option<&str>> for CellValue {
    fn from(s: Option<&str>) -> Self {
        s.map(CellValue::from).unwrap_or(CellValue::Empty)
    }
}

/// Cell geometry in either of the shapes extractors emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellGeometry {
    /// Attribute-keyed: `{"x0": .., "x1": .., ...}`
    Keyed {
        /// Left edge
        x0: f32,
        /// Right edge
        x1: f32,
    },
    /// Positional tuple: `[x0, top, x1, bottom, ...]`
    Positional(Vec<serde_json::Value>),
    /// Anything else
    Unrecognized(serde_json::Value),
}

impl CellGeometry {
    /// Keyed cell from its horizontal edges.
    pub fn keyed(x0: f32, x1: f32) -> Self {
        CellGeometry::Keyed { x0, x1 }
    }

    /// Positional cell `[x0, top, x1, bottom]`.
    pub fn positional(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        CellGeometry::Positional(vec![x0.into(), top.into(), x1.into(), bottom.into()])
    }

    /// Normalize to the `(x0, x1)` pair.
    pub fn horizontal_edges(&self) -> Result<(f32, f32)> {
        let (x0, x1) = match self {
            CellGeometry::Keyed { x0, x1 } => (*x0, *x1),
            CellGeometry::Positional(values) if values.len() >= 3 => {
                let x0 = number_at(values, 0)?;
                let x1 = number_at(values, 2)?;
                (x0, x1)
            }
            CellGeometry::Positional(values) => {
                return Err(Error::UnparseableCellGeometry(format!(
                    "positional cell has {} values, need at least 3",
                    values.len()
                )))
            }
            CellGeometry::Unrecognized(value) => {
                return Err(Error::UnparseableCellGeometry(format!(
                    "unknown cell format: {}",
                    value
                )))
            }
        };

        if !x0.is_finite() || !x1.is_finite() {
            return Err(Error::UnparseableCellGeometry(format!(
                "non-finite edges ({}, {})",
                x0, x1
            )));
        }
        Ok((x0, x1))
    }
}

fn number_at(values: &[serde_json::Value], index: usize) -> Result<f32> {
    values[index]
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| {
            Error::UnparseableCellGeometry(format!(
                "value at {} is not a number: {}",
                index, values[index]
            ))
        })
}
