//! Document model types for layout reconstruction.
//!
//! This module defines the primitives that flow between extraction, layout
//! resolution and rendering. All boxes are stored in extraction space
//! (top-left origin); see [`geometry`] for the canvas conversion.

pub mod geometry;
mod document;
mod image;
mod page;
mod table;
mod text;

pub use document::ExtractedDocument;
pub use geometry::{BoxForm, CanvasRect, RawBox, Rect, EPSILON};
pub use image::{ImageKind, ImagePrimitive};
pub use page::{PageSize, PageSizes};
pub use table::{CellGeometry, CellValue, TablePrimitive};
pub use text::TextPrimitive;
