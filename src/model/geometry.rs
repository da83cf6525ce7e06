//! Coordinate types and conversions.
//!
//! Two coordinate spaces are used throughout the crate:
//!
//! - **Extraction space**: top-left origin, y grows downward. Everything an
//!   extractor reports, and everything the layout passes operate on.
//! - **Canvas space**: bottom-left origin, y grows upward. Only the placement
//!   planner produces canvas coordinates, right before drawing.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tolerance used for geometric comparisons.
pub const EPSILON: f32 = 1e-3;

/// An axis-aligned rectangle in extraction space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width (positive for a valid rect)
    pub width: f32,
    /// Height (positive for a valid rect)
    pub height: f32,
}

impl Rect {
    /// Create a rect from origin and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rect from `(x0, y0)` top-left and `(x1, y1)` bottom-right corners.
    ///
    /// Corners are taken as given; a reversed pair yields a negative size and
    /// fails [`Rect::is_valid`].
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area of the rect (zero for invalid rects).
    pub fn area(&self) -> f32 {
        if self.is_valid() {
            self.width * self.height
        } else {
            0.0
        }
    }

    /// Check the shape invariants: finite coordinates and positive size.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Return the rect if it is valid, or a `MalformedGeometry` error.
    pub fn validated(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::MalformedGeometry(format!(
                "non-positive or non-finite box ({}, {}, {}, {})",
                self.x, self.y, self.width, self.height
            )))
        }
    }

    /// Boundary-inclusive containment: every edge of `other` lies within or on this rect.
    ///
    /// Edges are compared with [`EPSILON`] slack, since corner and size forms
    /// of the same edge can differ by a rounding step.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.y >= self.y - EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }

    /// Area of the overlap between two rects.
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Convert to canvas space for a page of the given height.
    pub fn to_canvas(&self, page_height: f32) -> CanvasRect {
        CanvasRect {
            x: self.x,
            y: page_height - self.y - self.height,
            width: self.width,
            height: self.height,
        }
    }

    /// Approximate equality within [`EPSILON`].
    pub fn approx_eq(&self, other: &Rect) -> bool {
        (self.x - other.x).abs() <= EPSILON
            && (self.y - other.y).abs() <= EPSILON
            && (self.width - other.width).abs() <= EPSILON
            && (self.height - other.height).abs() <= EPSILON
    }
}

/// An axis-aligned rectangle in canvas space; `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasRect {
    /// Left edge
    pub x: f32,
    /// Bottom edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl CanvasRect {
    /// Create a canvas rect.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top edge in canvas space.
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Inverse of [`Rect::to_canvas`].
    pub fn to_extraction(&self, page_height: f32) -> Rect {
        Rect {
            x: self.x,
            y: page_height - self.y - self.height,
            width: self.width,
            height: self.height,
        }
    }
}

/// How the four numbers of a [`RawBox`] are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxForm {
    /// `[x, y, width, height]` (text lines, images)
    Sized,
    /// `[x0, y0, x1, y1]` (tables)
    Corners,
}

/// A box exactly as an extractor reported it.
///
/// Kept raw so that a malformed box does not fail deserialization of the
/// whole document; it is normalized with [`RawBox::normalize`] when needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawBox(pub Vec<f32>);

impl RawBox {
    /// Raw box in `[x, y, width, height]` form.
    pub fn sized(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self(vec![x, y, width, height])
    }

    /// Raw box in `[x0, y0, x1, y1]` form.
    pub fn corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self(vec![x0, y0, x1, y1])
    }

    /// Normalize into a valid [`Rect`], checking arity and size.
    pub fn normalize(&self, form: BoxForm) -> Result<Rect> {
        let [a, b, c, d] = self.0.as_slice() else {
            return Err(Error::MalformedGeometry(format!(
                "expected 4 numbers, got {}",
                self.0.len()
            )));
        };

        let rect = match form {
            BoxForm::Sized => Rect::new(*a, *b, *c, *d),
            BoxForm::Corners => Rect::from_corners(*a, *b, *c, *d),
        };
        rect.validated()
    }
}

impl From<Rect> for RawBox {
    fn from(rect: Rect) -> Self {
        Self::sized(rect.x, rect.y, rect.width, rect.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_canvas() {
        let rect = Rect::new(50.0, 100.0, 200.0, 20.0);
        let canvas = rect.to_canvas(792.0);
        assert_eq!(canvas.x, 50.0);
        assert_eq!(canvas.y, 672.0);
        assert_eq!(canvas.width, 200.0);
        assert_eq!(canvas.height, 20.0);
    }

    #[test]
    fn test_canvas_round_trip() {
        let heights = [792.0, 842.0, 100.5];
        let rects = [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(12.25, 400.75, 33.5, 0.5),
            Rect::new(500.0, 780.0, 100.0, 12.0),
        ];
        for h in heights {
            for rect in rects {
                let back = rect.to_canvas(h).to_extraction(h);
                assert!(back.approx_eq(&rect), "{:?} != {:?}", back, rect);
            }
        }
    }

    #[test]
    fn test_contains_boundary_inclusive() {
        let table = Rect::from_corners(100.0, 100.0, 300.0, 160.0);
        assert!(table.contains(&table));
        assert!(table.contains(&Rect::new(100.0, 100.0, 50.0, 10.0)));
        assert!(table.contains(&Rect::new(250.0, 150.0, 50.0, 10.0)));
        assert!(!table.contains(&Rect::new(99.9, 100.0, 50.0, 10.0)));
        assert!(!table.contains(&Rect::new(250.0, 150.0, 50.1, 10.0)));
    }

    #[test]
    fn test_intersection_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&b), 25.0);
        assert_eq!(a.intersection_area(&Rect::new(20.0, 20.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_raw_box_normalize() {
        let sized = RawBox::sized(10.0, 20.0, 30.0, 40.0);
        let rect = sized.normalize(BoxForm::Sized).unwrap();
        assert_eq!(rect, Rect::new(10.0, 20.0, 30.0, 40.0));

        let corners = RawBox::corners(100.0, 100.0, 300.0, 160.0);
        let rect = corners.normalize(BoxForm::Corners).unwrap();
        assert_eq!(rect, Rect::new(100.0, 100.0, 200.0, 60.0));
    }

    #[test]
    fn test_raw_box_rejects_bad_shapes() {
        assert!(matches!(
            RawBox(vec![1.0, 2.0, 3.0]).normalize(BoxForm::Sized),
            Err(Error::MalformedGeometry(_))
        ));
        assert!(RawBox::sized(0.0, 0.0, 0.0, 10.0)
            .normalize(BoxForm::Sized)
            .is_err());
        assert!(RawBox::corners(300.0, 100.0, 100.0, 160.0)
            .normalize(BoxForm::Corners)
            .is_err());
        assert!(RawBox::sized(f32::NAN, 0.0, 1.0, 1.0)
            .normalize(BoxForm::Sized)
            .is_err());
    }
}
