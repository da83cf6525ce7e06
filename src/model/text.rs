//! Free text lines.

use serde::{Deserialize, Serialize};

use super::{BoxForm, RawBox, Rect};
use crate::error::{Error, Result};

/// A positioned run of text lines detected outside of any table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPrimitive {
    /// Page number (1-indexed)
    pub page: u32,

    /// Box as `[x, y, width, height]` in extraction space
    #[serde(default)]
    pub bbox: Option<RawBox>,

    /// Text content; each `\n` starts a new drawn line
    pub text: String,
}

impl TextPrimitive {
    /// Create a text primitive from a rect.
    pub fn new(page: u32, rect: Rect, text: impl Into<String>) -> Self {
        Self {
            page,
            bbox: Some(rect.into()),
            text: text.into(),
        }
    }

    /// Normalized box, or `MalformedGeometry` if missing or invalid.
    pub fn rect(&self) -> Result<Rect> {
        self.bbox
            .as_ref()
            .ok_or_else(|| Error::MalformedGeometry("text block has no bbox".into()))?
            .normalize(BoxForm::Sized)
    }

    /// Replace the text payload. The box is never touched.
    pub fn replace_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Lines in draw order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines().count()
    }
}
