//! Rendering options and configuration.

use crate::layout::PlacementOptions;

/// Options for rebuilding the output document.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Placement constants (font sizes, line step, grid, fallback slot)
    pub placement: PlacementOptions,

    /// Compress content streams of the output file
    pub compress: bool,

    /// Document title written to the Info dictionary
    pub title: Option<String>,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all placement constants.
    pub fn with_placement(mut self, placement: PlacementOptions) -> Self {
        self.placement = placement;
        self
    }

    /// Set the free text font size.
    pub fn with_text_font_size(mut self, size: f32) -> Self {
        self.placement.text_font_size = size;
        self
    }

    /// Set the vertical step between free text lines.
    pub fn with_line_step(mut self, step: f32) -> Self {
        self.placement.line_step = step;
        self
    }

    /// Set the table cell font size.
    pub fn with_table_font_size(mut self, size: f32) -> Self {
        self.placement.table_font_size = size;
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            placement: PlacementOptions::default(),
            compress: true,
            title: None,
        }
    }
}
