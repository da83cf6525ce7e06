//! Document-level types.

use serde::{Deserialize, Serialize};

use super::{ImagePrimitive, PageSize, PageSizes, TablePrimitive, TextPrimitive};

/// Everything an extractor found in a source document.
///
/// This is also the JSON manifest format, so that any external parser can
/// feed the reconstruction engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Source page sizes
    #[serde(default)]
    pub page_sizes: PageSizes,

    /// Free text lines
    #[serde(default)]
    pub blocks: Vec<TextPrimitive>,

    /// Tables
    #[serde(default)]
    pub tables: Vec<TablePrimitive>,

    /// Images
    #[serde(default)]
    pub images: Vec<ImagePrimitive>,
}

impl ExtractedDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a page.
    pub fn add_page(&mut self, page: u32, size: PageSize) {
        self.page_sizes.insert(page, size);
    }

    /// Add a text block.
    pub fn add_block(&mut self, block: TextPrimitive) {
        self.blocks.push(block);
    }

    /// Add a table.
    pub fn add_table(&mut self, table: TablePrimitive) {
        self.tables.push(table);
    }

    /// Add an image.
    pub fn add_image(&mut self, image: ImagePrimitive) {
        self.images.push(image);
    }

    /// Number of pages to render: the highest page index seen anywhere.
    pub fn page_count(&self) -> u32 {
        let primitives = self
            .blocks
            .iter()
            .map(|b| b.page)
            .chain(self.tables.iter().map(|t| t.page))
            .chain(self.images.iter().map(|i| i.page));

        primitives
            .chain(self.page_sizes.max_index())
            .max()
            .unwrap_or(0)
    }

    /// Check if the document has no page at all.
    pub fn is_empty(&self) -> bool {
        self.page_count() == 0
    }

    /// Get plain text content of all blocks and tables.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.clone())
            .chain(self.tables.iter().map(|t| t.plain_text()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse a JSON manifest.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to a JSON manifest.
    pub fn to_json(&self, pretty: bool) -> crate::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
