//! Page-level types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page dimensions in points (1 point = 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct PageSize {
    /// Page width
    pub width: f32,

    /// Page height
    pub height: f32,
}

impl PageSize {
    /// Create a page size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Standard Letter size (8.5 x 11 inches).
    pub fn letter() -> Self {
        Self::new(612.0, 792.0) // 8.5 * 72, 11 * 72
    }

    /// Standard A4 size (210 x 297 mm).
    pub fn a4() -> Self {
        Self::new(595.0, 842.0) // 210mm * 2.834, 297mm * 2.834
    }

    /// Check if the page is in landscape orientation.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::letter()
    }
}

impl From<(f32, f32)> for PageSize {
    fn from((width, height): (f32, f32)) -> Self {
        Self::new(width, height)
    }
}

impl From<PageSize> for (f32, f32) {
    fn from(size: PageSize) -> Self {
        (size.width, size.height)
    }
}

/// Sizes of the source pages, keyed by 1-based page index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSizes(BTreeMap<u32, PageSize>);

impl PageSizes {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size of a page.
    pub fn insert(&mut self, page: u32, size: PageSize) {
        self.0.insert(page, size);
    }

    /// Size recorded for exactly this page.
    pub fn get(&self, page: u32) -> Option<PageSize> {
        self.0.get(&page).copied()
    }

    /// Highest recorded page index.
    pub fn max_index(&self) -> Option<u32> {
        self.0.keys().next_back().copied()
    }

    /// Size to use when rendering `page`.
    ///
    /// Gap pages take the nearest lower recorded size, then the nearest
    /// higher one; with no recorded page at all the default (Letter) is used.
    pub fn resolve(&self, page: u32) -> PageSize {
        self.0
            .range(..=page)
            .next_back()
            .or_else(|| self.0.range(page..).next())
            .map(|(_, size)| *size)
            .unwrap_or_default()
    }

    /// Number of recorded pages.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no page is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(page, size)` in page order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, PageSize)> + '_ {
        self.0.iter().map(|(page, size)| (*page, *size))
    }
}

impl FromIterator<(u32, PageSize)> for PageSizes {
    fn from_iter<I: IntoIterator<Item = (u32, PageSize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_presets() {
        assert!(!PageSize::letter().is_landscape());
        assert!(!PageSize::a4().is_landscape());
        assert!(PageSize::new(842.0, 595.0).is_landscape());
    }

    #[test]
    fn test_resolve_gap_pages() {
        let mut sizes = PageSizes::new();
        sizes.insert(2, PageSize::a4());
        sizes.insert(4, PageSize::new(842.0, 595.0));

        assert_eq!(sizes.resolve(1), PageSize::a4());
        assert_eq!(sizes.resolve(2), PageSize::a4());
        assert_eq!(sizes.resolve(3), PageSize::a4());
        assert_eq!(sizes.resolve(5), PageSize::new(842.0, 595.0));
        assert_eq!(sizes.max_index(), Some(4));
    }

    #[test]
    fn test_resolve_empty_uses_letter() {
        assert_eq!(PageSizes::new().resolve(3), PageSize::letter());
    }

    #[test]
    fn test_serde_shape() {
        let sizes: PageSizes = serde_json::from_str(r#"{"1": [612.0, 792.0]}"#).unwrap();
        assert_eq!(sizes.get(1), Some(PageSize::letter()));
        let json = serde_json::to_string(&sizes).unwrap();
        assert_eq!(json, r#"{"1":[612.0,792.0]}"#);
    }
}
