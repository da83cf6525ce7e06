//! Image references.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{BoxForm, RawBox, Rect};

/// An image extracted to disk, optionally with its placement on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePrimitive {
    /// Page number (1-indexed)
    pub page: u32,

    /// Box as `[x, y, width, height]` in extraction space, if known
    #[serde(default)]
    pub bbox: Option<RawBox>,

    /// Path of the image file
    #[serde(rename = "image_file")]
    pub path: PathBuf,
}

impl ImagePrimitive {
    /// Image with a known placement.
    pub fn placed(page: u32, rect: Rect, path: impl Into<PathBuf>) -> Self {
        Self {
            page,
            bbox: Some(rect.into()),
            path: path.into(),
        }
    }

    /// Image without placement metadata.
    pub fn unplaced(page: u32, path: impl Into<PathBuf>) -> Self {
        Self {
            page,
            bbox: None,
            path: path.into(),
        }
    }

    /// Normalized box; `None` when absent or unusable.
    pub fn rect(&self) -> Option<Rect> {
        let raw = self.bbox.as_ref()?;
        match raw.normalize(BoxForm::Sized) {
            Ok(rect) => Some(rect),
            Err(e) => {
                log::debug!("image {} box ignored: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Image container format, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// JPEG (DCT)
    Jpeg,
    /// PNG
    Png,
    /// GIF
    Gif,
    /// TIFF
    Tiff,
    /// BMP
    Bmp,
    /// JPEG 2000
    Jpeg2000,
}

impl ImageKind {
    /// Detect the format from data magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageKind::Jpeg);
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageKind::Png);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageKind::Gif);
        }

        // TIFF: little-endian or big-endian
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some(ImageKind::Tiff);
        }

        if data.starts_with(b"BM") {
            return Some(ImageKind::Bmp);
        }

        // JPEG 2000: 00 00 00 0C 6A 50 20 20
        if data.starts_with(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20]) {
            return Some(ImageKind::Jpeg2000);
        }

        None
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Tiff => "tiff",
            ImageKind::Bmp => "bmp",
            ImageKind::Jpeg2000 => "jp2",
        }
    }
}
