//! Error types for repdf library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, transforming, or rebuilding a document.
///
/// Only a few of these ever reach the caller of a rebuild: [`Error::NoPages`],
/// output write failures ([`Error::Io`], [`Error::Pdf`]) and input load failures.
/// The rest are produced per primitive, logged, and recorded as skips.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error reading or writing PDF structure.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// A box failed its shape invariants (arity, non-positive size).
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    /// A table cell's coordinates could not be extracted.
    #[error("Unparseable cell geometry: {0}")]
    UnparseableCellGeometry(String),

    /// An image file could not be read or decoded.
    #[error("Asset {path}: {reason}")]
    AssetIo {
        /// Path of the asset
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A font file could not be registered.
    #[error("Font registration failed for {path}: {reason}")]
    FontRegistration {
        /// Path of the font file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The content transform backend failed.
    #[error("Transform error: {0}")]
    Transform(String),

    /// No page was observed in the input.
    #[error("Document has no pages")]
    NoPages,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Extraction manifest could not be read.
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::Pdf(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Manifest(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::Other(format!("image: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoPages;
        assert_eq!(err.to_string(), "Document has no pages");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_asset_error_names_path() {
        let err = Error::AssetIo {
            path: PathBuf::from("images/a.png"),
            reason: "missing".into(),
        };
        assert_eq!(err.to_string(), "Asset images/a.png: missing");
    }
}
