//! Font resolution for the rebuilt document.
//!
//! A script-capable TrueType font is preferred. When it cannot be loaded the
//! secondary font is tried, and when that also fails the built-in Helvetica
//! is used. The choice is made once per rebuild and never changes afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Name of the built-in fallback font.
pub const BUILTIN_FONT: &str = "Helvetica";

/// Font files to try, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct FontConfig {
    /// Script-capable font tried first
    pub primary: Option<PathBuf>,

    /// Font tried when the primary one fails
    pub secondary: Option<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            primary: Some(PathBuf::from("fonts/NotoSansDevanagari-Regular.ttf")),
            secondary: Some(PathBuf::from(
                "fonts/NotoSansDevanagari-VariableFont_wdth,wght.ttf",
            )),
        }
    }
}

impl FontConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use only the built-in font.
    pub fn builtin_only() -> Self {
        Self {
            primary: None,
            secondary: None,
        }
    }

    /// Set the primary font file.
    pub fn with_primary(mut self, path: impl Into<PathBuf>) -> Self {
        self.primary = Some(path.into());
        self
    }

    /// Set the secondary font file.
    pub fn with_secondary(mut self, path: impl Into<PathBuf>) -> Self {
        self.secondary = Some(path.into());
        self
    }

    /// Resolve the font to use for this job.
    pub fn resolve(&self) -> FontResolution {
        FontResolution::resolve(self)
    }
}

/// Which link of the fallback chain was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontState {
    /// The script-capable primary font is registered
    Primary,
    /// Secondary font or the built-in font
    Fallback,
}

/// A TrueType font loaded from disk and validated.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    name: String,
    path: PathBuf,
    data: Arc<Vec<u8>>,
}

/// Font-wide metrics in 1000-unit glyph space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Ascender
    pub ascent: i32,
    /// Descender (negative)
    pub descent: i32,
    /// Capital letter height
    pub cap_height: i32,
    /// `[x_min, y_min, x_max, y_max]`
    pub bbox: [i32; 4],
}

impl EmbeddedFont {
    /// Read and validate a font file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::FontRegistration {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(path, data)
    }

    /// Validate font bytes that were loaded elsewhere.
    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self> {
        let name = {
            let face = ttf_parser::Face::parse(&data, 0).map_err(|e| Error::FontRegistration {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            // Embedded as CIDFontType2, which needs glyf outlines; CFF faces are refused.
            if face.tables().glyf.is_none() {
                return Err(Error::FontRegistration {
                    path: path.to_path_buf(),
                    reason: "no TrueType outlines (CFF fonts are not supported)".into(),
                });
            }
            postscript_name(&face).unwrap_or_else(|| file_stem_name(path))
        };

        Ok(Self {
            name: sanitize_font_name(&name),
            path: path.to_path_buf(),
            data: Arc::new(data),
        })
    }

    /// PostScript name used as the PDF BaseFont.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw font program.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn face(&self) -> Result<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0).map_err(|e| Error::FontRegistration {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Map characters to glyph ids; unmapped characters get glyph 0.
    pub fn glyph_ids(&self, text: &str) -> Result<Vec<(u16, char)>> {
        let face = self.face()?;
        Ok(text
            .chars()
            .map(|ch| (face.glyph_index(ch).map(|g| g.0).unwrap_or(0), ch))
            .collect())
    }

    /// Horizontal advance of a glyph in 1000-unit space.
    pub fn advance(&self, glyph: u16) -> Result<u32> {
        let face = self.face()?;
        let units = f32::from(face.units_per_em().max(1));
        let advance = face
            .glyph_hor_advance(ttf_parser::GlyphId(glyph))
            .unwrap_or(0);
        Ok((f32::from(advance) * 1000.0 / units).round() as u32)
    }

    /// Font-wide metrics.
    pub fn metrics(&self) -> Result<FontMetrics> {
        let face = self.face()?;
        let units = f32::from(face.units_per_em().max(1));
        let scale = |v: i16| (f32::from(v) * 1000.0 / units).round() as i32;
        let bbox = face.global_bounding_box();

        Ok(FontMetrics {
            ascent: scale(face.ascender()),
            descent: scale(face.descender()),
            cap_height: face.capital_height().map(scale).unwrap_or(700),
            bbox: [
                scale(bbox.x_min),
                scale(bbox.y_min),
                scale(bbox.x_max),
                scale(bbox.y_max),
            ],
        })
    }
}

fn postscript_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|n| n.to_string())
        .filter(|s| !s.trim().is_empty())
}

fn file_stem_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "EmbeddedFont".to_string())
}

/// Keep only characters that are safe inside a PDF name.
fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

/// The font every text draw of a job uses.
#[derive(Debug, Clone)]
pub enum ResolvedFont {
    /// A registered TrueType font
    Embedded(EmbeddedFont),
    /// Built-in Helvetica
    Builtin,
}

impl ResolvedFont {
    /// Font name as it appears in the output.
    pub fn name(&self) -> &str {
        match self {
            ResolvedFont::Embedded(font) => font.name(),
            ResolvedFont::Builtin => BUILTIN_FONT,
        }
    }
}

/// Outcome of walking the fallback chain.
#[derive(Debug, Clone)]
pub struct FontResolution {
    font: ResolvedFont,
    state: FontState,
}

impl FontResolution {
    /// Try the primary font, then the secondary, then the built-in font.
    pub fn resolve(config: &FontConfig) -> Self {
        if let Some(path) = &config.primary {
            match EmbeddedFont::load(path) {
                Ok(font) => {
                    log::info!("Using font {} from {}", font.name(), path.display());
                    return Self {
                        font: ResolvedFont::Embedded(font),
                        state: FontState::Primary,
                    };
                }
                Err(e) => log::warn!("{}", e),
            }
        }

        if let Some(path) = &config.secondary {
            match EmbeddedFont::load(path) {
                Ok(font) => {
                    log::info!("Using fallback font {} from {}", font.name(), path.display());
                    return Self {
                        font: ResolvedFont::Embedded(font),
                        state: FontState::Fallback,
                    };
                }
                Err(e) => log::warn!("{}", e),
            }
        }

        log::warn!(
            "No TrueType font available, using {}; non-Latin text will be replaced",
            BUILTIN_FONT
        );
        Self::builtin()
    }

    /// Resolution to the built-in font.
    pub fn builtin() -> Self {
        Self {
            font: ResolvedFont::Builtin,
            state: FontState::Fallback,
        }
    }

    /// The resolved font.
    pub fn font(&self) -> &ResolvedFont {
        &self.font
    }

    /// Which link of the chain was used.
    pub fn state(&self) -> FontState {
        self.state
    }
}
