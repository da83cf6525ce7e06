//! Content stream interpretation.
//!
//! Walks the operators of a page and collects positioned text spans and
//! image invocations. Coordinates produced here are in PDF user space
//! (bottom-left origin); the extractor converts them when building
//! primitives.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Dictionary, Document as LopdfDocument, Encoding, Object};

use crate::error::Result;

/// A run of text drawn with one show operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Text content
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Baseline
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
    /// Effective font size
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span, estimating its width from the character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = estimate_width(&text, font_size);
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Approximate top of the glyphs.
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    /// Approximate bottom of the glyphs.
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }
}

/// Average glyph advance is taken as half the font size.
fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5
}

/// An image XObject painted with `Do`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInvocation {
    /// Resource name
    pub name: Vec<u8>,
    /// Current transformation matrix at the time of the call
    pub ctm: Matrix,
}

/// Everything collected from one page's content.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Text spans in content order
    pub spans: Vec<TextSpan>,
    /// Image invocations in content order
    pub images: Vec<ImageInvocation>,
}

/// Affine matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scale
    pub a: f32,
    /// Vertical skew
    pub b: f32,
    /// Horizontal skew
    pub c: f32,
    /// Vertical scale
    pub d: f32,
    /// X translation
    pub e: f32,
    /// Y translation
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// The identity matrix.
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Build from six operands.
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Axis-aligned bounds `(x0, y0, x1, y1)` of the unit square under this matrix.
    pub fn unit_bounds(&self) -> (f32, f32, f32, f32) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let xs = corners.iter().map(|p| p.0);
        let ys = corners.iter().map(|p| p.1);
        (
            xs.clone().fold(f32::INFINITY, f32::min),
            ys.clone().fold(f32::INFINITY, f32::min),
            xs.fold(f32::NEG_INFINITY, f32::max),
            ys.fold(f32::NEG_INFINITY, f32::max),
        )
    }

    /// Vertical scale factor.
    fn scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Text state tracked between `BT` and `ET`.
#[derive(Debug, Clone, Copy)]
struct TextState {
    matrix: Matrix,
    line: Matrix,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line: Matrix::IDENTITY,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn set(&mut self, m: Matrix) {
        self.matrix = m;
        self.line = m;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.line = Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty).then(&self.line);
        self.matrix = self.line;
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 { self.leading } else { 12.0 };
        self.translate(0.0, -leading);
    }

    fn advance(&mut self, width: f32) {
        self.matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, width, 0.0).then(&self.matrix);
    }
}

/// Interprets one page's content stream.
pub struct ContentScanner<'a> {
    doc: &'a LopdfDocument,
    encodings: HashMap<Vec<u8>, Encoding<'a>>,
}

impl<'a> ContentScanner<'a> {
    /// Prepare a scanner for a page with the given font resources.
    pub fn new(doc: &'a LopdfDocument, fonts: &BTreeMap<Vec<u8>, &'a Dictionary>) -> Self {
        let encodings = fonts
            .iter()
            .filter_map(|(name, font)| {
                font.get_font_encoding(doc)
                    .ok()
                    .map(|encoding| (name.clone(), encoding))
            })
            .collect();
        Self { doc, encodings }
    }

    /// Decode and walk a content stream.
    pub fn scan(&self, content: &[u8]) -> Result<PageContent> {
        let content = lopdf::content::Content::decode(content)?;
        let mut out = PageContent::default();

        let mut ctm = Matrix::IDENTITY;
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut font: Vec<u8> = Vec::new();
        let mut font_size: f32 = 12.0;
        let mut in_text = false;

        for op in content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => ctm = ctm_stack.pop().unwrap_or(Matrix::IDENTITY),
                "cm" => {
                    if let Some(m) = matrix_from(operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        out.images.push(ImageInvocation {
                            name: name.clone(),
                            ctm,
                        });
                    }
                }
                "BT" => {
                    in_text = true;
                    text = TextState {
                        leading: text.leading,
                        ..TextState::default()
                    };
                }
                "ET" => in_text = false,
                "Tf" => {
                    if let [Object::Name(name), size, ..] = operands.as_slice() {
                        font = name.clone();
                        font_size = number(size).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(number) {
                        text.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty, ..] = operands.as_slice() {
                        let tx = number(tx).unwrap_or(0.0);
                        let ty = number(ty).unwrap_or(0.0);
                        if op.operator == "TD" {
                            text.leading = -ty;
                        }
                        text.translate(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_from(operands) {
                        text.set(m);
                    }
                }
                "T*" => text.next_line(),
                "Tj" | "TJ" | "'" | "\"" => {
                    if matches!(op.operator.as_str(), "'" | "\"") {
                        text.next_line();
                    }
                    if !in_text {
                        continue;
                    }
                    let shown = match op.operator.as_str() {
                        "TJ" => operands.first().map(|arr| self.decode_array(&font, arr)),
                        "\"" => operands.get(2).map(|s| self.decode_string(&font, s)),
                        _ => operands.first().map(|s| self.decode_string(&font, s)),
                    };
                    let Some(shown) = shown else {
                        continue;
                    };

                    let rendering = text.matrix.then(&ctm);
                    let (x, y) = rendering.apply(0.0, 0.0);
                    let size = font_size * rendering.scale();
                    let span = TextSpan::new(shown, x, y, size);

                    text.advance(estimate_width(&span.text, font_size));
                    if !span.text.trim().is_empty() {
                        out.spans.push(span);
                    }
                }
                _ => {}
            }
        }

        Ok(out)
    }

    fn decode_string(&self, font: &[u8], obj: &Object) -> String {
        let Object::String(bytes, _) = obj else {
            return String::new();
        };
        match self.encodings.get(font) {
            Some(encoding) => LopdfDocument::decode_text(encoding, bytes).unwrap_or_default(),
            None => decode_text_simple(bytes),
        }
    }

    /// Decode a `TJ` array; large negative adjustments become word spaces.
    fn decode_array(&self, font: &[u8], obj: &Object) -> String {
        const SPACE_THRESHOLD: f32 = 200.0;

        let Object::Array(items) = obj else {
            return String::new();
        };
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(..) => combined.push_str(&self.decode_string(font, item)),
                other => {
                    let Some(adjust) = number(other) else {
                        continue;
                    };
                    let wants_space = -adjust > SPACE_THRESHOLD
                        && combined
                            .chars()
                            .last()
                            .is_some_and(|c| !c.is_whitespace() && !is_spaceless_script_char(c));
                    if wants_space {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }

    /// The document being scanned.
    pub fn document(&self) -> &'a LopdfDocument {
        self.doc
    }
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    match operands {
        [a, b, c, d, e, f, ..] => Some(Matrix::new(
            number(a)?,
            number(b)?,
            number(c)?,
            number(d)?,
            number(e)?,
            number(f)?,
        )),
        _ => None,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Scripts written without spaces between words.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF          // CJK unified ideographs
        | 0x3400..=0x4DBF        // extension A
        | 0x20000..=0x2EBEF      // extensions B-F
        | 0x3040..=0x30FF        // hiragana, katakana
        | 0x3000..=0x303F        // CJK punctuation
    )
}

/// Decode string bytes without font information: UTF-16BE with BOM, UTF-8, then Latin-1.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> PageContent {
        let doc = LopdfDocument::with_version("1.5");
        let fonts = BTreeMap::new();
        ContentScanner::new(&doc, &fonts)
            .scan(content.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_positioned_spans() {
        let page = scan("BT /F1 12 Tf 72 700 Td (Hello) Tj 0 -14 Td (World) Tj ET");
        assert_eq!(page.spans.len(), 2);
        assert_eq!(page.spans[0].text, "Hello");
        assert_eq!((page.spans[0].x, page.spans[0].y), (72.0, 700.0));
        assert_eq!((page.spans[1].x, page.spans[1].y), (72.0, 686.0));
        assert_eq!(page.spans[1].font_size, 12.0);
    }

    #[test]
    fn test_text_matrix_and_leading() {
        let page = scan("BT /F1 10 Tf 14 TL 1 0 0 1 50 500 Tm (a) Tj T* (b) Tj (c) ' ET");
        let ys: Vec<f32> = page.spans.iter().map(|s| s.y).collect();
        assert_eq!(ys, vec![500.0, 486.0, 472.0]);
    }

    #[test]
    fn test_scaled_text_matrix() {
        let page = scan("BT /F1 1 Tf 12 0 0 12 100 200 Tm (Big) Tj ET");
        assert_eq!(page.spans[0].font_size, 12.0);
        assert_eq!(page.spans[0].x, 100.0);
    }

    #[test]
    fn test_tj_array_spacing() {
        let page = scan("BT /F1 12 Tf 10 10 Td [(Hello) -300 (World) -20 (!)] TJ ET");
        assert_eq!(page.spans[0].text, "Hello World!");
    }

    #[test]
    fn test_image_ctm() {
        let page = scan("q 200 0 0 100 50 600 cm /Im1 Do Q /Im2 Do");
        assert_eq!(page.images.len(), 2);
        assert_eq!(page.images[0].name, b"Im1".to_vec());
        assert_eq!(page.images[0].ctm.unit_bounds(), (50.0, 600.0, 250.0, 700.0));
        assert_eq!(page.images[1].ctm, Matrix::IDENTITY);
    }

    #[test]
    fn test_nested_cm() {
        let page = scan("q 1 0 0 1 10 20 cm q 2 0 0 3 0 0 cm /Im Do Q Q");
        assert_eq!(page.images[0].ctm.unit_bounds(), (10.0, 20.0, 12.0, 23.0));
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41]), "A");
        assert_eq!(decode_text_simple(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}
