//! PDF output through lopdf.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::options::RenderOptions;
use super::surface::{check_text_position, DrawSurface};
use crate::error::{Error, Result};
use crate::font::{EmbeddedFont, ResolvedFont};
use crate::layout::{PlannedTable, PlannedText};
use crate::model::{CanvasRect, PageSize};

const FONT_KEY: &str = "F1";

struct OpenPage {
    size: PageSize,
    operations: Vec<Operation>,
    images: Vec<(String, ObjectId)>,
    uses_font: bool,
}

/// Output of one draw call, moved onto the page only once the call succeeds.
#[derive(Default)]
struct Pending {
    operations: Vec<Operation>,
    glyphs: BTreeMap<u16, char>,
    uses_font: bool,
}

/// A [`DrawSurface`] that builds a PDF document in memory and writes it on save.
pub struct PdfSurface {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    font: ResolvedFont,
    used_glyphs: BTreeMap<u16, char>,
    font_used: bool,
    page_ids: Vec<ObjectId>,
    current: Option<OpenPage>,
    images: HashMap<PathBuf, ObjectId>,
    compress: bool,
    title: Option<String>,
    finalized: bool,
}

impl PdfSurface {
    /// Create an empty document drawing all text with `font`.
    pub fn new(font: ResolvedFont, options: &RenderOptions) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            font_id,
            font,
            used_glyphs: BTreeMap::new(),
            font_used: false,
            page_ids: Vec::new(),
            current: None,
            images: HashMap::new(),
            compress: options.compress,
            title: options.title.clone(),
            finalized: false,
        }
    }

    /// Number of sealed pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_mut(&mut self) -> Result<&mut OpenPage> {
        self.current
            .as_mut()
            .ok_or_else(|| Error::Other("no open page".into()))
    }

    /// Encode one line for the active font, noting the glyphs it uses.
    fn encode_text(&self, text: &str, glyphs: &mut BTreeMap<u16, char>) -> Result<Object> {
        match &self.font {
            ResolvedFont::Embedded(font) => {
                let ids = font.glyph_ids(text)?;
                let mut bytes = Vec::with_capacity(ids.len() * 2);
                let mut missing = 0;
                for (gid, ch) in ids {
                    if gid == 0 {
                        missing += 1;
                    } else {
                        glyphs.entry(gid).or_insert(ch);
                    }
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                if missing > 0 {
                    log::debug!("{} characters have no glyph in {}", missing, font.name());
                }
                Ok(Object::String(bytes, StringFormat::Hexadecimal))
            }
            ResolvedFont::Builtin => {
                let (bytes, replaced) = encode_win_ansi(text);
                if replaced > 0 {
                    log::debug!("{} characters replaced for the built-in font", replaced);
                }
                Ok(Object::String(bytes, StringFormat::Literal))
            }
        }
    }

    fn text_ops(&self, pending: &mut Pending, text: &str, x: f32, y: f32, font_size: f32) -> Result<()> {
        check_text_position(x, y, font_size)?;
        if text.is_empty() {
            return Ok(());
        }
        let encoded = self.encode_text(text, &mut pending.glyphs)?;
        pending.uses_font = true;
        pending.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(FONT_KEY.into()), real(font_size)]),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new("Tj", vec![encoded]),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn commit(&mut self, pending: Pending) -> Result<()> {
        let page = self.page_mut()?;
        page.operations.extend(pending.operations);
        page.uses_font |= pending.uses_font;
        self.font_used |= pending.uses_font;
        for (gid, ch) in pending.glyphs {
            self.used_glyphs.entry(gid).or_insert(ch);
        }
        Ok(())
    }

    fn image_object(&mut self, path: &Path) -> Result<ObjectId> {
        if let Some(id) = self.images.get(path) {
            return Ok(*id);
        }

        let data = std::fs::read(path).map_err(|e| Error::AssetIo {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let stream = image_stream(&mut self.doc, &data).map_err(|reason| Error::AssetIo {
            path: path.to_path_buf(),
            reason,
        })?;
        let id = self.doc.add_object(stream);
        self.images.insert(path.to_path_buf(), id);
        Ok(id)
    }

    fn write_font(&mut self) -> Result<()> {
        let embedded = match &self.font {
            ResolvedFont::Embedded(font) => Some(font.clone()),
            ResolvedFont::Builtin => None,
        };
        let font = match embedded {
            Some(font) => self.type0_font(&font)?,
            None => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            },
        };
        self.doc.objects.insert(self.font_id, Object::Dictionary(font));
        Ok(())
    }

    fn type0_font(&mut self, font: &EmbeddedFont) -> Result<Dictionary> {
        let metrics = font.metrics()?;
        let name = font.name().as_bytes().to_vec();

        let file = Stream::new(
            dictionary! { "Length1" => Object::Integer(font.data().len() as i64) },
            font.data().to_vec(),
        );
        let file_id = self.doc.add_object(file);

        let descriptor_id = self.doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(name.clone()),
            "Flags" => Object::Integer(32),
            "FontBBox" => metrics.bbox.iter().map(|v| Object::Integer(*v as i64)).collect::<Vec<_>>(),
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => Object::Integer(metrics.ascent as i64),
            "Descent" => Object::Integer(metrics.descent as i64),
            "CapHeight" => Object::Integer(metrics.cap_height as i64),
            "StemV" => Object::Integer(80),
            "FontFile2" => file_id,
        });

        let mut widths = Vec::with_capacity(self.used_glyphs.len() * 2);
        for gid in self.used_glyphs.keys() {
            widths.push(Object::Integer(*gid as i64));
            widths.push(Object::Array(vec![Object::Integer(font.advance(*gid)? as i64)]));
        }

        let cid_font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(name.clone()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => descriptor_id,
            "DW" => Object::Integer(1000),
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let cmap = Stream::new(Dictionary::new(), to_unicode_cmap(&self.used_glyphs).into_bytes());
        let cmap_id = self.doc.add_object(cmap);

        Ok(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(name),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => cmap_id,
        })
    }

    fn finalize(&mut self) -> Result<()> {
        if self.font_used {
            self.write_font()?;
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(self.page_ids.len() as i64),
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal(format!("repdf {}", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(
                chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string()
            ),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Info", info_id);

        self.finalized = true;
        Ok(())
    }
}

impl DrawSurface for PdfSurface {
    fn begin_page(&mut self, size: PageSize) -> Result<()> {
        if self.current.is_some() {
            return Err(Error::Other("previous page not finished".into()));
        }
        if self.finalized {
            return Err(Error::Other("document already saved".into()));
        }
        self.current = Some(OpenPage {
            size,
            operations: Vec::new(),
            images: Vec::new(),
            uses_font: false,
        });
        Ok(())
    }

    fn draw_image(&mut self, path: &Path, rect: CanvasRect) -> Result<()> {
        // Fail before decoding if no page is open.
        self.page_mut()?;
        let image_id = self.image_object(path)?;

        let page = self.page_mut()?;
        let name = format!("Im{}", page.images.len() + 1);
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(rect.width),
                    real(0.0),
                    real(0.0),
                    real(rect.height),
                    real(rect.x),
                    real(rect.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        page.images.push((name, image_id));
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32) -> Result<()> {
        self.page_mut()?;
        let mut pending = Pending::default();
        self.text_ops(&mut pending, text, x, y, font_size)?;
        self.commit(pending)
    }

    fn draw_block(&mut self, block: &PlannedText) -> Result<()> {
        self.page_mut()?;
        let mut pending = Pending::default();
        for line in &block.lines {
            self.text_ops(&mut pending, &line.text, line.x, line.y, block.font_size)?;
        }
        self.commit(pending)
    }

    fn draw_table(&mut self, table: &PlannedTable) -> Result<()> {
        self.page_mut()?;
        let left = table.rect.x;
        let right = table.rect.x + table.rect.width;
        let bottom = table.rect.y;
        let top = table.rect.top();

        let mut pending = Pending::default();
        let ops = &mut pending.operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![real(table.line_width)]));
        for x in table.column_lines() {
            ops.push(Operation::new("m", vec![real(x), real(bottom)]));
            ops.push(Operation::new("l", vec![real(x), real(top)]));
        }
        for y in table.row_lines() {
            ops.push(Operation::new("m", vec![real(left), real(y)]));
            ops.push(Operation::new("l", vec![real(right), real(y)]));
        }
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));

        for line in table.cell_lines() {
            self.text_ops(&mut pending, &line.text, line.x, line.y, table.font_size)?;
        }
        self.commit(pending)
    }

    fn finish_page(&mut self) -> Result<()> {
        let page = self
            .current
            .take()
            .ok_or_else(|| Error::Other("no open page".into()))?;

        let content = Content {
            operations: page.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut resources = Dictionary::new();
        if page.uses_font {
            resources.set("Font", dictionary! { FONT_KEY => self.font_id });
        }
        if !page.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for (name, id) in page.images {
                xobjects.set(name, Object::Reference(id));
            }
            resources.set("XObject", xobjects);
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(page.size.width), real(page.size.height)],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        if self.current.is_some() {
            return Err(Error::Other("cannot save with an open page".into()));
        }
        if !self.finalized {
            self.finalize()?;
            if self.compress {
                self.doc.compress();
            }
        }
        self.doc.save(path)?;
        log::info!("Wrote {} pages to {}", self.page_ids.len(), path.display());
        Ok(())
    }
}

fn real(value: f32) -> Object {
    Object::from(value)
}

/// Build an image XObject. JPEG data is embedded as is; everything else is
/// flattened to RGB with an optional alpha soft mask.
fn image_stream(doc: &mut Document, data: &[u8]) -> std::result::Result<Stream, String> {
    let format = image::guess_format(data).map_err(|e| e.to_string())?;
    let decoded = image::load_from_memory(data).map_err(|e| e.to_string())?;
    let (width, height) = (decoded.width(), decoded.height());

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(width as i64),
        "Height" => Object::Integer(height as i64),
        "BitsPerComponent" => Object::Integer(8),
    };

    if format == image::ImageFormat::Jpeg {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "DeviceGray",
            _ => "DeviceRGB",
        };
        dict.set("ColorSpace", color_space);
        dict.set("Filter", "DCTDecode");
        return Ok(Stream::new(dict, data.to_vec()).with_compression(false));
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    if alpha.iter().any(|a| *a != 255) {
        let mask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => "FlateDecode",
        };
        let mask_id = doc.add_object(
            Stream::new(mask, flate_compress(&alpha).map_err(|e| e.to_string())?)
                .with_compression(false),
        );
        dict.set("SMask", mask_id);
    }

    dict.set("ColorSpace", "DeviceRGB");
    dict.set("Filter", "FlateDecode");
    let compressed = flate_compress(&rgb).map_err(|e| e.to_string())?;
    Ok(Stream::new(dict, compressed).with_compression(false))
}

fn flate_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Encode text as WinAnsi bytes. Unencodable characters become `?`.
fn encode_win_ansi(text: &str) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(text.len());
    let mut replaced = 0;

    for ch in text.chars() {
        let byte = match ch {
            '\u{0020}'..='\u{007E}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            '\t' => b' ',
            _ => {
                replaced += 1;
                b'?'
            }
        };
        out.push(byte);
    }

    (out, replaced)
}

/// ToUnicode CMap mapping glyph ids back to characters.
fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(&u16, &char)> = glyphs.iter().collect();
    // bfchar blocks hold at most 100 entries
    for chunk in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let hex: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            out.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    out
}
