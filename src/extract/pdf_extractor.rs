//! Primitive extraction from PDF files using lopdf.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use rayon::prelude::*;

use super::content::ContentScanner;
use super::detect::{sniff_bytes, sniff_path, PdfHeader};
use super::images::{is_image, ImageExporter};
use super::lines::group_into_lines;
use super::options::{ErrorMode, ExtractOptions};
use super::tables::TableDetector;
use crate::error::{Error, Result};
use crate::model::{
    ExtractedDocument, ImagePrimitive, PageSize, Rect, TablePrimitive, TextPrimitive,
};

/// Primitives found on one page.
#[derive(Debug, Clone, Default)]
struct PageExtraction {
    blocks: Vec<TextPrimitive>,
    tables: Vec<TablePrimitive>,
    images: Vec<ImagePrimitive>,
}

/// Extracts text lines, tables and images from a PDF.
pub struct PdfExtractor {
    doc: LopdfDocument,
    header: PdfHeader,
    options: ExtractOptions,
    detector: TableDetector,
}

impl PdfExtractor {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ExtractOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let path = path.as_ref();
        let header = sniff_path(path)?;
        let doc = LopdfDocument::load(path)?;
        Ok(Self::with_document(doc, header, options))
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ExtractOptions::default())
    }

    /// Load a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ExtractOptions) -> Result<Self> {
        let header = sniff_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::with_document(doc, header, options))
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R, options: ExtractOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    fn with_document(doc: LopdfDocument, header: PdfHeader, options: ExtractOptions) -> Self {
        if doc.is_encrypted() {
            log::warn!("document is encrypted; text may not decode");
        }
        Self {
            doc,
            header,
            options,
            detector: TableDetector::new(),
        }
    }

    /// Replace the table detector.
    pub fn with_detector(mut self, detector: TableDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Number of pages in the source.
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Header version, e.g. "1.7".
    pub fn version(&self) -> &str {
        &self.header.version
    }

    /// Whether the source is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Size of a page from its MediaBox, Letter when missing.
    pub fn page_size(&self, page_num: u32) -> Result<PageSize> {
        let pages = self.doc.get_pages();
        let page_id = pages
            .get(&page_num)
            .ok_or(Error::PageOutOfRange(page_num, pages.len() as u32))?;
        Ok(self.media_box(*page_id))
    }

    /// Extract every selected page.
    pub fn extract(&self) -> Result<ExtractedDocument> {
        if self.options.extract_images {
            fs::create_dir_all(&self.options.image_dir)?;
        }

        let pages: Vec<(u32, ObjectId)> = self
            .doc
            .get_pages()
            .into_iter()
            .filter(|(num, _)| self.options.pages.includes(*num))
            .collect();
        log::info!("extracting {} pages", pages.len());

        let run = |&(num, id): &(u32, ObjectId)| (num, id, self.extract_page(num, id));
        let results: Vec<_> = if self.options.parallel {
            pages.par_iter().map(run).collect()
        } else {
            pages.iter().map(run).collect()
        };

        let mut document = ExtractedDocument::new();
        for (num, id, result) in results {
            document.add_page(num, self.media_box(id));
            match result {
                Ok(page) => {
                    document.blocks.extend(page.blocks);
                    document.tables.extend(page.tables);
                    document.images.extend(page.images);
                }
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("page {} skipped: {}", num, e);
                }
                Err(e) => return Err(e),
            }
        }

        log::info!(
            "extracted {} lines, {} tables, {} images",
            document.blocks.len(),
            document.tables.len(),
            document.images.len()
        );
        Ok(document)
    }

    fn extract_page(&self, page_num: u32, page_id: ObjectId) -> Result<PageExtraction> {
        let size = self.media_box(page_id);
        let fonts = self.doc.get_page_fonts(page_id)?;
        let content = self.doc.get_page_content(page_id)?;
        let scanned = ContentScanner::new(&self.doc, &fonts).scan(&content)?;

        let mut page = PageExtraction::default();

        if self.options.detect_tables {
            for table in self.detector.detect(&scanned.spans) {
                page.tables
                    .push(self.detector.to_primitive(&table, page_num, size.height));
            }
        }

        for line in group_into_lines(scanned.spans) {
            for segment in line.split_at_gaps() {
                if let Some(block) = segment.to_primitive(page_num, size.height) {
                    page.blocks.push(block);
                }
            }
        }

        if self.options.extract_images && !scanned.images.is_empty() {
            let xobjects = self.page_xobjects(page_id);
            let exporter = ImageExporter::new(&self.options.image_dir);

            for (index, invocation) in scanned.images.iter().enumerate() {
                let Some(id) = xobjects.get(&invocation.name).copied() else {
                    continue;
                };
                let stem = format!("page{}_img{}", page_num, index);
                let path = match exporter.export(&self.doc, id, &stem) {
                    Ok(path) => path,
                    Err(e) => {
                        log::debug!("page {}: image {} not exported: {}", page_num, stem, e);
                        continue;
                    }
                };

                let (x0, y0, x1, y1) = invocation.ctm.unit_bounds();
                let rect = Rect::new(x0, size.height - y1, x1 - x0, y1 - y0);
                page.images.push(if rect.is_valid() {
                    ImagePrimitive::placed(page_num, rect, path)
                } else {
                    ImagePrimitive::unplaced(page_num, path)
                });
            }
        }

        log::debug!(
            "page {}: {} lines, {} tables, {} images",
            page_num,
            page.blocks.len(),
            page.tables.len(),
            page.images.len()
        );
        Ok(page)
    }

    fn media_box(&self, page_id: ObjectId) -> PageSize {
        let media_box = self
            .doc
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"MediaBox"))
            .and_then(Object::as_array);

        match media_box {
            Ok(values) if values.len() >= 4 => {
                let coord = |i: usize| values[i].as_float().ok();
                match (coord(0), coord(1), coord(2), coord(3)) {
                    (Some(x0), Some(y0), Some(x1), Some(y1)) if x1 > x0 && y1 > y0 => {
                        PageSize::new(x1 - x0, y1 - y0)
                    }
                    _ => PageSize::letter(),
                }
            }
            _ => PageSize::letter(),
        }
    }

    /// Image XObjects in the page's resources, by resource name.
    fn page_xobjects(&self, page_id: ObjectId) -> BTreeMap<Vec<u8>, ObjectId> {
        let mut found = BTreeMap::new();

        let resources = self
            .doc
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Resources"))
            .ok()
            .and_then(|res| self.deref_dict(res));
        let xobjects = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| self.deref_dict(obj));

        if let Some(xobjects) = xobjects {
            for (name, obj) in xobjects.iter() {
                let Ok(id) = obj.as_reference() else {
                    continue;
                };
                let image = self
                    .doc
                    .get_object(id)
                    .and_then(Object::as_stream)
                    .map(|stream| is_image(&stream.dict))
                    .unwrap_or(false);
                if image {
                    found.insert(name.clone(), id);
                }
            }
        }

        found
    }

    fn deref_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}
