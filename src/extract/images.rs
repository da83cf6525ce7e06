//! Export of image XObjects to files.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Writes image XObjects of a document into a directory.
#[derive(Debug, Clone)]
pub struct ImageExporter {
    dir: PathBuf,
}

impl ImageExporter {
    /// Export into `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one image XObject as `<stem>.jpg` or `<stem>.png`.
    ///
    /// DCT streams are copied verbatim; 8-bit RGB, gray and CMYK samples are
    /// re-encoded as PNG. Anything else is rejected.
    pub fn export(&self, doc: &LopdfDocument, id: ObjectId, stem: &str) -> Result<PathBuf> {
        let stream = match doc.get_object(id)? {
            Object::Stream(stream) => stream,
            _ => return Err(Error::Pdf(format!("object {:?} is not a stream", id))),
        };
        if !is_image(&stream.dict) {
            return Err(Error::Pdf(format!("object {:?} is not an image", id)));
        }

        if last_filter(&stream.dict).as_deref() == Some("DCTDecode") {
            let path = self.dir.join(format!("{}.jpg", stem));
            fs::write(&path, &stream.content)?;
            return Ok(path);
        }

        let path = self.dir.join(format!("{}.png", stem));
        write_png(doc, stream, &path)?;
        Ok(path)
    }
}

/// Whether a dictionary describes an image XObject.
pub(crate) fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name_str)
        .map(|s| s == "Image")
        .unwrap_or(false)
}

fn last_filter(dict: &Dictionary) -> Option<String> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Array(filters) => filters
            .last()
            .and_then(|f| f.as_name_str().ok())
            .map(str::to_string),
        _ => None,
    }
}

fn int(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
}

/// Number of color components, following one level of indirection.
fn components(doc: &LopdfDocument, dict: &Dictionary) -> Option<usize> {
    let space = match dict.get(b"ColorSpace").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let name = match space {
        Object::Name(name) => name.as_slice(),
        Object::Array(items) => match items.first()? {
            Object::Name(name) => name.as_slice(),
            _ => return None,
        },
        _ => return None,
    };
    match name {
        b"DeviceRGB" | b"CalRGB" => Some(3),
        b"DeviceGray" | b"CalGray" => Some(1),
        b"DeviceCMYK" => Some(4),
        _ => None,
    }
}

fn write_png(doc: &LopdfDocument, stream: &Stream, path: &Path) -> Result<()> {
    let dict = &stream.dict;
    let (width, height) = match (int(dict, b"Width"), int(dict, b"Height")) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(Error::Pdf("image without dimensions".into())),
    };
    if int(dict, b"BitsPerComponent") != Some(8) {
        return Err(Error::Pdf("only 8-bit images are exported".into()));
    }
    let channels = components(doc, dict)
        .ok_or_else(|| Error::Pdf("unsupported image color space".into()))?;

    let samples = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let expected = width as usize * height as usize * channels;
    if samples.len() < expected {
        return Err(Error::Pdf(format!(
            "image data too short: {} < {}",
            samples.len(),
            expected
        )));
    }
    let samples = &samples[..expected];

    let short = || Error::Pdf("image buffer size mismatch".into());
    match channels {
        1 => image::GrayImage::from_raw(width, height, samples.to_vec())
            .ok_or_else(short)?
            .save_with_format(path, image::ImageFormat::Png)?,
        3 => image::RgbImage::from_raw(width, height, samples.to_vec())
            .ok_or_else(short)?
            .save_with_format(path, image::ImageFormat::Png)?,
        _ => image::RgbImage::from_raw(width, height, cmyk_to_rgb(samples))
            .ok_or_else(short)?
            .save_with_format(path, image::ImageFormat::Png)?,
    }
    Ok(())
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u16;
            [px[0], px[1], px[2]].map(|c| ((255 - c as u16) * k / 255) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn raw_image(doc: &mut LopdfDocument, space: &str, content: Vec<u8>) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 1,
            "BitsPerComponent" => 8,
            "ColorSpace" => Object::Name(space.as_bytes().to_vec()),
        };
        doc.add_object(Stream::new(dict, content))
    }

    #[test]
    fn test_export_rgb_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = LopdfDocument::with_version("1.5");
        let id = raw_image(&mut doc, "DeviceRGB", vec![255, 0, 0, 0, 0, 255]);

        let path = ImageExporter::new(dir.path())
            .export(&doc, id, "page1_img0")
            .unwrap();
        assert_eq!(path.extension().unwrap(), "png");

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn test_export_jpeg_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = LopdfDocument::with_version("1.5");
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Filter" => "DCTDecode",
            },
            bytes.clone(),
        ));

        let path = ImageExporter::new(dir.path()).export(&doc, id, "a").unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(fs::read(path).unwrap(), bytes);
    }

    #[test]
    fn test_rejects_short_data_and_forms() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = LopdfDocument::with_version("1.5");
        let short = raw_image(&mut doc, "DeviceRGB", vec![1, 2, 3]);
        let form = doc.add_object(Stream::new(dictionary! { "Subtype" => "Form" }, vec![]));

        let exporter = ImageExporter::new(dir.path());
        assert!(exporter.export(&doc, short, "s").is_err());
        assert!(exporter.export(&doc, form, "f").is_err());
    }

    #[test]
    fn test_cmyk_conversion() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), vec![0, 255, 255]);
    }
}
