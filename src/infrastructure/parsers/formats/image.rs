//! Standalone raster images

use std::io::Cursor;

use image::ImageReader;

use super::{ExtractionDepth, Extracted, OcrCandidate};
use crate::domain::document::{mime, ImageInfo};
use crate::domain::parser::ParseError;

/// Width and height from the image header, without decoding pixels
pub fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn format_name(mime_type: &str) -> &'static str {
    match mime::essence(mime_type).as_str() {
        mime::PNG => "png",
        mime::JPEG => "jpeg",
        mime::TIFF => "tiff",
        "image/gif" => "gif",
        _ => "unknown",
    }
}

fn ocr_mime(mime_type: &str) -> &'static str {
    match format_name(mime_type) {
        "png" => mime::PNG,
        "jpeg" => mime::JPEG,
        "tiff" => mime::TIFF,
        _ => mime::OCTET_STREAM,
    }
}

/// Describe the image and queue it for OCR; its text comes only from OCR
pub fn extract(content: &[u8], mime_type: &str, depth: ExtractionDepth) -> Result<Extracted, ParseError> {
    let (width, height) = probe_dimensions(content)
        .ok_or_else(|| ParseError::corrupt("Image header could not be decoded"))?;

    let mut extracted = Extracted {
        page_count: Some(1),
        ..Default::default()
    };

    if depth.images {
        extracted
            .images
            .push(ImageInfo::new(format_name(mime_type), Some(1)).with_dimensions(width, height));
    }

    if depth.ocr {
        extracted.ocr_candidates.push(OcrCandidate {
            page: Some(1),
            data: content.to_vec(),
            mime_type: ocr_mime(mime_type),
        });
    }

    Ok(extracted)
}
