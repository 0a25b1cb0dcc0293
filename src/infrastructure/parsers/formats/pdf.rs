//! PDF extraction

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::warn;

use super::{
    detect_aligned_tables, infer_heading_level, join_pages, DocumentProperties, ExtractionDepth,
    Extracted, OcrCandidate,
};
use crate::domain::document::{mime, ImageInfo, Section};
use crate::domain::parser::ParseError;

/// Follow an indirect reference, leaving direct objects untouched
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, object).as_dict().ok()
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise PDFDocEncoding)
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Render `D:YYYYMMDDHHmmSS...` as an ISO-8601 timestamp when possible
fn normalize_pdf_date(raw: &str) -> String {
    let digits = raw.strip_prefix("D:").unwrap_or(raw);

    let Some(stamp) = digits.get(..14) else {
        return raw.to_string();
    };

    if stamp.bytes().all(|b| b.is_ascii_digit()) {
        return format!(
            "{}-{}-{}T{}:{}:{}",
            &stamp[0..4],
            &stamp[4..6],
            &stamp[6..8],
            &stamp[8..10],
            &stamp[10..12],
            &stamp[12..14]
        );
    }

    raw.to_string()
}

fn info_properties(doc: &Document) -> DocumentProperties {
    let mut props = DocumentProperties::default();

    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|object| resolve_dict(doc, object))
    else {
        return props;
    };

    let text = |key: &[u8]| -> Option<String> {
        match resolve(doc, info.get(key).ok()?) {
            Object::String(bytes, _) => {
                let value = decode_pdf_string(bytes).trim().to_string();
                (!value.is_empty()).then_some(value)
            }
            _ => None,
        }
    };

    props.title = text(b"Title");
    props.author = text(b"Author");
    props.subject = text(b"Subject");
    props.creator = text(b"Creator");
    props.producer = text(b"Producer");
    props.creation_date = text(b"CreationDate").map(|d| normalize_pdf_date(&d));
    props.modification_date = text(b"ModDate").map(|d| normalize_pdf_date(&d));

    props
}

/// Image XObjects reachable from a page's resources, inherited through `Parent`
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<&lopdf::Stream> {
    let mut current = doc.get_dictionary(page_id).ok();

    while let Some(node) = current {
        let xobjects = node
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(doc, r))
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|x| resolve_dict(doc, x));

        if let Some(xobjects) = xobjects {
            return xobjects
                .iter()
                .filter_map(|(_, object)| resolve(doc, object).as_stream().ok())
                .filter(|stream| {
                    matches!(stream.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image"))
                })
                .collect();
        }

        current = node
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }

    Vec::new()
}

/// Image encoding named by the stream's last filter
fn image_format(stream: &lopdf::Stream) -> (&'static str, Option<&'static str>) {
    let filter = match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        Ok(Object::Array(filters)) => filters.last().and_then(|f| f.as_name().ok()),
        _ => None,
    };

    match filter {
        Some(b"DCTDecode") => ("jpeg", Some(mime::JPEG)),
        Some(b"JPXDecode") => ("jp2", Some("image/jp2")),
        Some(b"CCITTFaxDecode") => ("ccitt", None),
        Some(b"JBIG2Decode") => ("jbig2", None),
        _ => ("raw", None),
    }
}

fn dimension(stream: &lopdf::Stream, key: &[u8]) -> Option<u32> {
    stream
        .dict
        .get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
}

pub fn extract(content: &[u8], depth: ExtractionDepth) -> Result<Extracted, ParseError> {
    let doc = Document::load_mem(content)
        .map_err(|e| ParseError::corrupt(format!("Unreadable PDF: {}", e)))?;

    let pages = doc.get_pages();

    if pages.is_empty() {
        return Err(ParseError::corrupt("PDF has no pages"));
    }

    let mut extracted = Extracted {
        page_count: Some(pages.len() as u32),
        properties: info_properties(&doc),
        ..Default::default()
    };
    let mut page_texts = Vec::with_capacity(pages.len());

    for (&number, &page_id) in &pages {
        let text = match doc.extract_text(&[number]) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(page = number, error = %e, "Failed to extract PDF page text");
                String::new()
            }
        };

        if depth.structure {
            for line in text.lines() {
                if let Some(level) = infer_heading_level(line) {
                    extracted
                        .structure
                        .push(Section::new(line.trim(), level, Some(number)));
                }
            }
        }

        if depth.tables {
            extracted
                .tables
                .extend(detect_aligned_tables(&text, Some(number)));
        }

        if depth.images || depth.ocr {
            for stream in page_images(&doc, page_id) {
                let (format, ocr_mime) = image_format(stream);

                if depth.images {
                    let mut image = ImageInfo::new(format, Some(number));
                    image.width = dimension(stream, b"Width");
                    image.height = dimension(stream, b"Height");
                    extracted.images.push(image);
                }

                if depth.ocr && text.is_empty() {
                    if let Some(mime_type) = ocr_mime {
                        extracted.ocr_candidates.push(OcrCandidate {
                            page: Some(number),
                            data: stream.content.clone(),
                            mime_type,
                        });
                    }
                }
            }
        }

        page_texts.push(text);
    }

    if doc.trailer.get(b"Encrypt").is_ok() && page_texts.iter().all(String::is_empty) {
        return Err(ParseError::corrupt(
            "PDF is encrypted and its text could not be decrypted",
        ));
    }

    extracted.text = join_pages(&page_texts);
    extracted.page_texts = page_texts;

    Ok(extracted)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parser::ParseErrorKind;

    #[test]
    fn test_decode_utf16_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
        assert_eq!(decode_pdf_string(b"Plain"), "Plain");
    }

    #[test]
    fn test_normalize_pdf_date() {
        assert_eq!(normalize_pdf_date("D:20240301120000Z"), "2024-03-01T12:00:00");
        assert_eq!(normalize_pdf_date("yesterday"), "yesterday");
        assert_eq!(normalize_pdf_date("D:2024030112000éZ"), "D:2024030112000éZ");
        assert_eq!(normalize_pdf_date("D:202403011200"), "D:202403011200");
    }

    #[test]
    fn test_non_ascii_creation_date_is_kept_verbatim() {
        let mut doc = Document::load_mem(&fixtures::report()).unwrap();
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        doc.get_object_mut(info_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set(
                "CreationDate",
                Object::String(b"D:2024030112000\xE9Z".to_vec(), lopdf::StringFormat::Literal),
            );
        let mut content = Vec::new();
        doc.save_to(&mut content).unwrap();

        let extracted = extract(&content, ExtractionDepth::full(true, false)).unwrap();

        assert_eq!(
            extracted.properties.creation_date.as_deref(),
            Some("D:2024030112000\u{e9}Z")
        );
        assert!(extracted.text.contains("INTRODUCTION"));
    }

    #[test]
    fn test_text_only_extraction() {
        let extracted = extract(&fixtures::report(), ExtractionDepth::text_only()).unwrap();

        assert_eq!(extracted.page_count, Some(2));
        assert!(extracted.text.contains("INTRODUCTION"));
        assert!(extracted.text.contains("Alice"));
        assert_eq!(extracted.properties.title.as_deref(), Some("Pipeline Report"));
        assert_eq!(
            extracted.properties.creation_date.as_deref(),
            Some("2024-03-01T12:00:00")
        );
        assert!(extracted.structure.is_empty());
        assert!(extracted.tables.is_empty());
    }

    #[test]
    fn test_full_extraction_finds_headings_and_table() {
        let extracted = extract(&fixtures::report(), ExtractionDepth::full(true, false)).unwrap();

        let headings: Vec<_> = extracted
            .structure
            .headings
            .iter()
            .map(|s| (s.text.as_str(), s.level, s.page))
            .collect();
        assert_eq!(
            headings,
            vec![("INTRODUCTION", 1, Some(1)), ("Results:", 2, Some(2))]
        );

        assert_eq!(extracted.tables.len(), 1);
        assert_eq!(extracted.tables[0].page, Some(2));
        assert_eq!(extracted.tables[0].columns, 3);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let err = extract(b"%PDF-1.4 this is not really a pdf", ExtractionDepth::text_only())
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Corrupt);
    }
}
