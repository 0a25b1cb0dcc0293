//! MIME type detection
//!
//! Content sniffing wins for binary formats, then the caller's declared
//! type, then the filename extension.

pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const HTML: &str = "text/html";
pub const MARKDOWN: &str = "text/markdown";
pub const TEXT: &str = "text/plain";
pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const TIFF: &str = "image/tiff";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Raster formats whose text only exists through OCR
pub fn is_image(mime: &str) -> bool {
    essence(mime).starts_with("image/")
}

/// Lowercase MIME type without parameters
pub fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Resolve the MIME type of an input
pub fn detect_mime(filename: &str, content: &[u8], declared: Option<&str>) -> String {
    if let Some(sniffed) = sniff_binary(content) {
        return sniffed.to_string();
    }

    if let Some(declared) = declared.map(essence) {
        if !declared.is_empty() && declared != OCTET_STREAM {
            return declared;
        }
    }

    if let Some(by_extension) = from_extension(filename) {
        return by_extension;
    }

    if looks_like_html(content) {
        return HTML.to_string();
    }

    if std::str::from_utf8(content).is_ok() {
        return TEXT.to_string();
    }

    OCTET_STREAM.to_string()
}

fn from_extension(filename: &str) -> Option<String> {
    let extension = std::path::Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    match extension.as_str() {
        "md" | "markdown" => Some(MARKDOWN.to_string()),
        "txt" | "text" => Some(TEXT.to_string()),
        _ => mime_guess::from_ext(&extension)
            .first_raw()
            .map(str::to_string),
    }
}

fn sniff_binary(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(b"%PDF") {
        return Some(PDF);
    }

    if content.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some(PNG);
    }

    if content.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(JPEG);
    }

    if content.starts_with(b"II*\0") || content.starts_with(b"MM\0*") {
        return Some(TIFF);
    }

    if content.starts_with(b"PK\x03\x04") {
        return sniff_office_zip(content);
    }

    None
}

/// OOXML packages store entry names uncompressed in local headers
fn sniff_office_zip(content: &[u8]) -> Option<&'static str> {
    if contains(content, b"word/") {
        Some(DOCX)
    } else if contains(content, b"ppt/") {
        Some(PPTX)
    } else if contains(content, b"xl/") {
        Some(XLSX)
    } else {
        None
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn looks_like_html(content: &[u8]) -> bool {
    let head = &content[..content.len().min(512)];
    let head = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();

    head.starts_with("<!doctype html") || head.starts_with("<html")
}
