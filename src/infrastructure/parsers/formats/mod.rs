//! Per-format extraction
//!
//! Extractors are synchronous and run on the blocking pool. Each one turns
//! raw bytes into an [`Extracted`] at a requested [`ExtractionDepth`]; the
//! parser variants turn that into a `ParsedDocument`.

pub mod docx;
pub mod html;
pub mod image;
pub mod markdown;
mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod text;
pub mod xlsx;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::document::{
    mime, DocumentMetadata, DocumentStructure, ImageInfo, ParsedDocument, TableData,
};
use crate::domain::parser::{ParseError, ParserVariant};

/// How much beyond plain text an extractor should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionDepth {
    pub structure: bool,
    pub tables: bool,
    pub images: bool,
    /// Collect page images that need OCR to yield text
    pub ocr: bool,
}

impl ExtractionDepth {
    pub fn text_only() -> Self {
        Self {
            structure: false,
            tables: false,
            images: false,
            ocr: false,
        }
    }

    pub fn full(tables: bool, ocr: bool) -> Self {
        Self {
            structure: true,
            tables,
            images: true,
            ocr,
        }
    }
}

/// Document-level properties found in format metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// An embedded raster that must be OCR'd for its page to have text
#[derive(Debug, Clone)]
pub struct OcrCandidate {
    pub page: Option<u32>,
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

/// Raw extraction result
#[derive(Debug, Default)]
pub struct Extracted {
    pub text: String,
    /// Per-page text for paged formats, empty otherwise
    pub page_texts: Vec<String>,
    pub page_count: Option<u32>,
    pub properties: DocumentProperties,
    pub structure: DocumentStructure,
    pub tables: Vec<TableData>,
    pub images: Vec<ImageInfo>,
    pub ocr_candidates: Vec<OcrCandidate>,
}

impl Extracted {
    pub fn from_text(text: String) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }

    /// Merge recognized text into its page, or append it for unpaged input
    pub fn merge_ocr_text(&mut self, page: Option<u32>, text: &str) {
        let text = text.trim();

        if text.is_empty() {
            return;
        }

        match page.and_then(|p| self.page_texts.get_mut(p.saturating_sub(1) as usize)) {
            Some(page_text) => {
                if !page_text.is_empty() {
                    page_text.push('\n');
                }
                page_text.push_str(text);
                self.text = join_pages(&self.page_texts);
            }
            None => {
                if !self.text.is_empty() {
                    self.text.push_str("\n\n");
                }
                self.text.push_str(text);
            }
        }
    }

    pub fn into_document(
        self,
        filename: &str,
        file_size: u64,
        variant: ParserVariant,
        mime_type: &str,
    ) -> ParsedDocument {
        let mut metadata =
            DocumentMetadata::new(filename, file_size, variant).with_mime_type(mime_type);
        metadata.page_count = self.page_count;

        let props = self.properties;
        metadata.title = props.title;
        metadata.author = props.author;
        metadata.subject = props.subject;
        metadata.creator = props.creator;
        metadata.producer = props.producer;
        metadata.creation_date = props.creation_date;
        metadata.modification_date = props.modification_date;

        ParsedDocument::new(self.text, metadata)
            .with_structure(self.structure)
            .with_tables(self.tables)
            .with_images(self.images)
            .finalize()
    }
}

/// Join non-empty page texts with a blank line between pages
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .filter(|t| !t.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Extract any supported format at the requested depth
pub fn extract(
    mime_type: &str,
    content: &[u8],
    depth: ExtractionDepth,
) -> Result<Extracted, ParseError> {
    let essence = mime::essence(mime_type);

    match essence.as_str() {
        mime::PDF => pdf::extract(content, depth),
        mime::DOCX => docx::extract(content, depth),
        mime::PPTX => pptx::extract(content, depth),
        mime::XLSX => xlsx::extract(content, depth),
        mime::HTML => Ok(html::extract(content, depth)),
        mime::MARKDOWN | "text/x-markdown" => Ok(markdown::extract(content, depth)),
        mime::TEXT => Ok(text::extract(content, depth)),
        other if mime::is_image(other) => image::extract(content, other, depth),
        other => Err(ParseError::unsupported(other)),
    }
}

static NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\.?\s+\p{Lu}").expect("valid regex"));

static CELL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}|\t").expect("valid regex"));

static INNER_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

/// Guess a heading level for a standalone line of plain text
///
/// Numbered sections take their depth from the numbering, short all-caps
/// lines are level 1, and short lines ending in a colon are level 2.
pub fn infer_heading_level(line: &str) -> Option<u8> {
    let line = line.trim();

    if line.is_empty() || line.chars().count() >= 100 || line.ends_with('.') || is_table_row(line)
    {
        return None;
    }

    if let Some(caps) = NUMBERED_HEADING.captures(line) {
        if line.chars().count() < 80 {
            let depth = caps[1].split('.').count();
            return Some(depth.clamp(1, 6) as u8);
        }
    }

    let has_letters = line.chars().any(char::is_alphabetic);
    let all_caps = line
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(char::is_uppercase);

    if has_letters && all_caps && line.chars().filter(|c| c.is_alphabetic()).count() > 2 {
        return Some(1);
    }

    if line.ends_with(':') && line.chars().count() < 50 {
        return Some(2);
    }

    None
}

/// Split a line on runs of two or more spaces or tabs
pub fn split_cells(line: &str) -> Vec<String> {
    CELL_GAP
        .split(line.trim())
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn is_table_row(line: &str) -> bool {
    split_cells(line).len() >= 2
}

/// Find runs of whitespace-aligned rows with a consistent column count
pub fn detect_aligned_tables(text: &str, page: Option<u32>) -> Vec<TableData> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    let mut flush = |run: &mut Vec<Vec<String>>| {
        if run.len() >= 2 {
            tables.push(TableData::from_rows(std::mem::take(run), page));
        }
        run.clear();
    };

    for line in text.lines() {
        let cells = split_cells(line);

        if cells.len() >= 2 && run.first().is_none_or(|first| first.len() == cells.len()) {
            run.push(cells);
            continue;
        }

        flush(&mut run);

        if cells.len() >= 2 {
            run.push(cells);
        }
    }

    flush(&mut run);

    tables
}

/// Trim lines, drop empty ones and collapse inner runs of spaces
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| INNER_SPACES.replace_all(line.trim(), " "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim line ends and keep at most one blank line between blocks
pub fn normalize_layout(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim_end();

        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }

        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }

        out.push_str(line);
        blank_run = 0;
    }

    out
}

/// Lowercase extension of a path, used to name image formats
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.split(['?', '#']).next().unwrap_or_default();

    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| match e.to_ascii_lowercase().as_str() {
            "jpg" => "jpeg".to_string(),
            "tif" => "tiff".to_string(),
            other => other.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_heuristics() {
        assert_eq!(infer_heading_level("INTRODUCTION"), Some(1));
        assert_eq!(infer_heading_level("Results:"), Some(2));
        assert_eq!(infer_heading_level("2.1 Data Sources"), Some(2));
        assert_eq!(infer_heading_level("3 Methods"), Some(1));
        assert_eq!(infer_heading_level("This is a regular sentence."), None);
        assert_eq!(infer_heading_level("OK"), None);
        assert_eq!(infer_heading_level(""), None);
    }

    #[test]
    fn test_detect_aligned_tables() {
        let text = "Intro line\nName    Score    Grade\nAlice    90    A\nBob    85    B\nTrailing text";

        let tables = detect_aligned_tables(text, Some(2));

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, 3);
        assert_eq!(tables[0].columns, 3);
        assert_eq!(tables[0].data[1], vec!["Alice", "90", "A"]);
        assert_eq!(tables[0].page, Some(2));
    }

    #[test]
    fn test_single_aligned_row_is_not_a_table() {
        assert!(detect_aligned_tables("a    b\nplain", None).is_empty());
    }

    #[test]
    fn test_clean_text() {
        let cleaned = clean_text("  Hello    world  \n\n\n   second\tline ");
        assert_eq!(cleaned, "Hello world\nsecond line");
    }

    #[test]
    fn test_normalize_layout() {
        let normalized = normalize_layout("Title   \n\n\n\nBody\nmore\n\n");
        assert_eq!(normalized, "Title\n\nBody\nmore");
    }

    #[test]
    fn test_merge_ocr_text_into_page() {
        let mut extracted = Extracted {
            page_texts: vec!["first".to_string(), String::new(), "third".to_string()],
            ..Default::default()
        };
        extracted.text = join_pages(&extracted.page_texts);

        extracted.merge_ocr_text(Some(2), "scanned second");

        assert_eq!(extracted.text, "first\n\nscanned second\n\nthird");
    }

    #[test]
    fn test_merge_ocr_text_without_pages() {
        let mut extracted = Extracted::default();

        extracted.merge_ocr_text(Some(1), " words ");

        assert_eq!(extracted.text, "words");
    }

    #[test]
    fn test_dispatch_rejects_unknown_type() {
        let err = extract("application/x-msdownload", b"MZ", ExtractionDepth::text_only())
            .unwrap_err();
        assert_eq!(err.kind, crate::domain::parser::ParseErrorKind::Unsupported);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("media/image1.JPG").as_deref(), Some("jpeg"));
        assert_eq!(extension_of("https://x.io/a.png?size=2").as_deref(), Some("png"));
        assert_eq!(extension_of("noext"), None);
    }
}
