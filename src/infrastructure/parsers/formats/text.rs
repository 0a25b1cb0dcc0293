//! Plain text extraction

use super::{detect_aligned_tables, infer_heading_level, ExtractionDepth, Extracted};
use crate::domain::document::Section;

/// Decode text, dropping a UTF-8 byte order mark and replacing invalid sequences
pub fn decode(content: &[u8]) -> String {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    String::from_utf8_lossy(content).into_owned()
}

pub fn extract(content: &[u8], depth: ExtractionDepth) -> Extracted {
    let text = decode(content);
    let mut extracted = Extracted::from_text(text);

    if depth.structure {
        let mut previous_blank = true;

        for line in extracted.text.lines() {
            let trimmed = line.trim();

            if previous_blank {
                if let Some(level) = infer_heading_level(trimmed) {
                    extracted.structure.push(Section::new(trimmed, level, None));
                }
            }

            previous_blank = trimmed.is_empty() || infer_heading_level(trimmed).is_some();
        }
    }

    if depth.tables {
        extracted.tables = detect_aligned_tables(&extracted.text, None);
    }

    extracted
}
