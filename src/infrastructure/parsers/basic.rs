//! Text-only parser variant

use async_trait::async_trait;

use crate::domain::document::{mime, ParsedDocument};
use crate::domain::parser::{
    DocumentParser, ParseError, ParserCapabilities, ParserInput, ParserVariant,
};

use super::deadline::run_blocking_with_deadline;
use super::formats::{self, clean_text, ExtractionDepth};

const MIME_TYPES: &[&str] = &[mime::PDF, mime::DOCX, mime::TEXT, mime::MARKDOWN];

/// Lightweight parser that extracts plain text only
///
/// Always available; used directly in fast mode and as the fallback when
/// the advanced backend is missing or fails.
#[derive(Debug, Clone, Default)]
pub struct BasicParser;

impl BasicParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for BasicParser {
    fn variant(&self) -> ParserVariant {
        ParserVariant::Basic
    }

    fn supported_mime_types(&self) -> &[&str] {
        MIME_TYPES
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities::text_only()
    }

    fn relative_cost(&self) -> u8 {
        1
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, ParseError> {
        input.ensure_within_size_limit()?;

        if !self.supports(&input.mime_type) {
            return Err(ParseError::unsupported(&input.mime_type).with_parser(self.variant()));
        }

        let file_size = input.file_size();
        let mime_type = mime::essence(&input.mime_type);
        let content = input.content.clone();
        let job_mime = mime_type.clone();

        let mut extracted = run_blocking_with_deadline(input.options.timeout(), move || {
            formats::extract(&job_mime, &content, ExtractionDepth::text_only())
        })
        .await
        .map_err(|e| e.with_parser(self.variant()))?;

        extracted.text = clean_text(&extracted.text);

        Ok(extracted.into_document(&input.filename, file_size, self.variant(), &mime_type))
    }
}
