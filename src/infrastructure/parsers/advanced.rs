//! Structure-aware parser variant

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::document::{mime, ParsedDocument};
use crate::domain::parser::{
    DocumentParser, ParseError, ParserCapabilities, ParserInput, ParserVariant,
};
use crate::infrastructure::ocr::OcrEngine;

use super::deadline::run_blocking_with_deadline;
use super::formats::{self, normalize_layout, ExtractionDepth, Extracted};

const MIME_TYPES: &[&str] = &[
    mime::PDF,
    mime::DOCX,
    mime::PPTX,
    mime::XLSX,
    mime::HTML,
    mime::MARKDOWN,
    "text/x-markdown",
    mime::TEXT,
    mime::PNG,
    mime::JPEG,
    mime::TIFF,
];

/// Parser with structural analysis, tables, images and optional OCR
///
/// OCR capability is present only when an engine is configured.
#[derive(Debug, Clone)]
pub struct AdvancedParser {
    enabled: bool,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl AdvancedParser {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, ocr: None }
    }

    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    async fn recognize_candidates(
        &self,
        engine: &dyn OcrEngine,
        extracted: &mut Extracted,
    ) -> Result<usize, ParseError> {
        let candidates = std::mem::take(&mut extracted.ocr_candidates);
        let count = candidates.len();

        for candidate in candidates {
            let text = engine
                .recognize(&candidate.data, candidate.mime_type)
                .await
                .map_err(ParseError::from)?;
            extracted.merge_ocr_text(candidate.page, &text);
        }

        Ok(count)
    }
}

#[async_trait]
impl DocumentParser for AdvancedParser {
    fn variant(&self) -> ParserVariant {
        ParserVariant::Advanced
    }

    fn supported_mime_types(&self) -> &[&str] {
        MIME_TYPES
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            ocr: self.ocr.is_some(),
            tables: true,
            structure: true,
            images: true,
        }
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    fn relative_cost(&self) -> u8 {
        10
    }

    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, ParseError> {
        if !self.enabled {
            return Err(
                ParseError::backend_unavailable("Advanced parser is disabled")
                    .with_parser(self.variant()),
            );
        }

        input.ensure_within_size_limit()?;

        if !self.supports(&input.mime_type) {
            return Err(ParseError::unsupported(&input.mime_type).with_parser(self.variant()));
        }

        let started = Instant::now();
        let timeout = input.options.timeout();
        let file_size = input.file_size();
        let mime_type = mime::essence(&input.mime_type);
        let depth = ExtractionDepth::full(
            input.options.enable_table_extraction,
            input.options.enable_ocr && self.ocr.is_some(),
        );

        let content = input.content.clone();
        let job_mime = mime_type.clone();
        let mut extracted = run_blocking_with_deadline(timeout, move || {
            formats::extract(&job_mime, &content, depth)
        })
        .await
        .map_err(|e| e.with_parser(self.variant()))?;

        let mut ocr_pages = 0;

        if let Some(engine) = self.ocr.as_deref() {
            if !extracted.ocr_candidates.is_empty() {
                let remaining = timeout.saturating_sub(started.elapsed());

                ocr_pages = tokio::time::timeout(
                    remaining,
                    self.recognize_candidates(engine, &mut extracted),
                )
                .await
                .map_err(|_| ParseError::timeout(timeout.as_secs()))
                .and_then(|result| result)
                .map_err(|e| e.with_parser(self.variant()))?;

                debug!(
                    engine = engine.name(),
                    pages = ocr_pages,
                    filename = %input.filename,
                    "Recognized text in image content"
                );
            }
        }

        extracted.text = normalize_layout(&extracted.text);

        let mut document =
            extracted.into_document(&input.filename, file_size, self.variant(), &mime_type);

        if ocr_pages > 0 {
            document
                .metadata
                .extra
                .insert("ocr_pages".to_string(), serde_json::json!(ocr_pages));
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::ProcessingOptions;
    use crate::domain::parser::ParseErrorKind;
    use crate::infrastructure::ocr::mock::StaticOcrEngine;
    use crate::infrastructure::parsers::formats::image::fixtures::png;
    use crate::infrastructure::parsers::formats::pdf::fixtures;

    #[tokio::test]
    async fn test_parse_pdf_with_structure_and_tables() {
        let parser = AdvancedParser::new(true);
        let input = ParserInput::new(fixtures::report(), "report.pdf", mime::PDF);

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.metadata.parser_used, ParserVariant::Advanced);
        assert_eq!(result.metadata.page_count, Some(2));
        assert!(!result.structure.is_empty());
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.metadata.table_count, Some(1));
        assert!(result.content.contains("This report covers the document pipeline."));
    }

    #[tokio::test]
    async fn test_table_extraction_can_be_disabled() {
        let parser = AdvancedParser::new(true);
        let options = ProcessingOptions {
            enable_table_extraction: false,
            ..Default::default()
        };
        let input =
            ParserInput::new(fixtures::report(), "report.pdf", mime::PDF).with_options(options);

        let result = parser.parse(input).await.unwrap();

        assert!(result.tables.is_empty());
        assert!(!result.structure.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_backend() {
        let parser = AdvancedParser::new(false);
        let input = ParserInput::new(b"hello".to_vec(), "a.txt", mime::TEXT);

        assert!(!parser.is_available());
        let err = parser.parse(input).await.unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn test_ocr_capability_follows_engine() {
        let without = AdvancedParser::new(true);
        let with = AdvancedParser::new(true).with_ocr(Arc::new(StaticOcrEngine::new("x")));

        assert!(!without.capabilities().ocr);
        assert!(with.capabilities().ocr);
    }

    #[tokio::test]
    async fn test_image_text_comes_from_ocr() {
        let parser =
            AdvancedParser::new(true).with_ocr(Arc::new(StaticOcrEngine::new("Invoice 42")));
        let options = ProcessingOptions {
            enable_ocr: true,
            ..Default::default()
        };
        let input = ParserInput::new(png(8, 8), "scan.png", mime::PNG).with_options(options);

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.content, "Invoice 42");
        assert_eq!(result.images.len(), 1);
        assert_eq!(result.metadata.extra["ocr_pages"], 1);
    }

    #[tokio::test]
    async fn test_image_without_ocr_request_has_no_text() {
        let parser =
            AdvancedParser::new(true).with_ocr(Arc::new(StaticOcrEngine::new("ignored")));
        let input = ParserInput::new(png(8, 8), "scan.png", mime::PNG);

        let result = parser.parse(input).await.unwrap();

        assert!(result.content.is_empty());
        assert!(result.metadata.extra.is_empty());
    }
}
