//! Document parser trait and capability types

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::document::{ParsedDocument, ProcessingOptions};

use super::error::ParseError;

/// The closed set of parser variants
///
/// Declaration order is the tie-break when two variants rank equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserVariant {
    /// OCR, tables, images and structural analysis
    Advanced,
    /// Text-only extraction, always available
    Basic,
}

impl ParserVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advanced => "advanced",
            Self::Basic => "basic",
        }
    }

    pub fn all() -> [ParserVariant; 2] {
        [Self::Advanced, Self::Basic]
    }
}

impl std::fmt::Display for ParserVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a variant can produce beyond plain text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParserCapabilities {
    pub ocr: bool,
    pub tables: bool,
    pub structure: bool,
    pub images: bool,
}

impl ParserCapabilities {
    pub fn text_only() -> Self {
        Self::default()
    }

    /// Number of optional features supported; higher is richer
    pub fn richness(&self) -> u8 {
        [self.ocr, self.tables, self.structure, self.images]
            .iter()
            .filter(|c| **c)
            .count() as u8
    }

    /// Whether every requested feature is supported
    pub fn satisfies(&self, required: &RequiredCapabilities) -> bool {
        (!required.ocr || self.ocr) && (!required.tables || self.tables)
    }

    /// Names of requested features this variant lacks
    pub fn missing(&self, required: &RequiredCapabilities) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if required.ocr && !self.ocr {
            missing.push("ocr");
        }

        if required.tables && !self.tables {
            missing.push("tables");
        }

        missing
    }
}

/// Features a request asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequiredCapabilities {
    pub ocr: bool,
    pub tables: bool,
}

/// Input for document parsing
#[derive(Debug, Clone)]
pub struct ParserInput {
    /// Raw document bytes
    pub content: Bytes,
    /// Original filename
    pub filename: String,
    /// Detected MIME type
    pub mime_type: String,
    /// Options in effect for this parse
    pub options: ProcessingOptions,
}

impl ParserInput {
    pub fn new(
        content: impl Into<Bytes>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            options: ProcessingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn file_size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Fail fast when the content exceeds the configured bound
    pub fn ensure_within_size_limit(&self) -> Result<(), ParseError> {
        let limit = self.options.max_file_size_bytes;

        if self.file_size() > limit {
            return Err(ParseError::too_large(self.file_size(), limit));
        }

        Ok(())
    }
}

/// Trait for document parser variants
#[async_trait]
pub trait DocumentParser: Send + Sync + Debug {
    /// Variant tag reported in `metadata.parser_used`
    fn variant(&self) -> ParserVariant;

    /// MIME types this variant claims
    fn supported_mime_types(&self) -> &[&str];

    /// Feature descriptor consulted before invocation
    fn capabilities(&self) -> ParserCapabilities;

    /// Cheap probe for a missing or disabled backend
    fn is_available(&self) -> bool {
        true
    }

    /// Relative cost of a parse; lower runs faster
    fn relative_cost(&self) -> u8;

    /// Parse a document into the canonical representation
    async fn parse(&self, input: ParserInput) -> Result<ParsedDocument, ParseError>;

    /// Check if this variant claims a MIME type (parameters are ignored)
    fn supports(&self, mime: &str) -> bool {
        let essence = mime.split(';').next().unwrap_or_default().trim();

        self.supported_mime_types()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(essence))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_richness() {
        let rich = ParserCapabilities {
            ocr: true,
            tables: true,
            structure: true,
            images: false,
        };

        assert_eq!(rich.richness(), 3);
        assert_eq!(ParserCapabilities::text_only().richness(), 0);
    }

    #[test]
    fn test_capabilities_satisfies() {
        let caps = ParserCapabilities {
            ocr: false,
            tables: true,
            structure: true,
            images: true,
        };

        assert!(caps.satisfies(&RequiredCapabilities {
            ocr: false,
            tables: true
        }));
        assert!(!caps.satisfies(&RequiredCapabilities {
            ocr: true,
            tables: true
        }));
        assert_eq!(
            caps.missing(&RequiredCapabilities {
                ocr: true,
                tables: true
            }),
            vec!["ocr"]
        );
    }

    #[test]
    fn test_input_size_limit_boundary() {
        let options = ProcessingOptions {
            max_file_size_bytes: 4,
            ..Default::default()
        };

        let at_limit = ParserInput::new(b"abcd".to_vec(), "a.txt", "text/plain")
            .with_options(options.clone());
        assert!(at_limit.ensure_within_size_limit().is_ok());

        let over_limit =
            ParserInput::new(b"abcde".to_vec(), "a.txt", "text/plain").with_options(options);
        assert!(over_limit.ensure_within_size_limit().is_err());
    }

    #[test]
    fn test_supports_ignores_parameters() {
        let parser = mock::MockDocumentParser::new(ParserVariant::Basic);

        assert!(parser.supports("text/plain; charset=utf-8"));
        assert!(parser.supports("Application/PDF"));
        assert!(!parser.supports("text/html"));
    }

    #[test]
    fn test_variant_order_and_names() {
        assert!(ParserVariant::Advanced < ParserVariant::Basic);
        assert_eq!(ParserVariant::Basic.to_string(), "basic");
        assert_eq!(
            serde_json::to_string(&ParserVariant::Advanced).unwrap(),
            "\"advanced\""
        );
    }

    #[tokio::test]
    async fn test_mock_parser_counts_calls() {
        let parser = mock::MockDocumentParser::new(ParserVariant::Basic);
        let input = ParserInput::new(b"hello".to_vec(), "a.txt", "text/plain");

        let result = parser.parse(input).await.unwrap();

        assert_eq!(result.content, "hello");
        assert_eq!(parser.calls(), 1);
    }
}
