//! OCR engines used by the advanced parser for image-only content

mod http;

pub use http::{HttpOcrEngine, HttpOcrEngineConfig};

use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::parser::ParseError;

/// OCR failure
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR service unreachable: {0}")]
    Unavailable(String),

    #[error("OCR service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Malformed OCR response: {0}")]
    InvalidResponse(String),
}

impl From<OcrError> for ParseError {
    fn from(error: OcrError) -> Self {
        match error {
            OcrError::Unavailable(_) => ParseError::backend_unavailable(error.to_string()),
            OcrError::Service { status, .. } if status >= 500 => {
                ParseError::backend_unavailable(error.to_string())
            }
            _ => ParseError::internal(error.to_string()),
        }
    }
}

/// Text recognition backend
#[async_trait]
pub trait OcrEngine: Send + Sync + Debug {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Recognize the text in one encoded image
    async fn recognize(&self, image: &[u8], mime_type: &str) -> Result<String, OcrError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;

    /// OCR engine that returns fixed text
    #[derive(Debug)]
    pub struct StaticOcrEngine {
        text: String,
    }

    impl StaticOcrEngine {
        pub fn new(text: impl Into<String>) -> Self {
            Self { text: text.into() }
        }
    }

    #[async_trait]
    impl OcrEngine for StaticOcrEngine {
        fn name(&self) -> &str {
            "static"
        }

        async fn recognize(&self, _image: &[u8], _mime_type: &str) -> Result<String, OcrError> {
            Ok(self.text.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parser::ParseErrorKind;

    #[test]
    fn test_error_mapping() {
        let unreachable: ParseError = OcrError::Unavailable("refused".into()).into();
        assert_eq!(unreachable.kind, ParseErrorKind::BackendUnavailable);

        let overloaded: ParseError = OcrError::Service {
            status: 503,
            body: String::new(),
        }
        .into();
        assert_eq!(overloaded.kind, ParseErrorKind::BackendUnavailable);

        let rejected: ParseError = OcrError::Service {
            status: 400,
            body: "bad image".into(),
        }
        .into();
        assert_eq!(rejected.kind, ParseErrorKind::Internal);
    }
}
