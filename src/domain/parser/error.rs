//! Parse error taxonomy

use serde::Serialize;
use thiserror::Error;

use super::parser::ParserVariant;

/// Closed set of failure classes a parse can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    /// No variant handles the MIME type
    Unsupported,
    /// Input exceeds the configured size bound
    TooLarge,
    /// Content is unreadable by the format's structure
    Corrupt,
    /// Parser could not finish within its deadline
    Timeout,
    /// A variant's backend is missing or disabled
    BackendUnavailable,
    /// Every candidate was skipped or failed
    AllParsersFailed,
    /// Variant-specific failure another variant may not share
    Internal,
    /// Batch job was cancelled before it started
    Cancelled,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::TooLarge => "too_large",
            Self::Corrupt => "corrupt",
            Self::Timeout => "timeout",
            Self::BackendUnavailable => "backend_unavailable",
            Self::AllParsersFailed => "all_parsers_failed",
            Self::Internal => "internal",
            Self::Cancelled => "cancelled",
        }
    }

    /// Kinds that imply every other variant would fail identically
    pub fn short_circuits_fallback(&self) -> bool {
        matches!(self, Self::Unsupported | Self::TooLarge | Self::Corrupt)
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one candidate in a fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Skipped,
    Failed,
}

/// Per-candidate diagnostic collected by the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub parser: ParserVariant,
    pub outcome: AttemptOutcome,
    pub kind: ParseErrorKind,
    pub message: String,
}

impl AttemptRecord {
    pub fn skipped(parser: ParserVariant, kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            parser,
            outcome: AttemptOutcome::Skipped,
            kind,
            message: message.into(),
        }
    }

    pub fn failed(parser: ParserVariant, error: &ParseError) -> Self {
        Self {
            parser,
            outcome: AttemptOutcome::Failed,
            kind: error.kind,
            message: error.message.clone(),
        }
    }
}

impl std::fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self.outcome {
            AttemptOutcome::Skipped => "skipped",
            AttemptOutcome::Failed => "failed",
        };
        write!(f, "{} {} ({}): {}", self.parser, verb, self.kind, self.message)
    }
}

/// Typed parse failure
///
/// `Clone` so that every waiter coalesced on one computation observes the
/// same failure as the caller that ran it.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser: Option<ParserVariant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptRecord>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            parser: None,
            attempts: Vec::new(),
        }
    }

    pub fn unsupported(mime_type: &str) -> Self {
        Self::new(
            ParseErrorKind::Unsupported,
            format!("No parser handles MIME type '{}'", mime_type),
            false,
        )
    }

    pub fn too_large(size: u64, limit: u64) -> Self {
        Self::new(
            ParseErrorKind::TooLarge,
            format!("File is {} bytes, limit is {} bytes", size, limit),
            false,
        )
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Corrupt, message, false)
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::new(
            ParseErrorKind::Timeout,
            format!("Parsing did not complete within {} seconds", seconds),
            true,
        )
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::BackendUnavailable, message, true)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Internal, message, false)
    }

    pub fn cancelled() -> Self {
        Self::new(
            ParseErrorKind::Cancelled,
            "Batch was cancelled before this job started",
            true,
        )
    }

    /// Aggregate of every skip and failure in an exhausted chain
    pub fn all_parsers_failed(filename: &str, attempts: Vec<AttemptRecord>) -> Self {
        let reasons = attempts
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        let retryable = attempts.iter().any(|a| a.kind == ParseErrorKind::Timeout);

        Self {
            kind: ParseErrorKind::AllParsersFailed,
            message: format!("All parsers failed for {}: {}", filename, reasons),
            retryable,
            parser: None,
            attempts,
        }
    }

    /// Tag the variant that raised this error
    pub fn with_parser(mut self, parser: ParserVariant) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}
