//! Domain layer - Core types and contracts of the document pipeline

pub mod analysis;
pub mod document;
pub mod error;
pub mod parser;
pub mod stats;

pub use analysis::ContentAnalyzer;
pub use document::{
    DocumentMetadata, DocumentStructure, Fingerprint, ImageInfo, ParsedDocument, ProcessingMode,
    ProcessingOptions, Section, TableData,
};
pub use error::DomainError;
pub use parser::{
    AttemptRecord, DocumentParser, ParseError, ParseErrorKind, ParserCapabilities, ParserInput,
    ParserVariant,
};
pub use stats::{ServiceStats, StatsSnapshot};
