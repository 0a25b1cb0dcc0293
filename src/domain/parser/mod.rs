//! Parser abstraction
//!
//! This module provides:
//! - `DocumentParser` trait implemented by the closed set of variants
//! - Capability descriptors consulted by the factory before invocation
//! - `ParseError` taxonomy shared by every stage of the pipeline

pub mod error;
#[allow(clippy::module_inception)]
pub mod parser;

pub use error::{AttemptOutcome, AttemptRecord, ParseError, ParseErrorKind};
pub use parser::{
    DocumentParser, ParserCapabilities, ParserInput, ParserVariant, RequiredCapabilities,
};

#[cfg(test)]
pub use parser::mock::MockDocumentParser;
