//! Document model
//!
//! Canonical parse output, request options, MIME detection and the cache
//! fingerprint derived from them.

pub mod fingerprint;
pub mod mime;
pub mod options;
pub mod parsed;

pub use fingerprint::Fingerprint;
pub use mime::detect_mime;
pub use options::{
    DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_TIMEOUT_SECONDS, ProcessingMode, ProcessingOptions,
};
pub use parsed::{
    DocumentMetadata, DocumentStructure, ImageInfo, ParsedDocument, Section, TableData,
};
