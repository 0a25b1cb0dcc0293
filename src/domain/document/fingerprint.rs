use serde::Serialize;
use sha2::{Digest, Sha256};

use super::options::{ProcessingMode, ProcessingOptions};

/// Stable digest of content, extension, resolved media type and output-affecting options
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

/// The subset of options that can change a parse result
#[derive(Serialize)]
struct OutputOptions {
    enable_ocr: bool,
    enable_table_extraction: bool,
    processing_mode: ProcessingMode,
}

impl Fingerprint {
    pub fn compute(
        content: &[u8],
        filename: &str,
        mime_type: &str,
        options: &ProcessingOptions,
    ) -> Self {
        let content_hash = hex::encode(Sha256::digest(content));
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let canonical = serde_json::to_string(&OutputOptions {
            enable_ocr: options.enable_ocr,
            enable_table_extraction: options.enable_table_extraction,
            processing_mode: options.processing_mode,
        })
        .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(content_hash.as_bytes());
        hasher.update(b"|");
        hasher.update(extension.as_bytes());
        hasher.update(b"|");
        hasher.update(mime_type.to_ascii_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(canonical.as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading digest characters, for logs
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
