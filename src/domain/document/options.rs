use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::parser::RequiredCapabilities;

/// Default upper bound on accepted input size
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default per-parse deadline
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Ranking bias for parser selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Prefer the cheapest variant that can handle the input
    Fast,
    /// Prefer the richest variant that can handle the input
    #[default]
    Accurate,
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "accurate" => Ok(Self::Accurate),
            other => Err(format!("unknown processing mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Accurate => f.write_str("accurate"),
        }
    }
}

/// Per-request processing knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProcessingOptions {
    pub enable_ocr: bool,
    pub enable_table_extraction: bool,
    pub processing_mode: ProcessingMode,
    #[validate(range(min = 1, max = 3600))]
    pub timeout_seconds: u64,
    #[validate(range(min = 1))]
    pub max_file_size_bytes: u64,
    pub extract_topics: bool,
    pub generate_summary: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            enable_ocr: false,
            enable_table_extraction: true,
            processing_mode: ProcessingMode::Accurate,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            extract_topics: true,
            generate_summary: false,
        }
    }
}

impl ProcessingOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Features the factory must match against variant capabilities
    pub fn required_capabilities(&self) -> RequiredCapabilities {
        RequiredCapabilities {
            ocr: self.enable_ocr,
            tables: self.enable_table_extraction,
        }
    }
}
