use std::time::Duration;

use serde::Deserialize;
use validator::Validate;

use crate::domain::document::{
    DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_TIMEOUT_SECONDS, ProcessingMode, ProcessingOptions,
};
use crate::domain::DomainError;
use crate::infrastructure::cache::DocumentCacheConfig;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::ocr::HttpOcrEngineConfig;
use crate::infrastructure::services::EnhancedProcessorConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[validate(nested)]
    pub processing: ProcessingConfig,
    #[validate(nested)]
    pub cache: CacheConfig,
    #[validate(nested)]
    pub batch: BatchConfig,
    #[validate(nested)]
    pub parsers: ParsersConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole request body, batch uploads included
    pub max_body_bytes: usize,
    /// Allowed browser origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Defaults applied to requests that do not override them
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ProcessingConfig {
    pub enable_ocr: bool,
    pub enable_table_extraction: bool,
    pub processing_mode: ProcessingMode,
    #[validate(range(min = 1, max = 3600))]
    pub timeout_seconds: u64,
    #[validate(range(min = 1))]
    pub max_file_size_bytes: u64,
    #[validate(range(min = 1))]
    pub max_content_length: usize,
    pub max_topics: usize,
    pub extract_topics: bool,
    pub generate_summary: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    #[validate(range(min = 1))]
    pub max_entries: usize,
    /// Zero disables the background sweeper
    pub sweep_interval_seconds: u64,
    #[validate(range(min = 1, max = 1024))]
    pub stripes: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct BatchConfig {
    #[validate(range(min = 1, max = 256))]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ParsersConfig {
    pub advanced_enabled: bool,
    #[validate(nested)]
    pub ocr: OcrConfig,
}

/// Remote OCR service; OCR is unavailable while `endpoint` is unset
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct OcrConfig {
    #[validate(url)]
    pub endpoint: Option<String>,
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
    pub language: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 100 * 1024 * 1024,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let options = ProcessingOptions::default();
        let processor = EnhancedProcessorConfig::default();

        Self {
            enable_ocr: options.enable_ocr,
            enable_table_extraction: options.enable_table_extraction,
            processing_mode: options.processing_mode,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_content_length: processor.max_content_length,
            max_topics: processor.max_topics,
            extract_topics: options.extract_topics,
            generate_summary: options.generate_summary,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let cache = DocumentCacheConfig::default();

        Self {
            ttl_seconds: cache.ttl.as_secs(),
            max_entries: cache.max_entries,
            sweep_interval_seconds: 300,
            stripes: cache.stripes,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

impl Default for ParsersConfig {
    fn default() -> Self {
        Self {
            advanced_enabled: true,
            ocr: OcrConfig::default(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: 60,
            language: "eng".to_string(),
        }
    }
}

impl ProcessingConfig {
    /// Options used when a request supplies none
    pub fn default_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            enable_ocr: self.enable_ocr,
            enable_table_extraction: self.enable_table_extraction,
            processing_mode: self.processing_mode,
            timeout_seconds: self.timeout_seconds,
            max_file_size_bytes: self.max_file_size_bytes,
            extract_topics: self.extract_topics,
            generate_summary: self.generate_summary,
        }
    }

    pub fn processor_config(&self) -> EnhancedProcessorConfig {
        EnhancedProcessorConfig {
            max_content_length: self.max_content_length,
            max_topics: self.max_topics,
        }
    }
}

impl CacheConfig {
    pub fn cache_config(&self) -> DocumentCacheConfig {
        DocumentCacheConfig::default()
            .with_max_entries(self.max_entries)
            .with_ttl(Duration::from_secs(self.ttl_seconds))
            .with_stripes(self.stripes)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }
}

impl OcrConfig {
    pub fn engine_config(&self) -> Option<HttpOcrEngineConfig> {
        self.endpoint.as_ref().map(|endpoint| HttpOcrEngineConfig {
            endpoint: endpoint.clone(),
            language: self.language.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
        })
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local` and `APP__*` environment variables
    pub fn load() -> Result<Self, DomainError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        app_config
            .validate()
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> AppConfig {
        let config = config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap();

        config.try_deserialize().unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.batch.max_concurrent, 4);
        assert!(config.parsers.ocr.engine_config().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = from_json(r#"{"cache": {"max_entries": 50}, "processing": {"processing_mode": "fast"}}"#);

        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.processing.processing_mode, ProcessingMode::Fast);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_zero_bounds_are_rejected() {
        let config = from_json(r#"{"cache": {"max_entries": 0}, "batch": {"max_concurrent": 0}}"#);

        let errors = config.validate().unwrap_err().to_string();

        assert!(errors.contains("max_entries"));
        assert!(errors.contains("max_concurrent"));
    }

    #[test]
    fn test_ocr_endpoint_enables_engine_config() {
        let config = from_json(
            r#"{"parsers": {"ocr": {"endpoint": "http://ocr.local/recognize", "timeout_seconds": 5}}}"#,
        );

        let engine = config.parsers.ocr.engine_config().unwrap();

        assert_eq!(engine.endpoint, "http://ocr.local/recognize");
        assert_eq!(engine.timeout, Duration::from_secs(5));
        assert_eq!(engine.language, "eng");
    }

    #[test]
    fn test_default_options_follow_processing_section() {
        let config = from_json(r#"{"processing": {"enable_ocr": true, "timeout_seconds": 30}}"#);

        let options = config.processing.default_options();

        assert!(options.enable_ocr);
        assert_eq!(options.timeout_seconds, 30);
        assert!(options.enable_table_extraction);
    }

    #[test]
    fn test_sweeper_can_be_disabled() {
        let config = from_json(r#"{"cache": {"sweep_interval_seconds": 0}}"#);

        assert!(config.cache.sweep_interval().is_none());
        assert_eq!(
            AppConfig::default().cache.sweep_interval(),
            Some(Duration::from_secs(300))
        );
    }
}
