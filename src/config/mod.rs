//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, BatchConfig, CacheConfig, LogFormat, LoggingConfig, OcrConfig, ParsersConfig,
    ProcessingConfig, ServerConfig,
};
