//! docpipe
//!
//! Turns heterogeneous documents (PDF, Office, HTML, Markdown, text, images)
//! into a uniform parsed representation:
//! - Capability-aware parser selection with a fallback chain
//! - Fingerprint-keyed result cache with TTL, LRU and request coalescing
//! - Bounded-concurrency batches with ordered, isolated results
//! - Topic and summary enrichment through a pluggable analyzer

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use domain::stats::ServiceStats;
use infrastructure::analysis::KeywordAnalyzer;
use infrastructure::cache::DocumentCache;
use infrastructure::ocr::{HttpOcrEngine, OcrEngine};
use infrastructure::parsers::ParserFactory;
use infrastructure::services::{BatchOrchestrator, DocumentPipeline, EnhancedProcessor};

/// Wire the processor and its collaborators from configuration
///
/// Must run inside a tokio runtime; the cache sweeper is spawned here.
pub async fn build_processor(config: &AppConfig) -> anyhow::Result<EnhancedProcessor> {
    let ocr: Option<Arc<dyn OcrEngine>> = match config.parsers.ocr.engine_config() {
        Some(engine_config) => {
            info!(endpoint = %engine_config.endpoint, "OCR engine configured");
            Some(Arc::new(HttpOcrEngine::new(engine_config)?))
        }
        None => None,
    };

    let factory = Arc::new(ParserFactory::new(config.parsers.advanced_enabled, ocr));
    let cache = Arc::new(DocumentCache::new(config.cache.cache_config()));

    if let Some(interval) = config.cache.sweep_interval() {
        cache.spawn_sweeper(interval);
    }

    let pipeline = Arc::new(DocumentPipeline::new(
        factory.clone(),
        cache,
        Arc::new(ServiceStats::new()),
    ));
    let batch = BatchOrchestrator::new(pipeline.clone(), config.batch.max_concurrent);

    info!(
        parsers = ?factory.available_variants(),
        max_concurrent = config.batch.max_concurrent,
        cache_entries = config.cache.max_entries,
        "Document processor initialized"
    );

    Ok(EnhancedProcessor::new(
        pipeline,
        batch,
        Arc::new(KeywordAnalyzer::new()),
        config.processing.processor_config(),
    ))
}

/// Create application state from configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let processor = build_processor(config).await?;

    Ok(AppState::new(
        processor,
        config.processing.default_options(),
    ))
}
