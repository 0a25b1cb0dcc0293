//! Enhanced document processing: pipeline output plus topics and summary

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::domain::analysis::ContentAnalyzer;
use crate::domain::document::{
    DocumentMetadata, DocumentStructure, ImageInfo, ProcessingOptions, TableData,
};
use crate::domain::parser::{ParseError, ParserVariant};
use crate::domain::stats::StatsSnapshot;
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheSnapshot;
use crate::infrastructure::parsers::ParserMetricsSnapshot;

use super::batch::{BatchOrchestrator, BatchOutcome};
use super::health::{HealthChecker, HealthReport};
use super::pipeline::{DocumentPipeline, DocumentRequest, ProcessedDocument};

const TRUNCATION_MARKER: &str = "\n[Content truncated...]";

/// Post-processing limits
#[derive(Debug, Clone)]
pub struct EnhancedProcessorConfig {
    /// Characters of content returned and handed to the analyzer
    pub max_content_length: usize,
    pub max_topics: usize,
}

impl Default for EnhancedProcessorConfig {
    fn default() -> Self {
        Self {
            max_content_length: 100_000,
            max_topics: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingInfo {
    pub parser_used: ParserVariant,
    pub processing_time_ms: u64,
    pub content_length: usize,
    pub has_structure: bool,
    pub has_tables: bool,
    pub has_images: bool,
    pub cache_hit: bool,
}

/// Final response for one processed file
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedResult {
    pub document_id: Uuid,
    pub filename: String,
    pub content: String,
    pub content_truncated: bool,
    pub metadata: DocumentMetadata,
    pub structure: DocumentStructure,
    pub tables: Vec<TableData>,
    pub images: Vec<ImageInfo>,
    pub key_topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub processing_info: ProcessingInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnhancedOutcome {
    Completed(Box<EnhancedResult>),
    Failed { error: ParseError },
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnhancedBatchItem {
    pub index: usize,
    pub filename: String,
    #[serde(flatten)]
    pub outcome: EnhancedOutcome,
}

/// Parser and cache overview for operators
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOverview {
    pub available_parsers: Vec<ParserVariant>,
    pub supported_types: Vec<String>,
    pub parser_metrics: Vec<ParserMetricsSnapshot>,
    pub cache: CacheSnapshot,
    pub max_content_length: usize,
}

/// Façade used by the HTTP and CLI adapters
#[derive(Clone)]
pub struct EnhancedProcessor {
    pipeline: Arc<DocumentPipeline>,
    batch: BatchOrchestrator,
    analyzer: Arc<dyn ContentAnalyzer>,
    health: HealthChecker,
    config: EnhancedProcessorConfig,
}

impl std::fmt::Debug for EnhancedProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancedProcessor")
            .field("config", &self.config)
            .finish()
    }
}

impl EnhancedProcessor {
    pub fn new(
        pipeline: Arc<DocumentPipeline>,
        batch: BatchOrchestrator,
        analyzer: Arc<dyn ContentAnalyzer>,
        config: EnhancedProcessorConfig,
    ) -> Self {
        let health = HealthChecker::new(pipeline.factory().clone());

        Self {
            pipeline,
            batch,
            analyzer,
            health,
            config,
        }
    }

    pub fn pipeline(&self) -> &Arc<DocumentPipeline> {
        &self.pipeline
    }

    pub fn batch(&self) -> &BatchOrchestrator {
        &self.batch
    }

    /// Process one file end to end
    pub async fn process_file(&self, request: DocumentRequest) -> Result<EnhancedResult, DomainError> {
        request.options.validate()?;

        let filename = request.filename.clone();
        let options = request.options.clone();
        let processed = self.pipeline.process(request).await?;

        Ok(self.enrich(filename, processed, &options).await)
    }

    /// Process files under the batch bound; one entry per request, in order
    pub async fn process_batch(
        &self,
        requests: Vec<DocumentRequest>,
        max_concurrent: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnhancedBatchItem>, DomainError> {
        for request in &requests {
            request.options.validate()?;
        }

        let options: Vec<ProcessingOptions> = requests.iter().map(|r| r.options.clone()).collect();
        let max_concurrent = max_concurrent.unwrap_or(self.batch.default_max_concurrent());
        let results = self.batch.process_batch(requests, max_concurrent, cancel).await;

        let items = results.into_iter().zip(options).map(|(result, options)| async move {
            let outcome = match result.outcome {
                BatchOutcome::Completed(processed) => EnhancedOutcome::Completed(Box::new(
                    self.enrich(result.filename.clone(), processed, &options).await,
                )),
                BatchOutcome::Failed { error } => EnhancedOutcome::Failed { error },
                BatchOutcome::Cancelled => EnhancedOutcome::Cancelled,
            };

            EnhancedBatchItem {
                index: result.index,
                filename: result.filename,
                outcome,
            }
        });

        Ok(futures::future::join_all(items).await)
    }

    async fn enrich(
        &self,
        filename: String,
        processed: ProcessedDocument,
        options: &ProcessingOptions,
    ) -> EnhancedResult {
        let document = processed.document;
        let (bounded, truncated) = truncate_chars(&document.content, self.config.max_content_length);

        let key_topics = if options.extract_topics {
            match self.analyzer.extract_topics(bounded, self.config.max_topics).await {
                Ok(topics) => topics,
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Topic extraction failed");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let summary = if options.generate_summary {
            match self.analyzer.summarize(bounded).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Summary generation failed");
                    None
                }
            }
        } else {
            None
        };

        let content = if truncated {
            format!("{}{}", bounded, TRUNCATION_MARKER)
        } else {
            document.content.clone()
        };

        // Cache hits carry the first submitter's name
        let mut metadata = document.metadata.clone();
        metadata.filename = filename.clone();

        EnhancedResult {
            document_id: Uuid::new_v4(),
            filename,
            content,
            content_truncated: truncated,
            metadata,
            structure: document.structure.clone(),
            tables: document.tables.clone(),
            images: document.images.clone(),
            key_topics,
            summary,
            processing_info: ProcessingInfo {
                parser_used: document.metadata.parser_used,
                processing_time_ms: processed.elapsed.as_millis() as u64,
                content_length: document.content.chars().count(),
                has_structure: document.has_structure(),
                has_tables: document.has_tables(),
                has_images: document.has_images(),
                cache_hit: processed.cache.is_hit(),
            },
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.pipeline.stats().snapshot()
    }

    pub fn reset_stats(&self) {
        self.pipeline.stats().reset();
    }

    pub fn clear_cache(&self) -> usize {
        self.pipeline.cache().clear()
    }

    pub fn processing_info(&self) -> ProcessingOverview {
        let factory = self.pipeline.factory();

        ProcessingOverview {
            available_parsers: factory.available_variants(),
            supported_types: factory.supported_mime_types(),
            parser_metrics: factory.metrics(),
            cache: self.pipeline.cache().snapshot(),
            max_content_length: self.config.max_content_length,
        }
    }

    pub async fn health_check(&self) -> HealthReport {
        self.health.check().await
    }
}

/// Prefix of at most `max_chars` characters, and whether anything was cut
fn truncate_chars(content: &str, max_chars: usize) -> (&str, bool) {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&content[..byte_index], true),
        None => (content, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::MockContentAnalyzer;
    use crate::domain::parser::{DocumentParser, MockDocumentParser, ParseErrorKind};
    use crate::domain::stats::ServiceStats;
    use crate::infrastructure::analysis::KeywordAnalyzer;
    use crate::infrastructure::cache::{DocumentCache, DocumentCacheConfig};
    use crate::infrastructure::parsers::ParserFactory;

    fn processor_with(
        analyzer: Arc<dyn ContentAnalyzer>,
        config: EnhancedProcessorConfig,
    ) -> EnhancedProcessor {
        let parser: Arc<dyn DocumentParser> = Arc::new(MockDocumentParser::new(ParserVariant::Basic));
        let pipeline = Arc::new(DocumentPipeline::new(
            Arc::new(ParserFactory::with_parsers(vec![parser])),
            Arc::new(DocumentCache::new(DocumentCacheConfig::default())),
            Arc::new(ServiceStats::new()),
        ));
        let batch = BatchOrchestrator::new(pipeline.clone(), 2);

        EnhancedProcessor::new(pipeline, batch, analyzer, config)
    }

    fn summary_options() -> ProcessingOptions {
        ProcessingOptions {
            generate_summary: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), ("hé", true));
        assert_eq!(truncate_chars("héllo", 5), ("héllo", false));
        assert_eq!(truncate_chars("", 0), ("", false));
    }

    #[tokio::test]
    async fn test_process_file_with_topics_and_summary() {
        let processor = processor_with(Arc::new(KeywordAnalyzer::new()), Default::default());
        let text = "Caching avoids repeated parsing work entirely. Caching matters for uploads.";
        let request =
            DocumentRequest::new(text.as_bytes().to_vec(), "notes.txt").with_options(summary_options());

        let result = processor.process_file(request).await.unwrap();

        assert_eq!(result.filename, "notes.txt");
        assert_eq!(result.key_topics.first().map(String::as_str), Some("caching"));
        assert!(result.summary.is_some());
        assert!(!result.content_truncated);
        assert_eq!(result.processing_info.parser_used, ParserVariant::Basic);
        assert!(!result.processing_info.cache_hit);
        assert_eq!(result.processing_info.content_length, text.len());
    }

    #[tokio::test]
    async fn test_cache_hit_reports_current_filename() {
        let processor = processor_with(Arc::new(KeywordAnalyzer::new()), Default::default());
        let body = &b"shared quarterly numbers"[..];

        let first = processor
            .process_file(DocumentRequest::new(body, "q1.txt"))
            .await
            .unwrap();
        let second = processor
            .process_file(DocumentRequest::new(body, "q2.txt"))
            .await
            .unwrap();

        assert!(second.processing_info.cache_hit);
        assert_eq!(first.metadata.filename, "q1.txt");
        assert_eq!(second.filename, "q2.txt");
        assert_eq!(second.metadata.filename, "q2.txt");
        assert_eq!(second.metadata.file_size, body.len() as u64);
    }

    #[tokio::test]
    async fn test_analyzer_failures_do_not_fail_request() {
        let mut analyzer = MockContentAnalyzer::new();
        analyzer
            .expect_extract_topics()
            .returning(|_, _| Err(DomainError::internal("topic service down")));
        analyzer
            .expect_summarize()
            .returning(|_| Err(DomainError::internal("summary service down")));

        let processor = processor_with(Arc::new(analyzer), Default::default());
        let request = DocumentRequest::new(&b"body text"[..], "a.txt").with_options(summary_options());

        let result = processor.process_file(request).await.unwrap();

        assert_eq!(result.content, "body text");
        assert!(result.key_topics.is_empty());
        assert!(result.summary.is_none());
    }

    #[tokio::test]
    async fn test_analyzer_not_called_when_not_requested() {
        let mut analyzer = MockContentAnalyzer::new();
        analyzer.expect_extract_topics().never();
        analyzer.expect_summarize().never();

        let processor = processor_with(Arc::new(analyzer), Default::default());
        let options = ProcessingOptions {
            extract_topics: false,
            ..Default::default()
        };

        let result = processor
            .process_file(DocumentRequest::new(&b"quiet"[..], "a.txt").with_options(options))
            .await
            .unwrap();

        assert!(result.key_topics.is_empty());
        assert!(result.summary.is_none());
    }

    #[tokio::test]
    async fn test_long_content_is_truncated_but_cache_keeps_original() {
        let mut analyzer = MockContentAnalyzer::new();
        analyzer
            .expect_extract_topics()
            .withf(|content, _| content.to_string() == "abcd")
            .returning(|_, _| Ok(vec![]));

        let processor = processor_with(
            Arc::new(analyzer),
            EnhancedProcessorConfig {
                max_content_length: 4,
                max_topics: 5,
            },
        );

        let result = processor
            .process_file(DocumentRequest::new(&b"abcdefgh"[..], "a.txt"))
            .await
            .unwrap();

        assert!(result.content_truncated);
        assert_eq!(result.content, "abcd\n[Content truncated...]");
        assert_eq!(result.processing_info.content_length, 8);

        let cached = processor.pipeline().cache().snapshot();
        assert_eq!(cached.entries, 1);
        let second = processor
            .pipeline()
            .process(DocumentRequest::new(&b"abcdefgh"[..], "a.txt"))
            .await
            .unwrap();
        assert_eq!(second.document.content, "abcdefgh");
    }

    #[tokio::test]
    async fn test_invalid_options_are_rejected() {
        let processor = processor_with(Arc::new(KeywordAnalyzer::new()), Default::default());
        let options = ProcessingOptions {
            timeout_seconds: 0,
            ..Default::default()
        };

        let err = processor
            .process_file(DocumentRequest::new(&b"x"[..], "a.txt").with_options(options))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_pipeline_errors_are_typed() {
        let processor = processor_with(Arc::new(KeywordAnalyzer::new()), Default::default());

        let err = processor
            .process_file(DocumentRequest::new(&b"\x00\x01\x02"[..], "blob.bin"))
            .await
            .unwrap_err();

        match err {
            DomainError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::Unsupported),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_enriches() {
        let processor = processor_with(Arc::new(KeywordAnalyzer::new()), Default::default());
        let requests = vec![
            DocumentRequest::new(&b"alpha document text"[..], "a.txt"),
            DocumentRequest::new(&b"\x00\x01"[..], "b.bin"),
            DocumentRequest::new(&b"gamma document text"[..], "c.txt"),
        ];

        let items = processor
            .process_batch(requests, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0].outcome, EnhancedOutcome::Completed(r) if r.key_topics.contains(&"alpha".to_string())));
        assert!(matches!(&items[1].outcome, EnhancedOutcome::Failed { .. }));
        assert_eq!(items[2].filename, "c.txt");
    }

    #[tokio::test]
    async fn test_processing_info_lists_parsers() {
        let processor = processor_with(Arc::new(KeywordAnalyzer::new()), Default::default());

        let info = processor.processing_info();

        assert_eq!(info.available_parsers, vec![ParserVariant::Basic]);
        assert!(info.supported_types.contains(&"text/plain".to_string()));
        assert_eq!(info.parser_metrics.len(), 1);
    }
}
