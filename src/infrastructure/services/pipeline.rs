//! Single-document path: size gate, MIME detection, cache, parser factory

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::document::{detect_mime, Fingerprint, ParsedDocument, ProcessingOptions};
use crate::domain::parser::ParseError;
use crate::domain::stats::ServiceStats;
use crate::infrastructure::cache::{CacheOutcome, DocumentCache};
use crate::infrastructure::observability::metrics as telemetry;
use crate::infrastructure::parsers::ParserFactory;

/// One document submitted to the pipeline
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    pub content: Bytes,
    pub filename: String,
    /// MIME type declared by the uploader, if any
    pub mime_type: Option<String>,
    pub options: ProcessingOptions,
}

impl DocumentRequest {
    pub fn new(content: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            mime_type: None,
            options: ProcessingOptions::default(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }
}

/// A parsed document with how it was obtained
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub document: Arc<ParsedDocument>,
    pub fingerprint: Fingerprint,
    pub cache: CacheOutcome,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Cached, fallback-aware parsing of one document at a time
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    factory: Arc<ParserFactory>,
    cache: Arc<DocumentCache>,
    stats: Arc<ServiceStats>,
}

impl DocumentPipeline {
    pub fn new(
        factory: Arc<ParserFactory>,
        cache: Arc<DocumentCache>,
        stats: Arc<ServiceStats>,
    ) -> Self {
        Self {
            factory,
            cache,
            stats,
        }
    }

    pub fn factory(&self) -> &Arc<ParserFactory> {
        &self.factory
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    pub fn stats(&self) -> &Arc<ServiceStats> {
        &self.stats
    }

    /// Parse a document, serving repeated inputs from the cache
    ///
    /// The size limit is checked before the cache or any parser is touched.
    pub async fn process(&self, request: DocumentRequest) -> Result<ProcessedDocument, ParseError> {
        let started = Instant::now();
        let result = self.process_inner(request, started).await;

        match &result {
            Ok(processed) => {
                self.stats.record_processed(processed.elapsed);
                telemetry::record_document_processed(processed.elapsed);
            }
            Err(e) => {
                self.stats.record_error();
                telemetry::record_processing_error(e.kind);
            }
        }

        result
    }

    async fn process_inner(
        &self,
        request: DocumentRequest,
        started: Instant,
    ) -> Result<ProcessedDocument, ParseError> {
        let DocumentRequest {
            content,
            filename,
            mime_type,
            options,
        } = request;

        let size = content.len() as u64;

        if size > options.max_file_size_bytes {
            warn!(filename = %filename, size, limit = options.max_file_size_bytes, "Rejecting oversized document");
            return Err(ParseError::too_large(size, options.max_file_size_bytes));
        }

        let mime_type = detect_mime(&filename, &content, mime_type.as_deref());
        let fingerprint = Fingerprint::compute(&content, &filename, &mime_type, &options);

        debug!(
            filename = %filename,
            mime_type = %mime_type,
            fingerprint = %fingerprint.short(),
            "Processing document"
        );

        let factory = self.factory.clone();
        let job_filename = filename.clone();
        let job_mime = mime_type.clone();
        let job_options = options.clone();

        let (document, outcome) = self
            .cache
            .get_or_compute(fingerprint.clone(), move || async move {
                factory
                    .parse(content, &job_filename, &job_mime, &job_options)
                    .await
            })
            .await?;

        self.record_cache_outcome(outcome);

        let elapsed = started.elapsed();

        info!(
            filename = %filename,
            parser = %document.metadata.parser_used,
            cache = ?outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Document processed"
        );

        Ok(ProcessedDocument {
            document,
            fingerprint,
            cache: outcome,
            elapsed,
        })
    }

    fn record_cache_outcome(&self, outcome: CacheOutcome) {
        if outcome.is_hit() {
            self.stats.record_cache_hit();
        } else {
            self.stats.record_cache_miss();
        }

        telemetry::record_cache_lookup(outcome.is_hit());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::ProcessingMode;
    use crate::domain::parser::{MockDocumentParser, ParseErrorKind, ParserVariant};
    use crate::infrastructure::cache::DocumentCacheConfig;
    use crate::infrastructure::parsers::formats::pdf::fixtures;

    fn pipeline_with(parsers: Vec<Arc<MockDocumentParser>>) -> DocumentPipeline {
        let parsers = parsers
            .into_iter()
            .map(|p| p as Arc<dyn crate::domain::parser::DocumentParser>)
            .collect();

        DocumentPipeline::new(
            Arc::new(ParserFactory::with_parsers(parsers)),
            Arc::new(DocumentCache::new(DocumentCacheConfig::default())),
            Arc::new(ServiceStats::new()),
        )
    }

    fn limited(limit: u64) -> ProcessingOptions {
        ProcessingOptions {
            max_file_size_bytes: limit,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_file_exactly_at_limit_is_accepted() {
        let basic = Arc::new(MockDocumentParser::new(ParserVariant::Basic));
        let pipeline = pipeline_with(vec![basic.clone()]);

        let request = DocumentRequest::new(vec![b'a'; 16], "a.txt").with_options(limited(16));
        let processed = pipeline.process(request).await.unwrap();

        assert_eq!(processed.document.content.len(), 16);
        assert_eq!(basic.calls(), 1);
    }

    #[tokio::test]
    async fn test_one_byte_over_limit_fails_before_parsing() {
        let basic = Arc::new(MockDocumentParser::new(ParserVariant::Basic));
        let pipeline = pipeline_with(vec![basic.clone()]);

        let request = DocumentRequest::new(vec![b'a'; 17], "a.txt").with_options(limited(16));
        let err = pipeline.process(request).await.unwrap_err();

        assert_eq!(err.kind, ParseErrorKind::TooLarge);
        assert!(!err.retryable);
        assert_eq!(basic.calls(), 0);
        assert_eq!(pipeline.stats().snapshot().errors, 1);
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test]
    async fn test_repeat_is_deterministic_and_cached() {
        let basic = Arc::new(MockDocumentParser::new(ParserVariant::Basic));
        let pipeline = pipeline_with(vec![basic.clone()]);
        let request = DocumentRequest::new(&b"same bytes"[..], "same.txt");

        let first = pipeline.process(request.clone()).await.unwrap();
        let second = pipeline.process(request).await.unwrap();

        assert_eq!(first.document.content, second.document.content);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.cache, CacheOutcome::Computed);
        assert_eq!(second.cache, CacheOutcome::Hit);
        assert_eq!(basic.calls(), 1);

        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.documents_processed, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_different_options_are_separate_entries() {
        let basic = Arc::new(MockDocumentParser::new(ParserVariant::Basic));
        let pipeline = pipeline_with(vec![basic.clone()]);
        let fast = ProcessingOptions {
            processing_mode: ProcessingMode::Fast,
            ..Default::default()
        };

        pipeline
            .process(DocumentRequest::new(&b"x"[..], "a.txt"))
            .await
            .unwrap();
        pipeline
            .process(DocumentRequest::new(&b"x"[..], "a.txt").with_options(fast))
            .await
            .unwrap();

        assert_eq!(basic.calls(), 2);
        assert_eq!(pipeline.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_declared_type_separates_cache_entries() {
        let pipeline = DocumentPipeline::new(
            Arc::new(ParserFactory::new(true, None)),
            Arc::new(DocumentCache::new(DocumentCacheConfig::default())),
            Arc::new(ServiceStats::new()),
        );
        let html = &b"<html><head><title>Title</title></head><body><p>Body text here</p></body></html>"[..];

        let as_html = pipeline
            .process(DocumentRequest::new(html, "upload").with_mime_type("text/html"))
            .await
            .unwrap();
        let as_text = pipeline
            .process(DocumentRequest::new(html, "upload").with_mime_type("text/plain"))
            .await
            .unwrap();

        assert_ne!(as_html.fingerprint, as_text.fingerprint);
        assert_eq!(as_text.cache, CacheOutcome::Computed);
        assert_eq!(pipeline.cache().len(), 2);
        assert!(as_text.document.content.contains("<p>"));
    }

    #[tokio::test]
    async fn test_two_page_pdf_end_to_end() {
        let factory = Arc::new(ParserFactory::new(true, None));
        let pipeline = DocumentPipeline::new(
            factory,
            Arc::new(DocumentCache::new(DocumentCacheConfig::default())),
            Arc::new(ServiceStats::new()),
        );
        let options = ProcessingOptions {
            enable_ocr: false,
            enable_table_extraction: true,
            processing_mode: ProcessingMode::Fast,
            ..Default::default()
        };
        let request = DocumentRequest::new(fixtures::report(), "report.pdf").with_options(options);

        let first = pipeline.process(request.clone()).await.unwrap();
        let document = &first.document;

        assert_eq!(document.metadata.page_count, Some(2));
        assert!(!document.tables.is_empty());
        assert!(!document.structure.is_empty());
        assert!(ParserVariant::all().contains(&document.metadata.parser_used));

        let hits_before = pipeline.stats().snapshot().cache_hits;
        let second = pipeline.process(request).await.unwrap();

        assert_eq!(second.cache, CacheOutcome::Hit);
        assert_eq!(pipeline.stats().snapshot().cache_hits, hits_before + 1);
    }

    #[tokio::test]
    async fn test_declared_mime_is_used_when_content_is_ambiguous() {
        let basic = Arc::new(MockDocumentParser::new(ParserVariant::Basic));
        let pipeline = pipeline_with(vec![basic]);

        let err = pipeline
            .process(DocumentRequest::new(&b"<p>hi</p>"[..], "page").with_mime_type("text/html"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ParseErrorKind::Unsupported);
    }
}
