//! Capability-aware parser selection with an explicit fallback chain

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::document::{mime, ParsedDocument, ProcessingMode, ProcessingOptions};
use crate::domain::parser::{
    AttemptRecord, DocumentParser, ParseError, ParseErrorKind, ParserInput, ParserVariant,
};
use crate::infrastructure::observability::metrics as telemetry;
use crate::infrastructure::ocr::OcrEngine;

use super::{AdvancedParser, BasicParser};

/// Running counters for one parser variant
#[derive(Debug, Default)]
pub struct ParserMetrics {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    skips: AtomicU64,
    total_micros: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParserMetricsSnapshot {
    pub parser: ParserVariant,
    pub available: bool,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub skips: u64,
    pub success_rate: f64,
    pub average_time_seconds: f64,
}

impl ParserMetrics {
    fn record_attempt(&self, elapsed: Duration, success: bool) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.total_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_skip(&self) {
        self.skips.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, parser: ParserVariant, available: bool) -> ParserMetricsSnapshot {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let total = self.total_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;

        ParserMetricsSnapshot {
            parser,
            available,
            attempts,
            successes,
            failures: self.failures.load(Ordering::Relaxed),
            skips: self.skips.load(Ordering::Relaxed),
            success_rate: if attempts > 0 {
                successes as f64 / attempts as f64
            } else {
                0.0
            },
            average_time_seconds: if attempts > 0 {
                total / attempts as f64
            } else {
                0.0
            },
        }
    }
}

/// Ordered candidates for one input, plus skips decided before invocation
#[derive(Debug)]
pub struct SelectionPlan {
    pub candidates: Vec<Arc<dyn DocumentParser>>,
    pub skipped: Vec<AttemptRecord>,
}

impl SelectionPlan {
    pub fn variants(&self) -> Vec<ParserVariant> {
        self.candidates.iter().map(|p| p.variant()).collect()
    }
}

/// Selects and runs parser variants for an input
#[derive(Debug)]
pub struct ParserFactory {
    parsers: Vec<Arc<dyn DocumentParser>>,
    metrics: HashMap<ParserVariant, ParserMetrics>,
}

impl ParserFactory {
    /// Build the standard variant set: advanced (if enabled) then basic
    pub fn new(advanced_enabled: bool, ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        let mut advanced = AdvancedParser::new(advanced_enabled);

        if let Some(engine) = ocr {
            advanced = advanced.with_ocr(engine);
        }

        Self::with_parsers(vec![Arc::new(advanced), Arc::new(BasicParser::new())])
    }

    /// Build from an explicit variant list; list order is the tie-break order
    pub fn with_parsers(parsers: Vec<Arc<dyn DocumentParser>>) -> Self {
        let metrics = parsers
            .iter()
            .map(|p| (p.variant(), ParserMetrics::default()))
            .collect();

        Self { parsers, metrics }
    }

    pub fn parsers(&self) -> &[Arc<dyn DocumentParser>] {
        &self.parsers
    }

    pub fn parser(&self, variant: ParserVariant) -> Option<&Arc<dyn DocumentParser>> {
        self.parsers.iter().find(|p| p.variant() == variant)
    }

    pub fn available_variants(&self) -> Vec<ParserVariant> {
        self.parsers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.variant())
            .collect()
    }

    /// Union of MIME types claimed by available variants
    pub fn supported_mime_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .parsers
            .iter()
            .filter(|p| p.is_available())
            .flat_map(|p| p.supported_mime_types().iter().map(|m| m.to_string()))
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Rank candidates for a MIME type under the given options
    ///
    /// Variants that satisfy every requested capability come first, then
    /// degraded ones. Within each group accurate mode prefers richer
    /// capabilities and fast mode prefers lower cost; remaining ties keep
    /// declaration order.
    pub fn plan(
        &self,
        mime_type: &str,
        options: &ProcessingOptions,
    ) -> Result<SelectionPlan, ParseError> {
        let claiming: Vec<&Arc<dyn DocumentParser>> =
            self.parsers.iter().filter(|p| p.supports(mime_type)).collect();

        if claiming.is_empty() {
            return Err(ParseError::unsupported(mime_type));
        }

        let required = options.required_capabilities();
        let needs_ocr_for_text = mime::is_image(mime_type);
        let mut skipped = Vec::new();
        let mut ranked: Vec<(usize, bool, &Arc<dyn DocumentParser>)> = Vec::new();

        for (position, parser) in claiming.into_iter().enumerate() {
            let variant = parser.variant();

            if !parser.is_available() {
                skipped.push(AttemptRecord::skipped(
                    variant,
                    ParseErrorKind::BackendUnavailable,
                    "backend is not available",
                ));
                continue;
            }

            let capabilities = parser.capabilities();

            if needs_ocr_for_text && !capabilities.ocr {
                skipped.push(AttemptRecord::skipped(
                    variant,
                    ParseErrorKind::BackendUnavailable,
                    "image input needs OCR, which this variant lacks",
                ));
                continue;
            }

            ranked.push((position, capabilities.satisfies(&required), parser));
        }

        ranked.sort_by(|(pos_a, capable_a, a), (pos_b, capable_b, b)| {
            let by_mode = match options.processing_mode {
                ProcessingMode::Accurate => b
                    .capabilities()
                    .richness()
                    .cmp(&a.capabilities().richness()),
                ProcessingMode::Fast => a.relative_cost().cmp(&b.relative_cost()),
            };

            capable_b
                .cmp(capable_a)
                .then(by_mode)
                .then(pos_a.cmp(pos_b))
        });

        Ok(SelectionPlan {
            candidates: ranked.into_iter().map(|(_, _, p)| p.clone()).collect(),
            skipped,
        })
    }

    /// Parse with the ranked fallback chain
    pub async fn parse(
        &self,
        content: Bytes,
        filename: &str,
        mime_type: &str,
        options: &ProcessingOptions,
    ) -> Result<ParsedDocument, ParseError> {
        let plan = self.plan(mime_type, options)?;
        let required = options.required_capabilities();

        for record in &plan.skipped {
            if let Some(metrics) = self.metric(record.parser) {
                metrics.record_skip();
            }
            debug!(parser = %record.parser, filename, reason = %record.message, "Skipping parser");
        }

        let mut attempts = plan.skipped;

        for parser in plan.candidates {
            let variant = parser.variant();
            let missing = parser.capabilities().missing(&required);

            if !missing.is_empty() {
                info!(
                    parser = %variant,
                    filename,
                    missing = ?missing,
                    "Attempting parser without all requested capabilities"
                );
            }

            let input = ParserInput::new(content.clone(), filename, mime_type)
                .with_options(options.clone());
            let started = Instant::now();
            let result = parser.parse(input).await;
            let elapsed = started.elapsed();

            if let Some(metrics) = self.metric(variant) {
                metrics.record_attempt(elapsed, result.is_ok());
            }
            telemetry::record_parser_attempt(variant, elapsed, result.is_ok());

            match result {
                Ok(mut document) => {
                    document.metadata.parser_used = variant;
                    debug!(
                        parser = %variant,
                        filename,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Document parsed"
                    );
                    return Ok(document);
                }
                Err(error) if error.kind.short_circuits_fallback() => {
                    warn!(parser = %variant, filename, error = %error, "Parse failed; not retrying");
                    return Err(error.with_parser(variant));
                }
                Err(error) => {
                    warn!(parser = %variant, filename, error = %error, "Parse failed; trying next parser");
                    attempts.push(AttemptRecord::failed(variant, &error));
                }
            }
        }

        let all_unavailable = attempts
            .iter()
            .all(|a| a.kind == ParseErrorKind::BackendUnavailable);

        if all_unavailable {
            let reasons = attempts
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            let mut error =
                ParseError::backend_unavailable(format!("No parser backend is available: {}", reasons));
            error.attempts = attempts;
            return Err(error);
        }

        Err(ParseError::all_parsers_failed(filename, attempts))
    }

    fn metric(&self, variant: ParserVariant) -> Option<&ParserMetrics> {
        self.metrics.get(&variant)
    }

    /// Per-variant counters in declaration order
    pub fn metrics(&self) -> Vec<ParserMetricsSnapshot> {
        self.parsers
            .iter()
            .filter_map(|p| {
                self.metric(p.variant())
                    .map(|m| m.snapshot(p.variant(), p.is_available()))
            })
            .collect()
    }
}
