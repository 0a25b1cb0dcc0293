//! Parse command - processes local files and prints results as JSON

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::document::{ProcessingMode, ProcessingOptions};
use crate::infrastructure::services::{DocumentRequest, EnhancedBatchItem, EnhancedOutcome};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Files to process; results are printed in this order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Parser ranking bias (fast or accurate)
    #[arg(long)]
    pub mode: Option<ProcessingMode>,

    /// Require OCR for image content
    #[arg(long)]
    pub ocr: bool,

    /// Skip table extraction
    #[arg(long)]
    pub no_tables: bool,

    /// Skip topic extraction
    #[arg(long)]
    pub no_topics: bool,

    /// Generate a short summary for each document
    #[arg(long)]
    pub summary: bool,

    /// Documents processed at once (defaults to batch.max_concurrent)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=256))]
    pub max_concurrent: Option<u16>,

    /// Print one-line JSON instead of pretty output
    #[arg(long)]
    pub compact: bool,

    /// Log at info level instead of warn
    #[arg(short, long)]
    pub verbose: bool,
}

impl ParseArgs {
    /// Command-line flags layered over the configured defaults
    pub fn options(&self, defaults: &ProcessingOptions) -> ProcessingOptions {
        let mut options = defaults.clone();

        if let Some(mode) = self.mode {
            options.processing_mode = mode;
        }
        if self.ocr {
            options.enable_ocr = true;
        }
        if self.no_tables {
            options.enable_table_extraction = false;
        }
        if self.no_topics {
            options.extract_topics = false;
        }
        if self.summary {
            options.generate_summary = true;
        }

        options
    }
}

#[derive(Debug, Serialize)]
struct ParseReport {
    total: usize,
    completed: usize,
    failed: usize,
    cancelled: usize,
    results: Vec<EnhancedBatchItem>,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    let level = if args.verbose { None } else { Some("warn") };
    let config = super::bootstrap(level)?;

    let processor = crate::build_processor(&config).await?;
    let options = args.options(&config.processing.default_options());

    let mut requests = Vec::with_capacity(args.files.len());
    for path in &args.files {
        requests.push(read_request(path, &options).await?);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        super::serve::shutdown_signal().await;
        warn!("Interrupted, cancelling documents that have not started");
        on_interrupt.cancel();
    });

    let results = processor
        .process_batch(requests, args.max_concurrent.map(usize::from), &cancel)
        .await?;

    let report = ParseReport::new(results);
    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);

    if report.failed + report.cancelled > 0 {
        anyhow::bail!(
            "{} of {} documents did not complete",
            report.failed + report.cancelled,
            report.total
        );
    }

    Ok(())
}

async fn read_request(path: &Path, options: &ProcessingOptions) -> anyhow::Result<DocumentRequest> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(DocumentRequest::new(content, filename).with_options(options.clone()))
}

impl ParseReport {
    fn new(results: Vec<EnhancedBatchItem>) -> Self {
        let count = |f: fn(&EnhancedOutcome) -> bool| results.iter().filter(|r| f(&r.outcome)).count();

        Self {
            total: results.len(),
            completed: count(|o| matches!(o, EnhancedOutcome::Completed(_))),
            failed: count(|o| matches!(o, EnhancedOutcome::Failed { .. })),
            cancelled: count(|o| matches!(o, EnhancedOutcome::Cancelled)),
            results,
        }
    }
}
