//! Bounded-concurrency batch processing with ordered, isolated results

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::parser::ParseError;
use crate::infrastructure::observability::metrics as telemetry;

use super::pipeline::{DocumentPipeline, DocumentRequest, ProcessedDocument};

/// Result of one job, paired with its submission index
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub index: usize,
    pub filename: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed(ProcessedDocument),
    Failed { error: ParseError },
    /// Never started because the batch was cancelled first
    Cancelled,
}

impl BatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchOutcome::Completed(_))
    }
}

/// Runs many documents through the pipeline under a concurrency bound
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    pipeline: Arc<DocumentPipeline>,
    default_max_concurrent: usize,
}

impl BatchOrchestrator {
    pub fn new(pipeline: Arc<DocumentPipeline>, default_max_concurrent: usize) -> Self {
        Self {
            pipeline,
            default_max_concurrent: default_max_concurrent.max(1),
        }
    }

    pub fn default_max_concurrent(&self) -> usize {
        self.default_max_concurrent
    }

    /// Process every job with the configured bound and no external cancellation
    pub async fn process(&self, jobs: Vec<DocumentRequest>) -> Vec<BatchResult> {
        self.process_batch(jobs, self.default_max_concurrent, &CancellationToken::new())
            .await
    }

    /// Process jobs with at most `max_concurrent` in flight
    ///
    /// Results come back in submission order. A job's failure never affects
    /// its siblings. Cancelling `cancel` stops jobs that have not yet acquired
    /// a slot; jobs already running finish normally.
    pub async fn process_batch(
        &self,
        jobs: Vec<DocumentRequest>,
        max_concurrent: usize,
        cancel: &CancellationToken,
    ) -> Vec<BatchResult> {
        let started = Instant::now();
        let max_concurrent = max_concurrent.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = jobs.len();

        info!(jobs = total, max_concurrent, "Starting batch");

        let handles: Vec<_> = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                let filename = job.filename.clone();
                let pipeline = self.pipeline.clone();
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();

                let handle = tokio::spawn(async move {
                    let permit = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        permit = semaphore.acquire_owned() => permit.ok(),
                    };

                    let Some(_permit) = permit else {
                        debug!(index, filename = %job.filename, "Batch job cancelled before start");
                        return BatchOutcome::Cancelled;
                    };

                    match pipeline.process(job).await {
                        Ok(processed) => BatchOutcome::Completed(processed),
                        Err(error) => BatchOutcome::Failed { error },
                    }
                });

                (index, filename, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(total);

        for (index, filename, handle) in handles {
            let outcome = handle.await.unwrap_or_else(|e| {
                warn!(index, filename = %filename, error = %e, "Batch job task failed");
                BatchOutcome::Failed {
                    error: ParseError::internal(format!("Batch job task failed: {}", e)),
                }
            });

            results.push(BatchResult {
                index,
                filename,
                outcome,
            });
        }

        let completed = results.iter().filter(|r| r.outcome.is_completed()).count();
        let cancelled = results
            .iter()
            .filter(|r| matches!(r.outcome, BatchOutcome::Cancelled))
            .count();
        let failed = total - completed - cancelled;

        telemetry::record_batch(completed, failed, cancelled, started.elapsed());
        info!(
            jobs = total,
            completed,
            failed,
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );

        results
    }
}
