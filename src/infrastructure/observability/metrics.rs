//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;
use crate::domain::parser::{ParseErrorKind, ParserVariant};

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid regex")
});
static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("valid regex"));

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("docpipe_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record one parser invocation
pub fn record_parser_attempt(parser: ParserVariant, duration: Duration, success: bool) {
    let labels = [
        ("parser", parser.as_str().to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("docpipe_parser_attempts_total", &labels).increment(1);
    histogram!("docpipe_processing_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_document_processed(duration: Duration) {
    counter!("docpipe_documents_processed_total").increment(1);
    histogram!("docpipe_document_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_processing_error(kind: ParseErrorKind) {
    counter!("docpipe_errors_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!("docpipe_cache_hits_total").increment(1);
    } else {
        counter!("docpipe_cache_misses_total").increment(1);
    }
}

pub fn record_cache_eviction(reason: &'static str) {
    counter!("docpipe_cache_evictions_total", "reason" => reason).increment(1);
}

pub fn set_cache_entries(entries: usize) {
    gauge!("docpipe_cache_entries").set(entries as f64);
}

/// Record a finished batch by outcome counts
pub fn record_batch(completed: usize, failed: usize, cancelled: usize, duration: Duration) {
    counter!("docpipe_batches_total").increment(1);
    counter!("docpipe_batch_jobs_total", "outcome" => "completed").increment(completed as u64);
    counter!("docpipe_batch_jobs_total", "outcome" => "failed").increment(failed as u64);
    counter!("docpipe_batch_jobs_total", "outcome" => "cancelled").increment(cancelled as u64);
    histogram!("docpipe_batch_duration_seconds").record(duration.as_secs_f64());
}

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    path.chars().take(50).collect()
}
