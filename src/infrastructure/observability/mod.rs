//! Observability infrastructure - Prometheus metrics

mod config;
pub mod metrics;

pub use config::MetricsConfig;
pub use metrics::{create_metrics_router, init_metrics, PrometheusMetrics};
