//! Parser smoke checks for health reporting

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::domain::document::mime;
use crate::domain::parser::{DocumentParser, ParserInput, ParserVariant};
use crate::infrastructure::parsers::ParserFactory;

const SMOKE_INPUT: &[u8] = b"Health check document.";

/// Health check status
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Smoke result for one parser variant
#[derive(Debug, Clone, Serialize)]
pub struct ParserHealth {
    pub parser: ParserVariant,
    pub available: bool,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub checked_at: DateTime<Utc>,
    pub checks: Vec<ParserHealth>,
}

/// Runs each parser variant against a trivial input
///
/// Healthy when every variant parses it, degraded when at least one does,
/// unhealthy when none can.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    factory: Arc<ParserFactory>,
}

impl HealthChecker {
    pub fn new(factory: Arc<ParserFactory>) -> Self {
        Self { factory }
    }

    pub async fn check(&self) -> HealthReport {
        let mut checks = Vec::new();

        for parser in self.factory.parsers() {
            checks.push(Self::check_parser(parser.as_ref()).await);
        }

        let passing = checks
            .iter()
            .filter(|c| c.status == HealthStatus::Healthy)
            .count();

        let status = if passing == 0 {
            HealthStatus::Unhealthy
        } else if passing < checks.len() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        if status != HealthStatus::Healthy {
            warn!(status = ?status, passing, total = checks.len(), "Parser health check not fully healthy");
        }

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            checked_at: Utc::now(),
            checks,
        }
    }

    async fn check_parser(parser: &dyn DocumentParser) -> ParserHealth {
        let variant = parser.variant();

        // capability probe first; an unavailable backend is not exercised
        if !parser.is_available() {
            return ParserHealth {
                parser: variant,
                available: false,
                status: HealthStatus::Unhealthy,
                message: Some("backend is not available".to_string()),
                latency_ms: None,
            };
        }

        let start = Instant::now();
        let input = ParserInput::new(Bytes::from_static(SMOKE_INPUT), "health.txt", mime::TEXT);

        let (status, message) = match parser.parse(input).await {
            Ok(document) if !document.content.is_empty() => (HealthStatus::Healthy, None),
            Ok(_) => (
                HealthStatus::Unhealthy,
                Some("smoke input produced no text".to_string()),
            ),
            Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
        };

        ParserHealth {
            parser: variant,
            available: true,
            status,
            message,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        }
    }
}
