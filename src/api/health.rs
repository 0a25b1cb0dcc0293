//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::infrastructure::services::HealthStatus;

use super::state::AppState;

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// Parser smoke checks; degraded still accepts traffic
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.processor.health_check().await;

    let status_code = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(report))
}

/// Liveness probe
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}
