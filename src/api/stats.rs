//! Service statistics and administrative endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::domain::stats::StatsSnapshot;
use crate::infrastructure::services::ProcessingOverview;

use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: StatsSnapshot,
    pub processing: ProcessingOverview,
}

#[derive(Debug, Serialize)]
pub struct CacheClearedResponse {
    pub cleared_entries: usize,
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: state.processor.stats(),
        processing: state.processor.processing_info(),
    })
}

/// Zero every counter and restart the uptime clock
pub async fn reset_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    state.processor.reset_stats();
    info!("Service statistics reset");

    Json(state.processor.stats())
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheClearedResponse> {
    let cleared_entries = state.processor.clear_cache();
    info!(cleared_entries, "Result cache cleared");

    Json(CacheClearedResponse { cleared_entries })
}
