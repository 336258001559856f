//! Statistics API handler.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use tracker_core::{CatalogStats, SyncSession};

use super::handlers::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    #[serde(flatten)]
    pub catalog: CatalogStats,
    pub sync: SyncSession,
}

/// GET /api/v1/statistics
///
/// Catalog counts per status, publish date range, and the current sync.
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let tracker = state.tracker();
    Ok(Json(StatisticsResponse {
        catalog: tracker.stats()?,
        sync: tracker.sync_status(),
    }))
}
