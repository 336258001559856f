//! Release API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracker_core::{Release, ReleasePage, ReleaseQuery, ReleaseStatus, SortKey, TrackerError};

use super::handlers::{bad_request, ApiError, SuccessResponse};
use crate::state::AppState;

const MAX_LIMIT: u32 = 500;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

impl ListParams {
    /// Validate and convert into a catalog query.
    pub fn into_query(self) -> Result<ReleaseQuery, Response> {
        let mut query = ReleaseQuery::new();

        if let Some(search) = self.search.filter(|s| !s.trim().is_empty()) {
            query = query.with_search(search);
        }
        if let Some(status) = self.status.filter(|s| !s.is_empty() && s != "all") {
            let status: ReleaseStatus = status
                .parse()
                .map_err(|e: tracker_core::catalog::InvalidStatus| {
                    ApiError(TrackerError::from(e)).into_response()
                })?;
            query = query.with_status(status);
        }
        if let Some(sort) = self.sort.filter(|s| !s.is_empty()) {
            let sort: SortKey = sort.parse().map_err(bad_request)?;
            query = query.with_sort(sort);
        }

        let page = self.page.unwrap_or(query.page);
        let limit = self.limit.unwrap_or(query.limit);
        if page == 0 {
            return Err(bad_request("page must be at least 1"));
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(bad_request(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(query.with_page(page, limit))
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub removed: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/releases
///
/// List releases with search, status filter, sort and pagination.
pub async fn list_releases(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ReleasePage>, Response> {
    let query = params.into_query()?;
    state
        .tracker()
        .list_releases(&query)
        .map(Json)
        .map_err(|e| ApiError(e).into_response())
}

/// GET /api/v1/releases/{id}
pub async fn get_release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Release>, ApiError> {
    Ok(Json(state.tracker().get_release(id)?))
}

/// PUT /api/v1/releases/{id}/status
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Release>, ApiError> {
    Ok(Json(state.tracker().set_status(id, &request.status)?))
}

/// DELETE /api/v1/releases/{id}
pub async fn delete_release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.tracker().delete_release(id)?;
    Ok(Json(SuccessResponse {
        message: format!("Release {} deleted", id),
    }))
}

/// DELETE /api/v1/releases
///
/// Remove every release from the catalog.
pub async fn clear_releases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.tracker().clear_all()?;
    Ok(Json(ClearResponse {
        message: "Catalog cleared".to_string(),
        removed,
    }))
}

/// POST /api/v1/releases/{id}/sync
///
/// Re-scrape a single release from its detail page.
pub async fn resync_release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Release>, ApiError> {
    Ok(Json(state.tracker().resync(id).await?))
}
