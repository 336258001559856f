//! Sync API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracker_core::SyncSession;

use super::handlers::{ApiError, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StartSyncResponse {
    pub message: String,
    pub session_id: u64,
}

/// POST /api/v1/sync
///
/// Start a full sync in the background. Returns 202 immediately; progress
/// is available from `/sync/status` and the WebSocket.
pub async fn start_sync(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<StartSyncResponse>), ApiError> {
    // The handle is dropped: the session runs detached.
    let handle = state.tracker().start_sync()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartSyncResponse {
            message: "Sync started".to_string(),
            session_id: handle.session_id(),
        }),
    ))
}

/// GET /api/v1/sync/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SyncSession> {
    Json(state.tracker().sync_status())
}

/// POST /api/v1/sync/cancel
pub async fn cancel_sync(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    state.tracker().cancel_sync()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse {
            message: "Sync cancellation requested".to_string(),
        }),
    ))
}
