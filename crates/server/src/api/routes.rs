use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::metrics_middleware;
use super::{handlers, releases, statistics, sync, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/statistics", get(statistics::get_statistics))
        // Releases
        .route(
            "/releases",
            get(releases::list_releases).delete(releases::clear_releases),
        )
        .route(
            "/releases/{id}",
            get(releases::get_release).delete(releases::delete_release),
        )
        .route("/releases/{id}/status", put(releases::set_status))
        .route("/releases/{id}/sync", post(releases::resync_release))
        // Full sync
        .route("/sync", post(sync::start_sync))
        .route("/sync/status", get(sync::get_status))
        .route("/sync/cancel", post(sync::cancel_sync))
        // Live progress
        .route("/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(metrics_middleware)),
        )
}
