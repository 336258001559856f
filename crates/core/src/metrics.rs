//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sync sessions (results, duration, processed releases)
//! - Single-release re-syncs
//! - Source fetches (requests, failures, retries)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Sync Metrics
// =============================================================================

/// Sync sessions total by result.
pub static SYNC_SESSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_sync_sessions_total", "Total sync sessions"),
        &["result"], // "completed", "error", "cancelled"
    )
    .unwrap()
});

/// Sync session duration in seconds.
pub static SYNC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tracker_sync_duration_seconds",
            "Duration of full sync sessions",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]),
        &["result"],
    )
    .unwrap()
});

/// Releases processed during syncs by outcome.
pub static RELEASES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tracker_releases_processed_total",
            "Total listing entries processed by sync",
        ),
        &["outcome"], // "new", "updated", "unchanged", "skipped"
    )
    .unwrap()
});

/// Listing pages processed.
pub static PAGES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_pages_processed_total", "Total listing pages processed"),
        &["result"], // "ok", "empty"
    )
    .unwrap()
});

/// Single-release re-syncs by result.
pub static RESYNCS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_resyncs_total", "Total single-release re-syncs"),
        &["result"], // "updated", "unchanged", "not_found", "error"
    )
    .unwrap()
});

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Source requests by page kind and status.
pub static FETCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_fetch_requests_total", "Total source page requests"),
        &["kind", "status"], // kind: "listing", "detail"; status: "success", "error"
    )
    .unwrap()
});

/// Source request duration in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tracker_fetch_duration_seconds",
            "Duration of source page requests",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .unwrap()
});

/// Fetch failures by error kind.
pub static FETCH_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_fetch_failures_total", "Total failed source requests"),
        &["error"], // "timeout", "connection", "http", "blocked", "body", "invalid_url"
    )
    .unwrap()
});

/// Retries of transient fetch failures.
pub static FETCH_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_fetch_retries_total", "Total fetch retry attempts"),
        &["error"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sync
        Box::new(SYNC_SESSIONS.clone()),
        Box::new(SYNC_DURATION.clone()),
        Box::new(RELEASES_PROCESSED.clone()),
        Box::new(PAGES_PROCESSED.clone()),
        Box::new(RESYNCS.clone()),
        // Fetch
        Box::new(FETCH_REQUESTS.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(FETCH_FAILURES.clone()),
        Box::new(FETCH_RETRIES.clone()),
    ]
}
