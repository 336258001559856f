//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the tracker server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Catalog and sync state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use tracing::error;
use tracker_core::SyncState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tracker_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tracker_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tracker_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tracker_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tracker_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tracker_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Catalog releases by status.
pub static CATALOG_RELEASES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("tracker_catalog_releases", "Releases in the catalog by status"),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Sync Metrics (collected dynamically)
// =============================================================================

/// Current sync state, one series per state set to 1 for the active one.
pub static SYNC_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("tracker_sync_state", "Current sync state (1 = current)"),
        &["state"],
    )
    .unwrap()
});

/// Whether a sync session is running (1) or not (0).
pub static SYNC_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tracker_sync_active",
        "Whether a sync session is running (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Catalog and sync
    registry
        .register(Box::new(CATALOG_RELEASES.clone()))
        .unwrap();
    registry.register(Box::new(SYNC_STATE.clone())).unwrap();
    registry.register(Box::new(SYNC_ACTIVE.clone())).unwrap();

    // Core metrics (sync engine, fetcher)
    for metric in tracker_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the catalog and the sync
/// engine at scrape time.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let tracker = state.tracker();

    match tracker.stats() {
        Ok(stats) => {
            CATALOG_RELEASES
                .with_label_values(&["new"])
                .set(stats.new as i64);
            CATALOG_RELEASES
                .with_label_values(&["downloaded"])
                .set(stats.downloaded as i64);
            CATALOG_RELEASES
                .with_label_values(&["ignored"])
                .set(stats.ignored as i64);
        }
        Err(e) => error!("Failed to collect catalog stats: {}", e),
    }

    let session = tracker.sync_status();
    for sync_state in [
        SyncState::Idle,
        SyncState::Scraping,
        SyncState::Processing,
        SyncState::Completed,
        SyncState::Error,
    ] {
        let current = if sync_state == session.state { 1 } else { 0 };
        SYNC_STATE
            .with_label_values(&[sync_state.as_str()])
            .set(current);
    }
    SYNC_ACTIVE.set(if session.is_active() { 1 } else { 0 });
}

/// Normalize a path for metric labels (replace numeric IDs with a placeholder).
pub fn normalize_path(path: &str) -> String {
    // Applied twice: adjacent numeric segments share their separating slash.
    let result = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/releases/12345"), "/api/v1/releases/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_middle() {
        assert_eq!(
            normalize_path("/api/v1/releases/12345/status"),
            "/api/v1/releases/{id}/status"
        );
    }

    #[test]
    fn test_normalize_path_adjacent_numbers() {
        assert_eq!(normalize_path("/a/1/2"), "/a/{id}/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/sync2"), "/api/v1/sync2");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("tracker_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Prometheus only outputs vec metrics that have a labelled child.
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        WS_CONNECTIONS_ACTIVE.set(0);
        WS_CONNECTIONS_TOTAL.inc();
        CATALOG_RELEASES.with_label_values(&["new"]).set(0);
        SYNC_STATE.with_label_values(&["IDLE"]).set(1);
        SYNC_ACTIVE.set(0);
        tracker_core::metrics::SYNC_SESSIONS
            .with_label_values(&["completed"])
            .inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("tracker_http_request_duration_seconds"));
        assert!(output.contains("tracker_http_requests_in_flight"));
        assert!(output.contains("tracker_ws_connections_active"));
        assert!(output.contains("tracker_ws_connections_total"));
        assert!(output.contains("tracker_catalog_releases"));
        assert!(output.contains("tracker_sync_state"));
        assert!(output.contains("tracker_sync_active"));
        assert!(output.contains("tracker_sync_sessions_total"));
    }
}
