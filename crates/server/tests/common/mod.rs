//! Common test utilities for API testing with a mock source.
//!
//! This module provides a test fixture that builds the full router over a
//! temporary JSON catalog and a [`MockFetcher`], so sync and re-sync run end
//! to end without network access.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tracker_core::{
    testing::{
        fixtures::{listing_page, DetailPage, ListingRow},
        MockFetcher,
    },
    Config, JsonReleaseStore, PageFetcher, ParserConfig, ReleaseParser, ReleaseStore, RetryPolicy,
    SyncConfig, SyncState, Tracker,
};
use tracker_server::api::{create_router, WsBroadcaster};
use tracker_server::state::AppState;

pub const BASE_URL: &str = "https://example.org";

/// Test fixture for API testing with a mock source.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_list() {
///     let fixture = TestFixture::new();
///     fixture.seed(&["Alpha Quest"]).await;
///
///     let response = fixture.get("/api/v1/releases").await;
///     assert_eq!(response.body["total"], 1);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub tracker: Arc<Tracker>,
    /// Mock source - configure listing and detail pages
    pub fetcher: Arc<MockFetcher>,
    /// Temporary directory holding the catalog file
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let catalog_path = temp_dir.path().join("releases.json");

        let mut config = Config::default();
        config.catalog.path = catalog_path.clone();
        config.source.base_url = BASE_URL.to_string();
        config.sync = SyncConfig::default()
            .with_max_pages(5)
            .with_delays(0, 0)
            .with_retry(RetryPolicy::none())
            .with_reset_grace(60_000);

        let store: Arc<dyn ReleaseStore> = Arc::new(
            JsonReleaseStore::open(catalog_path).expect("Failed to open catalog"),
        );
        let fetcher = Arc::new(MockFetcher::new(BASE_URL));
        let parser = Arc::new(
            ReleaseParser::new(BASE_URL, &ParserConfig::default()).expect("Failed to build parser"),
        );
        let tracker = Arc::new(Tracker::with_components(
            config.sync.clone(),
            store,
            Arc::clone(&fetcher) as Arc<dyn PageFetcher>,
            parser,
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&tracker),
            WsBroadcaster::default(),
        ));
        let router = create_router(state);

        Self {
            router,
            tracker,
            fetcher,
            temp_dir,
        }
    }

    /// Detail URL of listing entry `id`.
    pub fn detail_url(id: u32) -> String {
        format!("{}/torrent/{}/game-{}/", BASE_URL, id, id)
    }

    /// Serve `titles` on listing page 1 with complete detail pages.
    pub async fn publish(&self, titles: &[&str]) {
        let rows: Vec<ListingRow> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| ListingRow::new(i as u32 + 1, title))
            .collect();
        self.fetcher.set_listing(1, listing_page(&rows)).await;
        for (i, title) in titles.iter().enumerate() {
            self.fetcher
                .set_detail(
                    &Self::detail_url(i as u32 + 1),
                    DetailPage::complete(title, "10.0 GB").render(),
                )
                .await;
        }
    }

    /// Publish `titles` and run a full sync to completion.
    pub async fn seed(&self, titles: &[&str]) {
        self.publish(titles).await;
        let session = self
            .tracker
            .start_sync()
            .expect("Failed to start sync")
            .wait()
            .await;
        assert_eq!(session.state, SyncState::Completed, "{}", session.message);
    }

    /// Id of the release titled `title`.
    pub async fn release_id(&self, title: &str) -> u64 {
        let response = self.get("/api/v1/releases?limit=500").await;
        response.body["items"]
            .as_array()
            .expect("items array")
            .iter()
            .find(|item| item["title"] == title)
            .and_then(|item| item["id"].as_u64())
            .unwrap_or_else(|| panic!("release {} not found", title))
    }

    /// Poll `/sync/status` until the state matches.
    pub async fn wait_for_sync_state(&self, expected: &str, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.get("/api/v1/sync/status").await.body["state"] == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
