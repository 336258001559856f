//! Mock page fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, PageFetcher};

use super::fixtures::listing_page;

/// What a recorded fetch asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    Listing(u32),
    Detail(String),
}

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub target: FetchTarget,
    pub timestamp: Instant,
}

/// A scripted failure. `remaining: None` fails forever.
#[derive(Debug, Clone)]
struct ScriptedFailure {
    error: FetchError,
    remaining: Option<u32>,
}

impl ScriptedFailure {
    /// Consume one failure, returning the error if it still applies.
    fn take(&mut self) -> Option<FetchError> {
        match &mut self.remaining {
            None => Some(self.error.clone()),
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(self.error.clone())
            }
        }
    }
}

/// Mock implementation of the PageFetcher trait.
///
/// Serves scripted listing and detail markup:
/// - listing pages that were never set come back as an empty listing
/// - detail URLs that were never set fail with HTTP 404
/// - failures can be permanent or limited to the next N calls
///
/// # Example
///
/// ```rust,ignore
/// use tracker_core::testing::{fixtures, MockFetcher};
///
/// let fetcher = MockFetcher::new("https://example.org");
/// fetcher.set_listing(1, fixtures::listing_page(&[fixtures::ListingRow::new(1, "Game")])).await;
/// fetcher.set_detail(&fetcher.url("/torrent/1/game-1/"), fixtures::DetailPage::complete("Game", "10 GB").render()).await;
/// ```
pub struct MockFetcher {
    base_url: String,
    listings: Arc<RwLock<HashMap<u32, String>>>,
    details: Arc<RwLock<HashMap<String, String>>>,
    listing_failures: Arc<RwLock<HashMap<u32, ScriptedFailure>>>,
    detail_failures: Arc<RwLock<HashMap<String, ScriptedFailure>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    latency: Arc<RwLock<Option<Duration>>>,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("base_url", &self.base_url)
            .field("listings", &"<listings>")
            .field("details", &"<details>")
            .field("fetches", &"<fetches>")
            .finish()
    }
}

impl MockFetcher {
    /// Create a mock fetcher serving empty listings.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            listings: Arc::new(RwLock::new(HashMap::new())),
            details: Arc::new(RwLock::new(HashMap::new())),
            listing_failures: Arc::new(RwLock::new(HashMap::new())),
            detail_failures: Arc::new(RwLock::new(HashMap::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
            latency: Arc::new(RwLock::new(None)),
        }
    }

    /// Absolute URL for a site path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Set the markup of listing page `page`.
    pub async fn set_listing(&self, page: u32, html: String) {
        self.listings.write().await.insert(page, html);
    }

    /// Set the markup of the detail page at `url`.
    pub async fn set_detail(&self, url: &str, html: String) {
        self.details.write().await.insert(url.to_string(), html);
    }

    /// Make every fetch of listing page `page` fail.
    pub async fn fail_listing(&self, page: u32, error: FetchError) {
        self.listing_failures.write().await.insert(
            page,
            ScriptedFailure {
                error,
                remaining: None,
            },
        );
    }

    /// Make every fetch of the detail page at `url` fail.
    pub async fn fail_detail(&self, url: &str, error: FetchError) {
        self.detail_failures.write().await.insert(
            url.to_string(),
            ScriptedFailure {
                error,
                remaining: None,
            },
        );
    }

    /// Make the next `times` fetches of the detail page at `url` fail.
    pub async fn fail_detail_times(&self, url: &str, error: FetchError, times: u32) {
        self.detail_failures.write().await.insert(
            url.to_string(),
            ScriptedFailure {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Remove all scripted failures.
    pub async fn clear_failures(&self) {
        self.listing_failures.write().await.clear();
        self.detail_failures.write().await.clear();
    }

    /// Delay every fetch by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    /// All recorded fetches, oldest first.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Listing pages fetched, in order.
    pub async fn listing_fetches(&self) -> Vec<u32> {
        self.fetches
            .read()
            .await
            .iter()
            .filter_map(|f| match f.target {
                FetchTarget::Listing(page) => Some(page),
                FetchTarget::Detail(_) => None,
            })
            .collect()
    }

    /// Detail URLs fetched, in order.
    pub async fn detail_fetches(&self) -> Vec<String> {
        self.fetches
            .read()
            .await
            .iter()
            .filter_map(|f| match &f.target {
                FetchTarget::Detail(url) => Some(url.clone()),
                FetchTarget::Listing(_) => None,
            })
            .collect()
    }

    pub async fn clear_recorded(&self) {
        self.fetches.write().await.clear();
    }

    async fn record(&self, target: FetchTarget) {
        self.fetches.write().await.push(RecordedFetch {
            target,
            timestamp: Instant::now(),
        });
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_listing(&self, page: u32) -> Result<String, FetchError> {
        self.record(FetchTarget::Listing(page)).await;

        if let Some(failure) = self.listing_failures.write().await.get_mut(&page) {
            if let Some(error) = failure.take() {
                return Err(error);
            }
        }
        Ok(self
            .listings
            .read()
            .await
            .get(&page)
            .cloned()
            .unwrap_or_else(|| listing_page(&[])))
    }

    async fn fetch_detail(&self, url: &str) -> Result<String, FetchError> {
        self.record(FetchTarget::Detail(url.to_string())).await;

        if let Some(failure) = self.detail_failures.write().await.get_mut(url) {
            if let Some(error) = failure.take() {
                return Err(error);
            }
        }
        self.details
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Http {
                status: 404,
                url: url.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unset_pages() {
        let fetcher = MockFetcher::new("https://example.org/");
        let listing = fetcher.fetch_listing(7).await.unwrap();
        assert!(listing.contains("table-list"));

        let err = fetcher
            .fetch_detail(&fetcher.url("/torrent/1/x/"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Http {
                status: 404,
                url: "https://example.org/torrent/1/x/".into()
            }
        );
    }

    #[tokio::test]
    async fn test_limited_failures_then_success() {
        let fetcher = MockFetcher::new("https://example.org");
        let url = fetcher.url("/torrent/1/x/");
        fetcher.set_detail(&url, "<html>ok</html>".into()).await;
        fetcher
            .fail_detail_times(&url, FetchError::Timeout { url: url.clone() }, 2)
            .await;

        assert!(fetcher.fetch_detail(&url).await.is_err());
        assert!(fetcher.fetch_detail(&url).await.is_err());
        assert_eq!(fetcher.fetch_detail(&url).await.unwrap(), "<html>ok</html>");
        assert_eq!(fetcher.detail_fetches().await.len(), 3);
    }

    #[tokio::test]
    async fn test_records_order() {
        let fetcher = MockFetcher::new("https://example.org");
        fetcher.fetch_listing(1).await.unwrap();
        let _ = fetcher.fetch_detail("https://example.org/a").await;
        fetcher.fetch_listing(2).await.unwrap();

        assert_eq!(fetcher.listing_fetches().await, vec![1, 2]);
        let recorded = fetcher.recorded_fetches().await;
        assert_eq!(recorded[1].target, FetchTarget::Detail("https://example.org/a".into()));
    }
}
