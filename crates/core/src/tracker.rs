//! The tracker facade: the operations the API layer calls.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::catalog::{
    CatalogStats, InvalidStatus, JsonReleaseStore, Release, ReleasePage, ReleaseQuery,
    ReleaseStatus, ReleaseStore, StoreError,
};
use crate::config::Config;
use crate::fetcher::{FetchError, HttpFetcher, PageFetcher};
use crate::parser::ReleaseParser;
use crate::progress::{ProgressListener, ProgressReporter, SyncSession, TracingListener};
use crate::sync::{SyncConfig, SyncError, SyncHandle, SyncOrchestrator};

/// Errors surfaced to callers of the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("A sync is already in progress")]
    AlreadyInProgress,

    #[error("No sync is running")]
    NotRunning,

    #[error("Release not found: {0}")]
    NotFound(u64),

    #[error("Invalid status '{0}', expected one of: new, downloaded, ignored")]
    InvalidStatus(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Catalog error: {0}")]
    Store(StoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for TrackerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => TrackerError::NotFound(id),
            other => TrackerError::Store(other),
        }
    }
}

impl From<SyncError> for TrackerError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::AlreadyInProgress => TrackerError::AlreadyInProgress,
            SyncError::NotRunning => TrackerError::NotRunning,
            SyncError::NotFound(id) => TrackerError::NotFound(id),
            SyncError::Page { source, .. } => TrackerError::Fetch(source),
            SyncError::Fetch(e) => TrackerError::Fetch(e),
            SyncError::Store(e) => TrackerError::from(e),
            SyncError::Cancelled => TrackerError::Internal("Sync cancelled".to_string()),
        }
    }
}

impl From<InvalidStatus> for TrackerError {
    fn from(err: InvalidStatus) -> Self {
        TrackerError::InvalidStatus(err.0)
    }
}

/// Release tracker.
///
/// Owns the catalog, the sync orchestrator and the progress reporter.
pub struct Tracker {
    store: Arc<dyn ReleaseStore>,
    orchestrator: SyncOrchestrator,
    reporter: Arc<ProgressReporter>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("store", &"<store>")
            .field("status", &self.reporter.current_status().state)
            .finish()
    }
}

impl Tracker {
    /// Build a tracker with the JSON catalog and HTTP fetcher from `config`.
    pub fn from_config(config: &Config) -> Result<Self, TrackerError> {
        let store = JsonReleaseStore::open(config.catalog.path.clone())?;
        info!(path = %config.catalog.path.display(), releases = store.len(), "Catalog loaded");

        let fetcher = HttpFetcher::new(config.source.clone())
            .map_err(|e| TrackerError::Config(e.to_string()))?;
        let parser = ReleaseParser::new(&config.source.base_url, &config.parser)
            .map_err(|e| TrackerError::Config(e.to_string()))?;

        let tracker = Self::with_components(
            config.sync.clone(),
            Arc::new(store),
            Arc::new(fetcher),
            Arc::new(parser),
        );
        tracker.subscribe(Arc::new(TracingListener));
        Ok(tracker)
    }

    /// Build a tracker from explicit components.
    pub fn with_components(
        sync: SyncConfig,
        store: Arc<dyn ReleaseStore>,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<ReleaseParser>,
    ) -> Self {
        let reporter = Arc::new(ProgressReporter::new());
        let orchestrator = SyncOrchestrator::new(
            sync,
            Arc::clone(&store),
            fetcher,
            parser,
            Arc::clone(&reporter),
        );
        Self {
            store,
            orchestrator,
            reporter,
        }
    }

    /// Start a full sync in the background.
    pub fn start_sync(&self) -> Result<SyncHandle, TrackerError> {
        Ok(self.orchestrator.start_sync()?)
    }

    pub fn cancel_sync(&self) -> Result<(), TrackerError> {
        Ok(self.orchestrator.cancel_sync()?)
    }

    pub fn sync_status(&self) -> SyncSession {
        self.orchestrator.status()
    }

    pub fn list_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, TrackerError> {
        Ok(self.store.list(query)?)
    }

    pub fn get_release(&self, id: u64) -> Result<Release, TrackerError> {
        Ok(self.store.get(id)?)
    }

    /// Set a release's status from its wire name (`new`, `downloaded`, `ignored`).
    pub fn set_status(&self, id: u64, status: &str) -> Result<Release, TrackerError> {
        let status: ReleaseStatus = status.parse()?;
        let release = self.store.set_status(id, status)?;
        info!(id, status = status.as_str(), "Release status changed");
        Ok(release)
    }

    pub fn delete_release(&self, id: u64) -> Result<(), TrackerError> {
        self.store.delete(id)?;
        info!(id, "Release deleted");
        Ok(())
    }

    /// Remove every release. Returns how many were removed.
    pub fn clear_all(&self) -> Result<usize, TrackerError> {
        let removed = self.store.clear_all()?;
        info!(removed, "Catalog cleared");
        Ok(removed)
    }

    /// Re-scrape one release from its detail page.
    pub async fn resync(&self, id: u64) -> Result<Release, TrackerError> {
        Ok(self.orchestrator.resync(id).await?)
    }

    pub fn stats(&self) -> Result<CatalogStats, TrackerError> {
        Ok(self.store.stats()?)
    }

    /// Register a push-based progress consumer.
    pub fn subscribe(&self, listener: Arc<dyn ProgressListener>) {
        self.reporter.subscribe(listener);
    }

    pub fn reporter(&self) -> &Arc<ProgressReporter> {
        &self.reporter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserConfig;
    use crate::testing::MockFetcher;
    use tempfile::TempDir;

    fn tracker(dir: &TempDir) -> Tracker {
        let store = JsonReleaseStore::open(dir.path().join("releases.json")).unwrap();
        let parser = ReleaseParser::new("https://example.org", &ParserConfig::default()).unwrap();
        Tracker::with_components(
            SyncConfig::default(),
            Arc::new(store),
            Arc::new(MockFetcher::new("https://example.org")),
            Arc::new(parser),
        )
    }

    #[test]
    fn test_sync_error_mapping() {
        let err: TrackerError = SyncError::AlreadyInProgress.into();
        assert!(matches!(err, TrackerError::AlreadyInProgress));

        let err: TrackerError = SyncError::Store(StoreError::NotFound(4)).into();
        assert!(matches!(err, TrackerError::NotFound(4)));

        let err: TrackerError = SyncError::Fetch(FetchError::Blocked { status: 403 }).into();
        assert!(matches!(err, TrackerError::Fetch(FetchError::Blocked { status: 403 })));
    }

    #[test]
    fn test_set_status_invalid() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);

        let err = tracker.set_status(1, "archived").unwrap_err();
        assert!(matches!(err, TrackerError::InvalidStatus(ref s) if s == "archived"));
    }

    #[test]
    fn test_missing_release() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);

        assert!(matches!(tracker.get_release(3), Err(TrackerError::NotFound(3))));
        assert!(matches!(tracker.delete_release(3), Err(TrackerError::NotFound(3))));
        assert!(matches!(tracker.set_status(3, "new"), Err(TrackerError::NotFound(3))));
    }

    #[test]
    fn test_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);

        assert_eq!(tracker.clear_all().unwrap(), 0);
        let page = tracker.list_releases(&ReleaseQuery::new()).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(tracker.stats().unwrap().total, 0);
        assert!(matches!(tracker.cancel_sync(), Err(TrackerError::NotRunning)));
    }

    #[tokio::test]
    async fn test_resync_unknown() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        assert!(matches!(tracker.resync(9).await, Err(TrackerError::NotFound(9))));
    }
}
