//! Testing utilities and mock implementations.
//!
//! [`MockFetcher`] stands in for the remote site, [`RecordingListener`]
//! captures progress events, and [`fixtures`] renders listing and detail
//! markup shaped like the real pages.
//!
//! # Example
//!
//! ```rust,ignore
//! use tracker_core::testing::{fixtures::{listing_page, ListingRow}, MockFetcher, RecordingListener};
//!
//! let fetcher = MockFetcher::new("https://example.org");
//! fetcher.set_listing(1, listing_page(&[ListingRow::new(1, "Game")])).await;
//!
//! let listener = Arc::new(RecordingListener::new());
//! reporter.subscribe(listener.clone());
//! ```

pub mod fixtures;
mod mock_fetcher;

pub use mock_fetcher::{FetchTarget, MockFetcher, RecordedFetch};

use std::sync::{Mutex, PoisonError};

use crate::progress::{
    ItemOutcome, ListenerError, ProgressEvent, ProgressKind, ProgressListener,
};

/// Progress listener that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// All received events, oldest first.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Kinds of all received events, oldest first.
    pub fn kinds(&self) -> Vec<ProgressKind> {
        self.events().iter().map(|e| e.kind).collect()
    }

    /// Item outcomes in the order they were reported.
    pub fn outcomes(&self) -> Vec<ItemOutcome> {
        self.events()
            .iter()
            .filter_map(|e| e.item.as_ref().map(|i| i.outcome))
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ProgressListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    fn on_progress(&self, event: &ProgressEvent) -> Result<(), ListenerError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
