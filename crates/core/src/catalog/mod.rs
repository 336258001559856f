//! Release catalog - the durable, de-duplicated collection of scraped releases.
//!
//! Entries are keyed by a store-assigned id and de-duplicated by source URL.
//! Scrape-derived fields are only rewritten when their content hash changes;
//! the user-assigned status is never touched by a scrape.

pub mod atomic;
mod config;
mod json_store;
mod types;

pub use config::CatalogConfig;
pub use json_store::JsonReleaseStore;
pub use types::*;

use chrono::{DateTime, Utc};

/// Trait for release catalog storage.
///
/// Every mutating call is durable once it returns `Ok`. Implementations
/// serialize mutations; reads see the last committed state.
pub trait ReleaseStore: Send + Sync {
    /// Create or update the entry for `source_url`.
    ///
    /// Unknown URLs get a fresh id and status NEW. Known URLs are only
    /// rewritten when the content hash of `fields` differs from the stored one;
    /// id and status are preserved either way.
    fn upsert_from_scrape(
        &self,
        source_url: &str,
        fields: ScrapedFields,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Update-only variant of `upsert_from_scrape`, addressed by id.
    ///
    /// Fails with `NotFound` instead of recreating a deleted entry.
    fn refresh(&self, id: u64, fields: ScrapedFields) -> Result<(Release, UpsertKind), StoreError>;

    fn get(&self, id: u64) -> Result<Release, StoreError>;

    /// Secondary lookup by source URL.
    fn find_by_url(&self, source_url: &str) -> Result<Option<Release>, StoreError>;

    /// Remove an entry entirely, forgetting its source URL.
    fn delete(&self, id: u64) -> Result<(), StoreError>;

    fn list(&self, query: &ReleaseQuery) -> Result<ReleasePage, StoreError>;

    /// User-driven status change. Never touches the content hash.
    fn set_status(&self, id: u64, status: ReleaseStatus) -> Result<Release, StoreError>;

    /// Remove every entry. Returns how many were removed. Ids are not reused.
    fn clear_all(&self) -> Result<usize, StoreError>;

    fn stats(&self) -> Result<CatalogStats, StoreError>;

    /// Record the completion time of a successful full sync.
    fn mark_synced(&self, at: DateTime<Utc>) -> Result<(), StoreError>;
}
