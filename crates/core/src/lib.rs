//! Release tracker core.
//!
//! Scrapes a paginated release listing, enriches each entry from its detail
//! page and keeps a durable, de-duplicated catalog with user-assigned
//! statuses. See [`Tracker`] for the operations exposed to the API layer.

pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod metrics;
pub mod parser;
pub mod progress;
pub mod sync;
pub mod testing;
mod tracker;

pub use catalog::{
    CatalogConfig, CatalogStats, JsonReleaseStore, Release, ReleasePage, ReleaseQuery,
    ReleaseStatus, ReleaseStore, ScrapedFields, SortKey, StoreError, UpsertKind, UpsertOutcome,
};
pub use config::{
    config_path, load_config, load_config_from_str, validate_config, Config, ConfigError,
    ServerConfig,
};
pub use fetcher::{FetchError, HttpFetcher, PageFetcher, RetryPolicy, SourceConfig};
pub use parser::{ParseError, ParserConfig, ReleaseDetail, ReleaseParser, ReleaseSummary};
pub use progress::{
    ItemOutcome, ItemProgress, ListenerError, ProgressEvent, ProgressKind, ProgressListener,
    ProgressReporter, SyncSession, SyncState, TracingListener,
};
pub use sync::{RecheckPolicy, SyncConfig, SyncError, SyncHandle, SyncOrchestrator};
pub use tracker::{Tracker, TrackerError};
