//! Page fetching from the source site.
//!
//! [`PageFetcher`] is the seam the sync engine pulls raw markup through;
//! [`HttpFetcher`] is the production implementation. Transient failures are
//! retried with [`with_retry`].

mod config;
mod http;
mod retry;
mod types;

pub use config::SourceConfig;
pub use http::HttpFetcher;
pub use retry::{with_retry, RetryPolicy};
pub use types::*;
