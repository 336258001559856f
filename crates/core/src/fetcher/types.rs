//! Types for page fetching.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while fetching a page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Blocked by source (HTTP {status})")]
    Blocked { status: u16 },

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::ConnectionFailed(_) | FetchError::Body(_) => {
                true
            }
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::Blocked { status } => *status == 429,
            FetchError::InvalidUrl(_) => false,
        }
    }

    /// Short label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::ConnectionFailed(_) => "connection",
            FetchError::Http { .. } => "http",
            FetchError::Blocked { .. } => "blocked",
            FetchError::Body(_) => "body",
            FetchError::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// Source of raw listing and detail markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetcher name for logging.
    fn name(&self) -> &str;

    /// Raw markup of listing page `page` (1-based).
    async fn fetch_listing(&self, page: u32) -> Result<String, FetchError>;

    /// Raw markup of the detail page at `url`.
    async fn fetch_detail(&self, url: &str) -> Result<String, FetchError>;
}
