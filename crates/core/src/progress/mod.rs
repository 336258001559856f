//! Sync progress reporting.
//!
//! The sync engine publishes a [`ProgressEvent`] after every page and item;
//! the [`ProgressReporter`] keeps the latest [`SyncSession`] for polling
//! callers and forwards events to registered [`ProgressListener`]s.

mod reporter;
mod types;

pub use reporter::{ProgressReporter, TracingListener};
pub use types::*;

/// Push-based consumer of progress events.
///
/// Called synchronously on the sync task; implementations must not block.
pub trait ProgressListener: Send + Sync {
    /// Listener name for logging.
    fn name(&self) -> &str {
        "listener"
    }

    fn on_progress(&self, event: &ProgressEvent) -> Result<(), ListenerError>;
}
