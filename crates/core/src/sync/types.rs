//! Types for the sync engine.

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::error;

use crate::catalog::StoreError;
use crate::fetcher::FetchError;
use crate::progress::{SyncSession, SyncState};

/// Errors that can occur during a sync or re-sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("A sync is already in progress")]
    AlreadyInProgress,

    #[error("No sync is running")]
    NotRunning,

    #[error("Release not found: {0}")]
    NotFound(u64),

    #[error("Failed to fetch listing page {page}: {source}")]
    Page { page: u32, source: FetchError },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Catalog error: {0}")]
    Store(StoreError),

    #[error("Sync cancelled")]
    Cancelled,
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SyncError::NotFound(id),
            other => SyncError::Store(other),
        }
    }
}

/// Handle to a started full sync.
#[derive(Debug)]
pub struct SyncHandle {
    session_id: u64,
    task: JoinHandle<SyncSession>,
}

impl SyncHandle {
    pub(crate) fn new(session_id: u64, task: JoinHandle<SyncSession>) -> Self {
        Self { session_id, task }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Wait for the session to finish and return its final snapshot.
    pub async fn wait(self) -> SyncSession {
        match self.task.await {
            Ok(session) => session,
            Err(e) => {
                error!(session = self.session_id, error = %e, "Sync worker failed");
                SyncSession {
                    session_id: self.session_id,
                    state: SyncState::Error,
                    message: format!("Sync worker failed: {}", e),
                    ..Default::default()
                }
            }
        }
    }
}
