//! Sync engine.
//!
//! Walks the remote listing, enriches entries from their detail pages and
//! persists each one into the catalog while publishing progress.

mod config;
mod runner;
mod state;
mod types;

pub use config::{RecheckPolicy, SyncConfig};
pub use runner::SyncOrchestrator;
pub use state::StateCell;
pub use types::{SyncError, SyncHandle};
