//! Sync session snapshot and progress event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// State of the sync engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    #[default]
    Idle,
    Scraping,
    Processing,
    Completed,
    Error,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "IDLE",
            SyncState::Scraping => "SCRAPING",
            SyncState::Processing => "PROCESSING",
            SyncState::Completed => "COMPLETED",
            SyncState::Error => "ERROR",
        }
    }

    /// A session is running.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Scraping | SyncState::Processing)
    }

    /// A session has finished and not yet been reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Completed | SyncState::Error)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the current (or last) sync session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSession {
    /// Increases by one for every started session. 0 before the first one.
    pub session_id: u64,
    pub state: SyncState,
    pub current_page: u32,
    pub total_pages: u32,
    /// Listing entries handled so far.
    pub current_item: u32,
    /// Listing entries discovered so far.
    pub total_items: u32,
    pub new_count: u32,
    pub updated_count: u32,
    pub skipped_count: u32,
    /// Human-readable status text.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncSession {
    /// Idle snapshot following session `session_id`.
    pub fn idle(session_id: u64) -> Self {
        Self {
            session_id,
            message: "Idle".to_string(),
            ..Default::default()
        }
    }

    /// Fresh session entering SCRAPING.
    pub fn started(session_id: u64, total_pages: u32, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            state: SyncState::Scraping,
            total_pages,
            message: "Starting sync".to_string(),
            started_at: Some(now),
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// What a progress event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Started,
    Page,
    Item,
    Phase,
    Finished,
    Reset,
}

/// How one listing entry was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    New,
    Updated,
    Unchanged,
    /// Detail fetch failed; retried once more before the session ends.
    Deferred,
    Skipped,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::New => "new",
            ItemOutcome::Updated => "updated",
            ItemOutcome::Unchanged => "unchanged",
            ItemOutcome::Deferred => "deferred",
            ItemOutcome::Skipped => "skipped",
        }
    }
}

/// Per-item details attached to `Item` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub outcome: ItemOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<u64>,
    pub title: String,
    pub source_url: String,
}

/// A progress notification: the updated session plus what changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    pub session: SyncSession,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemProgress>,
}

impl ProgressEvent {
    pub fn new(kind: ProgressKind, session: SyncSession) -> Self {
        Self {
            kind,
            session,
            item: None,
        }
    }

    pub fn item(session: SyncSession, item: ItemProgress) -> Self {
        Self {
            kind: ProgressKind::Item,
            session,
            item: Some(item),
        }
    }
}

/// A listener failed to handle an event.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(SyncState::Scraping.is_active());
        assert!(SyncState::Processing.is_active());
        assert!(!SyncState::Idle.is_active());
        assert!(SyncState::Completed.is_terminal());
        assert!(SyncState::Error.is_terminal());
        assert!(!SyncState::Processing.is_terminal());
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(serde_json::to_string(&SyncState::Scraping).unwrap(), "\"SCRAPING\"");
        assert_eq!(SyncState::Completed.to_string(), "COMPLETED");
    }

    #[test]
    fn test_event_serialization() {
        let mut session = SyncSession::started(4, 10, Utc::now());
        session.new_count = 1;
        let event = ProgressEvent::item(
            session,
            ItemProgress {
                outcome: ItemOutcome::New,
                release_id: Some(7),
                title: "Game".to_string(),
                source_url: "https://example.org/torrent/1/".to_string(),
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "item");
        assert_eq!(json["session"]["state"], "SCRAPING");
        assert_eq!(json["session"]["new_count"], 1);
        assert_eq!(json["item"]["outcome"], "new");
        assert_eq!(json["item"]["release_id"], 7);

        let parsed: ProgressEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_idle_session() {
        let session = SyncSession::idle(3);
        assert_eq!(session.state, SyncState::Idle);
        assert_eq!(session.session_id, 3);
        assert!(session.started_at.is_none());
    }
}
