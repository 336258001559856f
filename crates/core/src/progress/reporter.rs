//! Progress reporter: current snapshot plus synchronous listener fan-out.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

use super::{ProgressEvent, ProgressKind, ProgressListener, SyncSession};

/// Holds the latest [`SyncSession`] and notifies listeners of every event.
///
/// Listeners run on the publishing task, in registration order. A failing or
/// panicking listener is logged and skipped; the publisher never sees it.
pub struct ProgressReporter {
    snapshot: RwLock<SyncSession>,
    listeners: RwLock<Vec<Arc<dyn ProgressListener>>>,
    publish_lock: Mutex<()>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(SyncSession::idle(0)),
            listeners: RwLock::new(Vec::new()),
            publish_lock: Mutex::new(()),
        }
    }

    /// Register a listener for all future events.
    pub fn subscribe(&self, listener: Arc<dyn ProgressListener>) {
        debug!(listener = listener.name(), "Progress listener registered");
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Record the event's session as current and notify every listener.
    pub fn publish(&self, event: ProgressEvent) {
        self.publish_if(event, |_| true);
    }

    /// Like [`publish`](Self::publish), but only when `accept` approves the
    /// current snapshot. Returns whether the event was published.
    pub fn publish_if<F>(&self, event: ProgressEvent, accept: F) -> bool
    where
        F: FnOnce(&SyncSession) -> bool,
    {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
            if !accept(&snapshot) {
                return false;
            }
            *snapshot = event.session.clone();
        }

        let listeners: Vec<Arc<dyn ProgressListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_progress(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    listener = listener.name(),
                    error = %e,
                    "Progress listener failed"
                ),
                Err(_) => warn!(listener = listener.name(), "Progress listener panicked"),
            }
        }
        true
    }

    /// Latest session snapshot.
    pub fn current_status(&self) -> SyncSession {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Logs every progress event.
#[derive(Debug, Default)]
pub struct TracingListener;

impl ProgressListener for TracingListener {
    fn name(&self) -> &str {
        "tracing"
    }

    fn on_progress(&self, event: &ProgressEvent) -> Result<(), super::ListenerError> {
        let s = &event.session;
        match event.kind {
            ProgressKind::Item => {
                if let Some(item) = &event.item {
                    debug!(
                        session = s.session_id,
                        item = s.current_item,
                        outcome = item.outcome.as_str(),
                        release_id = ?item.release_id,
                        title = %item.title,
                        "Sync item"
                    );
                }
            }
            ProgressKind::Page => info!(
                session = s.session_id,
                page = s.current_page,
                items = s.total_items,
                new = s.new_count,
                updated = s.updated_count,
                skipped = s.skipped_count,
                "Sync page done"
            ),
            _ => info!(
                session = s.session_id,
                state = %s.state,
                message = %s.message,
                "Sync {}",
                match event.kind {
                    ProgressKind::Started => "started",
                    ProgressKind::Phase => "phase changed",
                    ProgressKind::Finished => "finished",
                    _ => "reset",
                }
            ),
        }
        Ok(())
    }
}
