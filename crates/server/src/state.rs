use std::sync::Arc;
use tracker_core::{Config, Tracker};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    tracker: Arc<Tracker>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    /// Wire the broadcaster into the tracker's progress events.
    pub fn new(config: Config, tracker: Arc<Tracker>, ws_broadcaster: WsBroadcaster) -> Self {
        tracker.subscribe(Arc::new(ws_broadcaster.clone()));
        Self {
            config,
            tracker,
            ws_broadcaster,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tracker(&self) -> &Tracker {
        self.tracker.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
