//! WebSocket support for live sync progress.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracker_core::{
    ItemProgress, ListenerError, ProgressEvent, ProgressKind, ProgressListener, SyncSession,
};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients for real-time updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Current snapshot, sent once when a client connects.
    SyncStatus { session: SyncSession },
    SyncStarted { session: SyncSession },
    /// A listing page was fetched.
    SyncPage { session: SyncSession },
    /// A listing entry was classified.
    SyncItem {
        session: SyncSession,
        item: ItemProgress,
    },
    /// The session moved to another phase.
    SyncPhase { session: SyncSession },
    SyncFinished { session: SyncSession },
    /// The session was reset to IDLE.
    SyncReset { session: SyncSession },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            WsMessage::SyncStatus { .. } => "sync_status",
            WsMessage::SyncStarted { .. } => "sync_started",
            WsMessage::SyncPage { .. } => "sync_page",
            WsMessage::SyncItem { .. } => "sync_item",
            WsMessage::SyncPhase { .. } => "sync_phase",
            WsMessage::SyncFinished { .. } => "sync_finished",
            WsMessage::SyncReset { .. } => "sync_reset",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

impl From<&ProgressEvent> for WsMessage {
    fn from(event: &ProgressEvent) -> Self {
        let session = event.session.clone();
        match (event.kind, &event.item) {
            (ProgressKind::Started, _) => WsMessage::SyncStarted { session },
            (ProgressKind::Page, _) => WsMessage::SyncPage { session },
            (ProgressKind::Item, Some(item)) => WsMessage::SyncItem {
                session,
                item: item.clone(),
            },
            // An item event without its item still carries the counters.
            (ProgressKind::Item, None) => WsMessage::SyncPage { session },
            (ProgressKind::Phase, _) => WsMessage::SyncPhase { session },
            (ProgressKind::Finished, _) => WsMessage::SyncFinished { session },
            (ProgressKind::Reset, _) => WsMessage::SyncReset { session },
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsMessage>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast a message to all connected clients.
    pub fn broadcast(&self, msg: WsMessage) {
        // No receivers just means no client is connected.
        let _ = self.sender.send(msg);
    }

    /// Subscribe to receive messages.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressListener for WsBroadcaster {
    fn name(&self) -> &str {
        "websocket"
    }

    fn on_progress(&self, event: &ProgressEvent) -> Result<(), ListenerError> {
        self.broadcast(WsMessage::from(event));
        Ok(())
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn encode(msg: &WsMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            None
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot so no event falls in between.
    let mut rx = state.ws_broadcaster().subscribe();
    let snapshot = WsMessage::SyncStatus {
        session: state.tracker().sync_status(),
    };

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!("WebSocket client connected");

    // Spawn task to forward broadcast messages to this client
    let send_task = tokio::spawn(async move {
        if let Some(message) = encode(&snapshot) {
            if sender.send(message).await.is_err() {
                return;
            }
            WS_MESSAGES_SENT.with_label_values(&[snapshot.kind()]).inc();
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        loop {
            let msg = tokio::select! {
                result = rx.recv() => match result {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} messages", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => WsMessage::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                },
            };

            let Some(message) = encode(&msg) else {
                continue;
            };
            if sender.send(message).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
            WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring client message: {}", text.as_str());
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::{ItemOutcome, SyncState};

    #[test]
    fn test_message_is_tagged() {
        let msg = WsMessage::Heartbeat { timestamp: 1 };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["timestamp"], 1);
    }

    #[test]
    fn test_progress_event_conversion() {
        let mut session = SyncSession::idle(3);
        session.state = SyncState::Scraping;
        session.current_item = 1;
        let event = ProgressEvent::item(
            session,
            ItemProgress {
                outcome: ItemOutcome::New,
                release_id: Some(7),
                title: "Game".into(),
                source_url: "https://example.org/torrent/7/game/".into(),
            },
        );

        let json = serde_json::to_value(WsMessage::from(&event)).unwrap();
        assert_eq!(json["type"], "sync_item");
        assert_eq!(json["session"]["state"], "SCRAPING");
        assert_eq!(json["item"]["release_id"], 7);
    }

    #[tokio::test]
    async fn test_broadcaster_forwards_progress() {
        let broadcaster = WsBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        let event = ProgressEvent::new(ProgressKind::Finished, SyncSession::idle(2));
        broadcaster.on_progress(&event).unwrap();

        match rx.recv().await.unwrap() {
            WsMessage::SyncFinished { session } => assert_eq!(session.session_id, 2),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_without_clients_is_ok() {
        let broadcaster = WsBroadcaster::default();
        let event = ProgressEvent::new(ProgressKind::Started, SyncSession::idle(1));
        assert!(broadcaster.on_progress(&event).is_ok());
        assert_eq!(broadcaster.receiver_count(), 0);
    }
}
