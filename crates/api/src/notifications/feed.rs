//! Event bus to WebSocket relay.

use std::sync::Arc;

use axum::extract::ws::Message;
use radar_events::StationEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Relays station events to every feed subscriber as JSON text frames.
pub struct StationFeed {
    ws_manager: Arc<WsManager>,
}

impl StationFeed {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the relay loop.
    ///
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](radar_events::EventBus) is dropped). A lagging receiver
    /// only loses intermediate events; subscribers recover through their
    /// periodic re-fetch.
    pub async fn run(self, mut receiver: broadcast::Receiver<StationEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.relay(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Station feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, station feed shutting down");
                    break;
                }
            }
        }
    }

    async fn relay(&self, event: &StationEvent) {
        match serde_json::to_string(event) {
            Ok(text) => {
                tracing::debug!(kind = event.kind(), "Relaying station event");
                self.ws_manager.broadcast(Message::Text(text.into())).await;
            }
            Err(e) => {
                tracing::error!(error = %e, kind = event.kind(), "Failed to serialize station event");
            }
        }
    }
}
