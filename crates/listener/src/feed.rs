//! WebSocket change feed subscription.
//!
//! Connects to the server's `/ws` endpoint and forwards every
//! [`StationEvent`] to the listener loop. Reconnects with a fixed delay;
//! the server sends a fresh `station_snapshot` on every connect, so events
//! missed while disconnected are covered.

use std::time::Duration;

use futures::StreamExt;
use radar_events::StationEvent;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Reconnection delay after a WebSocket failure.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Run the subscription until the listener drops its receiver.
pub async fn run(ws_url: String, events: mpsc::Sender<StationEvent>) {
    loop {
        tracing::info!(url = %ws_url, "Connecting to station feed");

        match connect_async(ws_url.as_str()).await {
            Ok((ws_stream, _response)) => {
                tracing::info!("Station feed connected");
                if !run_session(ws_stream, &events).await {
                    tracing::info!("Listener gone, station feed stopping");
                    return;
                }
                tracing::warn!("Station feed session ended, reconnecting");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Station feed connection failed");
            }
        }

        if events.is_closed() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Drive one session. Returns `false` once the listener has gone away.
async fn run_session(
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    events: &mpsc::Sender<StationEvent>,
) -> bool {
    let (_sink, mut stream) = ws_stream.split();

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let Some(event) = parse_event(&text) else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    return false;
                }
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Server closed station feed");
                break;
            }
            Ok(_) => {
                // Ping/Pong are answered by tungstenite; binary is unused.
            }
            Err(e) => {
                tracing::warn!(error = %e, "Station feed receive error");
                break;
            }
        }
    }
    true
}

fn parse_event(text: &str) -> Option<StationEvent> {
    match serde_json::from_str::<StationEvent>(text) {
        Ok(event) => {
            tracing::debug!(kind = event.kind(), "Station event received");
            Some(event)
        }
        Err(e) => {
            tracing::warn!(error = %e, raw = %text, "Unknown or malformed feed message");
            None
        }
    }
}
