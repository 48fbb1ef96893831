use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use radar_events::StationEvent;

use crate::engine::now_playing;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to the station change feed.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single feed connection after upgrade.
///
/// The subscriber first receives a `station_snapshot` so it can start
/// playback without a separate fetch, then every event the feed relays.
/// The connection is registered before the snapshot is read, and relayed
/// events queue behind the snapshot, so nothing committed in between is
/// lost or delivered ahead of it. Inbound frames other than Close are
/// ignored.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "Feed subscriber connected");

    let mut rx = state.ws_manager.add(conn_id.clone()).await;
    let (mut sink, mut stream) = socket.split();

    match now_playing(&state.pool).await {
        Ok(snapshot) => match serde_json::to_string(&StationEvent::StationSnapshot(snapshot)) {
            Ok(text) => {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    tracing::debug!(conn_id = %conn_id, "WebSocket closed before snapshot");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize station snapshot"),
        },
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, error = %e, "Failed to load station snapshot");
        }
    }

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Feed subscriber disconnected");
}
