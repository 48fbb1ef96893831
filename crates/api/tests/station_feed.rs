//! Tests for the event bus → WebSocket relay.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use chrono::Utc;
use common::{build_app_with_state, seed_track, set_station, test_state};
use futures::StreamExt;
use radar_api::engine::advance;
use radar_api::notifications::StationFeed;
use radar_api::ws::WsManager;
use radar_core::rotation::AdvanceTrigger;
use radar_events::{CatalogChange, EventBus, StationEvent};
use sqlx::PgPool;
use tokio_tungstenite::tungstenite;

async fn next_text(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("feed should relay within 2s")
        .expect("channel open");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: published events reach every subscriber as tagged JSON
// ---------------------------------------------------------------------------

#[tokio::test]
async fn feed_relays_track_changed_to_all_connections() {
    let bus = EventBus::default();
    let manager = Arc::new(WsManager::new());
    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;

    let handle = tokio::spawn(StationFeed::new(Arc::clone(&manager)).run(bus.subscribe()));

    bus.publish(StationEvent::TrackChanged {
        track: None,
        started_at: Utc::now(),
        trigger: AdvanceTrigger::Scheduler,
    });

    for rx in [&mut rx1, &mut rx2] {
        let json = next_text(rx).await;
        assert_eq!(json["type"], "track_changed");
        assert!(json["track"].is_null());
        assert_eq!(json["trigger"], "scheduler");
    }

    drop(bus);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("feed should stop when the bus closes")
        .unwrap();
}

// ---------------------------------------------------------------------------
// Test: catalog changes are relayed too
// ---------------------------------------------------------------------------

#[tokio::test]
async fn feed_relays_catalog_changes() {
    let bus = EventBus::default();
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("conn-1".to_string()).await;

    tokio::spawn(StationFeed::new(Arc::clone(&manager)).run(bus.subscribe()));

    bus.publish(StationEvent::CatalogChanged {
        track_id: 12,
        change: CatalogChange::Updated,
    });

    let json = next_text(&mut rx).await;
    assert_eq!(json["type"], "catalog_changed");
    assert_eq!(json["track_id"], 12);
    assert_eq!(json["change"], "updated");
}

// ---------------------------------------------------------------------------
// Test: a new subscriber gets the snapshot first, then relayed changes
// ---------------------------------------------------------------------------

async fn next_frame<S>(ws: &mut S) -> serde_json::Value
where
    S: futures::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame within 2s")
            .expect("socket open")
            .unwrap();
        if let tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn subscriber_gets_snapshot_before_relayed_changes(pool: PgPool) {
    let a = seed_track(&pool, "Alpha", 180).await;
    let b = seed_track(&pool, "Bravo", 180).await;
    set_station(&pool, Some(a), 200).await;

    let state = test_state(pool);
    tokio::spawn(StationFeed::new(Arc::clone(&state.ws_manager)).run(state.event_bus.subscribe()));
    let app = build_app_with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/v1/ws"))
        .await
        .unwrap();

    let first = next_frame(&mut ws).await;
    assert_eq!(first["type"], "station_snapshot");
    assert_eq!(first["track"]["id"], a);

    advance(&state.pool, &state.event_bus, AdvanceTrigger::Scheduler)
        .await
        .unwrap();

    let second = next_frame(&mut ws).await;
    assert_eq!(second["type"], "track_changed");
    assert_eq!(second["track"]["id"], b);
}
