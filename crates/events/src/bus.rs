//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`StationEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use radar_core::rotation::AdvanceTrigger;
use radar_core::station::{NowPlaying, TrackInfo};
use radar_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// StationEvent
// ---------------------------------------------------------------------------

/// What happened to a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogChange {
    Created,
    Updated,
    Deleted,
}

/// A change on the station, as seen by listeners.
///
/// Serialized with an internal `type` tag so the same JSON travels over the
/// WebSocket feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StationEvent {
    /// The station committed a new position. `track` is `None` when the
    /// station went idle.
    TrackChanged {
        track: Option<TrackInfo>,
        started_at: Timestamp,
        trigger: AdvanceTrigger,
    },
    /// A track was added, edited, or removed.
    CatalogChanged {
        track_id: DbId,
        change: CatalogChange,
    },
    /// Full state, sent once to every new WebSocket connection.
    StationSnapshot(NowPlaying),
}

impl StationEvent {
    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TrackChanged { .. } => "track_changed",
            Self::CatalogChanged { .. } => "catalog_changed",
            Self::StationSnapshot(_) => "station_snapshot",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`StationEvent`].
///
/// # Usage
///
/// ```rust
/// use radar_events::bus::{CatalogChange, EventBus, StationEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(StationEvent::CatalogChanged { track_id: 1, change: CatalogChange::Created });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<StationEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: StationEvent) {
        let kind = event.kind();
        // A SendError only means there are zero receivers.
        if self.sender.send(event).is_err() {
            tracing::trace!(kind, "Station event published with no subscribers");
        }
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<StationEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
