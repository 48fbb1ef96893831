//! What the station is playing, as served to listeners.

use serde::{Deserialize, Serialize};

use crate::sync::{SyncSnapshot, TrackTiming};
use crate::types::{DbId, Timestamp};

/// The listener-facing subset of a catalog track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: DbId,
    pub artist_name: String,
    pub track_title: String,
    pub audio_source_url: String,
    pub cover_image_url: Option<String>,
    pub duration_seconds: i32,
}

impl TrackInfo {
    pub fn timing(&self) -> TrackTiming {
        TrackTiming {
            track_id: self.id,
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Response of `GET /station`: the joined current track, its start on the
/// shared timeline, and the server clock at response time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// `None` when the station is idle.
    pub track: Option<TrackInfo>,
    /// `None` when the station is idle.
    pub started_at: Option<Timestamp>,
    pub server_time: Timestamp,
    /// The track the rotation moves to next, if any.
    pub next_track_id: Option<DbId>,
    /// Snapshot computed at `server_time`.
    pub snapshot: SyncSnapshot,
}

impl NowPlaying {
    pub fn idle(server_time: Timestamp) -> Self {
        Self {
            track: None,
            started_at: None,
            server_time,
            next_track_id: None,
            snapshot: SyncSnapshot::idle(),
        }
    }

    /// When this state came into effect: the activation start, or the read
    /// time for an idle station. Orders states that arrive out of sequence.
    pub fn as_of(&self) -> Timestamp {
        self.started_at.unwrap_or(self.server_time)
    }
}

// ---------------------------------------------------------------------------
// Advance wire format
// ---------------------------------------------------------------------------

pub const MSG_TRACK_SWITCHED: &str = "Track switched";
pub const MSG_NO_ACTION_NEEDED: &str = "No action needed";
pub const MSG_TRACK_STILL_PLAYING: &str = "Track still playing";
pub const MSG_NO_ACTIVE_TRACKS: &str = "No active tracks available";

/// Body of `POST /station/advance`. An empty body means `force: false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default)]
    pub force: bool,
}

/// Successful reply of `POST /station/advance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceReply {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_track_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
}

impl AdvanceReply {
    pub fn switched(new_track_id: DbId) -> Self {
        Self {
            message: MSG_TRACK_SWITCHED.to_string(),
            new_track_id: Some(new_track_id),
            remaining_seconds: None,
        }
    }

    pub fn still_playing(remaining_seconds: i64) -> Self {
        Self {
            message: MSG_TRACK_STILL_PLAYING.to_string(),
            new_track_id: None,
            remaining_seconds: Some(remaining_seconds),
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            message: message.to_string(),
            new_track_id: None,
            remaining_seconds: None,
        }
    }
}
