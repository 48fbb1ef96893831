//! Singleton station state model.

use radar_core::rotation::StationPosition;
use radar_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// The `station_state` row (always `id = 1`).
#[derive(Debug, Clone, Copy, FromRow, Serialize, PartialEq, Eq)]
pub struct StationState {
    pub current_track_id: Option<DbId>,
    pub started_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StationState {
    pub fn position(&self) -> StationPosition {
        StationPosition {
            current_track_id: self.current_track_id,
            started_at: self.started_at,
        }
    }
}

/// Station state read together with the database clock.
///
/// `db_now` is the single clock every advance decision and every new
/// `started_at` is taken from.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct StationObservation {
    pub current_track_id: Option<DbId>,
    pub started_at: Timestamp,
    pub db_now: Timestamp,
}

impl StationObservation {
    pub fn position(&self) -> StationPosition {
        StationPosition {
            current_track_id: self.current_track_id,
            started_at: self.started_at,
        }
    }
}
