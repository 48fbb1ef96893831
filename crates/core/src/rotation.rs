//! Rotation order and the advance decision.
//!
//! [`plan_advance`] is the pure half of the advance coordinator: given the
//! persisted station position, the active rotation, and the authoritative
//! clock, it decides whether the station moves and where to. The repository
//! layer turns a [`AdvancePlan::Switch`] into a conditional commit.

use serde::{Deserialize, Serialize};

use crate::sync::has_ended;
use crate::types::{DbId, Timestamp};

/// Who asked for the advance. Carried into logs and published events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceTrigger {
    /// A listener's local end-of-track detection (`force: true`).
    Listener,
    /// A plain advance request.
    Request,
    /// The server-side station ticker.
    Scheduler,
    /// An admin explicitly tuning the station.
    Admin,
}

impl AdvanceTrigger {
    /// Map the `force` flag of an HTTP advance request.
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::Listener
        } else {
            Self::Request
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listener => "listener",
            Self::Request => "request",
            Self::Scheduler => "scheduler",
            Self::Admin => "admin",
        }
    }
}

/// One track of the active rotation, in rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationEntry {
    pub id: DbId,
    pub duration_seconds: i32,
}

/// The persisted station position an advance decision is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationPosition {
    pub current_track_id: Option<DbId>,
    pub started_at: Timestamp,
}

/// Why the station switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchReason {
    /// Nothing was playing.
    Idle,
    /// The current track left the rotation (deactivated or removed).
    Retired,
    /// The current track played to its end.
    Ended,
}

/// Outcome of [`plan_advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvancePlan {
    Switch {
        next_track_id: DbId,
        reason: SwitchReason,
    },
    StillPlaying {
        remaining_seconds: i64,
    },
    /// The rotation is empty but a track is still marked current.
    GoIdle,
    /// The rotation is empty and the station is already idle.
    NoActiveTracks,
}

/// Decide what an advance request should do.
pub fn plan_advance(
    position: &StationPosition,
    rotation: &[RotationEntry],
    now: Timestamp,
) -> AdvancePlan {
    let Some(first) = rotation.first() else {
        return match position.current_track_id {
            Some(_) => AdvancePlan::GoIdle,
            None => AdvancePlan::NoActiveTracks,
        };
    };

    let Some(current_id) = position.current_track_id else {
        return AdvancePlan::Switch {
            next_track_id: first.id,
            reason: SwitchReason::Idle,
        };
    };

    let Some(index) = rotation.iter().position(|t| t.id == current_id) else {
        return AdvancePlan::Switch {
            next_track_id: first.id,
            reason: SwitchReason::Retired,
        };
    };

    let current = rotation[index];
    if has_ended(current.duration_seconds, position.started_at, now) {
        return AdvancePlan::Switch {
            next_track_id: rotation[(index + 1) % rotation.len()].id,
            reason: SwitchReason::Ended,
        };
    }

    let remaining_ms = i64::from(current.duration_seconds) * 1000
        - (now - position.started_at).num_milliseconds();
    AdvancePlan::StillPlaying {
        remaining_seconds: (remaining_ms + 999) / 1000,
    }
}

/// The track after `current` in rotation order, wrapping around. Falls back
/// to the first track when `current` is absent or not in the rotation.
pub fn next_in_rotation(rotation: &[RotationEntry], current: Option<DbId>) -> Option<DbId> {
    let first = rotation.first()?;
    let next = current
        .and_then(|id| rotation.iter().position(|t| t.id == id))
        .map(|index| rotation[(index + 1) % rotation.len()].id);
    Some(next.unwrap_or(first.id))
}
