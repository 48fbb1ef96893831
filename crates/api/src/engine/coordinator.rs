//! Advance coordinator.
//!
//! Many listeners detect the end of a track at roughly the same moment and
//! all ask the server to advance. Each request re-reads the persisted state,
//! decides against the database clock, and commits with a compare-and-swap
//! on the position it read. Of N racing requests at one boundary exactly one
//! swap succeeds; the rest observe "no action needed".

use radar_core::error::CoreError;
use radar_core::rotation::{plan_advance, AdvancePlan, AdvanceTrigger, RotationEntry};
use radar_core::station::{
    AdvanceReply, MSG_NO_ACTION_NEEDED, MSG_NO_ACTIVE_TRACKS,
};
use radar_core::types::DbId;
use radar_db::models::station::StationState;
use radar_db::models::track::Track;
use radar_db::repositories::{StationRepo, TrackRepo};
use radar_db::DbPool;
use radar_events::{EventBus, StationEvent};

use crate::error::{AppError, AppResult};

/// Attempts an admin tune makes against concurrent advances.
const TUNE_ATTEMPTS: usize = 3;

/// Result of one advance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// This request moved the station to `new_track_id`.
    Switched { new_track_id: DbId },
    /// This request moved the station to idle (the rotation is empty).
    WentIdle,
    /// Another request advanced the station first.
    NoActionNeeded,
    /// The current track has not ended.
    StillPlaying { remaining_seconds: i64 },
    /// Nothing to play and nothing playing.
    NoActiveTracks,
}

impl From<AdvanceOutcome> for AdvanceReply {
    fn from(outcome: AdvanceOutcome) -> Self {
        match outcome {
            AdvanceOutcome::Switched { new_track_id } => AdvanceReply::switched(new_track_id),
            AdvanceOutcome::StillPlaying { remaining_seconds } => {
                AdvanceReply::still_playing(remaining_seconds)
            }
            AdvanceOutcome::NoActionNeeded => AdvanceReply::message(MSG_NO_ACTION_NEEDED),
            AdvanceOutcome::WentIdle | AdvanceOutcome::NoActiveTracks => {
                AdvanceReply::message(MSG_NO_ACTIVE_TRACKS)
            }
        }
    }
}

/// Advance the station if, and only if, the persisted state says the current
/// track is over (or gone).
pub async fn advance(
    pool: &DbPool,
    event_bus: &EventBus,
    trigger: AdvanceTrigger,
) -> Result<AdvanceOutcome, sqlx::Error> {
    let observed = StationRepo::observe(pool).await?;
    let rotation = TrackRepo::list_rotation(pool).await?;
    let entries: Vec<RotationEntry> = rotation.iter().map(Track::rotation_entry).collect();

    let position = observed.position();
    let next_track_id = match plan_advance(&position, &entries, observed.db_now) {
        AdvancePlan::StillPlaying { remaining_seconds } => {
            tracing::debug!(
                trigger = trigger.as_str(),
                current_track_id = ?position.current_track_id,
                remaining_seconds,
                "Advance refused: track still playing"
            );
            return Ok(AdvanceOutcome::StillPlaying { remaining_seconds });
        }
        AdvancePlan::NoActiveTracks => return Ok(AdvanceOutcome::NoActiveTracks),
        AdvancePlan::GoIdle => None,
        AdvancePlan::Switch {
            next_track_id,
            reason,
        } => {
            tracing::debug!(
                trigger = trigger.as_str(),
                ?reason,
                next_track_id,
                "Advance planned"
            );
            Some(next_track_id)
        }
    };

    let Some(state) =
        StationRepo::compare_and_swap(pool, &position, next_track_id, observed.db_now).await?
    else {
        tracing::debug!(
            trigger = trigger.as_str(),
            "Advance lost the race to a concurrent writer"
        );
        return Ok(AdvanceOutcome::NoActionNeeded);
    };

    let track = next_track_id
        .and_then(|id| rotation.iter().find(|t| t.id == id))
        .map(Track::info);
    publish_change(event_bus, &state, track, trigger);

    Ok(match next_track_id {
        Some(new_track_id) => AdvanceOutcome::Switched { new_track_id },
        None => AdvanceOutcome::WentIdle,
    })
}

/// Put a specific active track on air, starting now.
pub async fn tune(pool: &DbPool, event_bus: &EventBus, track_id: DbId) -> AppResult<StationState> {
    let track = TrackRepo::find_by_id(pool, track_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Track",
            id: track_id,
        }))?;

    if !track.is_active() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Track {track_id} is inactive and cannot be put on air"
        ))));
    }

    for _ in 0..TUNE_ATTEMPTS {
        let observed = StationRepo::observe(pool).await?;
        if let Some(state) =
            StationRepo::compare_and_swap(pool, &observed.position(), Some(track.id), observed.db_now)
                .await?
        {
            publish_change(event_bus, &state, Some(track.info()), AdvanceTrigger::Admin);
            return Ok(state);
        }
    }

    Err(AppError::Core(CoreError::Conflict(
        "Station changed concurrently, try again".into(),
    )))
}

fn publish_change(
    event_bus: &EventBus,
    state: &StationState,
    track: Option<radar_core::station::TrackInfo>,
    trigger: AdvanceTrigger,
) {
    tracing::info!(
        trigger = trigger.as_str(),
        current_track_id = ?state.current_track_id,
        started_at = %state.started_at,
        "Station advanced"
    );
    event_bus.publish(StationEvent::TrackChanged {
        track,
        started_at: state.started_at,
        trigger,
    });
}
