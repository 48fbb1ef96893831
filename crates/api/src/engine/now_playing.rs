//! Joined station read model.

use radar_core::rotation::{next_in_rotation, RotationEntry};
use radar_core::station::NowPlaying;
use radar_core::sync::SyncSnapshot;
use radar_db::models::track::Track;
use radar_db::repositories::{StationRepo, TrackRepo};
use radar_db::DbPool;

/// The current track (full record), its `started_at`, and the database
/// clock, with the snapshot as of that clock.
///
/// A current track that was deactivated keeps being reported until the
/// next advance moves past it.
pub async fn now_playing(pool: &DbPool) -> Result<NowPlaying, sqlx::Error> {
    let observed = StationRepo::observe(pool).await?;

    let track = match observed.current_track_id {
        Some(id) => TrackRepo::find_by_id(pool, id).await?,
        None => None,
    };
    let Some(track) = track else {
        return Ok(NowPlaying::idle(observed.db_now));
    };

    let rotation: Vec<RotationEntry> = TrackRepo::list_rotation(pool)
        .await?
        .iter()
        .map(Track::rotation_entry)
        .collect();

    Ok(NowPlaying {
        snapshot: SyncSnapshot::compute(track.duration_seconds, observed.started_at, observed.db_now),
        next_track_id: next_in_rotation(&rotation, Some(track.id)),
        started_at: Some(observed.started_at),
        server_time: observed.db_now,
        track: Some(track.info()),
    })
}
