//! Repository for the singleton `station_state` row.
//!
//! The row is never written unconditionally. Every write goes through
//! [`StationRepo::compare_and_swap`], which only succeeds while the row still
//! holds the position the writer based its decision on.

use radar_core::rotation::StationPosition;
use radar_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::station::{StationObservation, StationState};

/// Primary key of the only station row.
pub const STATION_ID: i16 = 1;

pub struct StationRepo;

impl StationRepo {
    /// Read the current station state.
    pub async fn get(pool: &PgPool) -> Result<StationState, sqlx::Error> {
        sqlx::query_as::<_, StationState>(
            "SELECT current_track_id, started_at, updated_at FROM station_state WHERE id = $1",
        )
        .bind(STATION_ID)
        .fetch_one(pool)
        .await
    }

    /// Read the station state together with the database clock.
    pub async fn observe(pool: &PgPool) -> Result<StationObservation, sqlx::Error> {
        sqlx::query_as::<_, StationObservation>(
            "SELECT current_track_id, started_at, NOW() AS db_now \
             FROM station_state WHERE id = $1",
        )
        .bind(STATION_ID)
        .fetch_one(pool)
        .await
    }

    /// Move the station to `next_track_id` starting at `started_at`, but only
    /// if it still sits at `expected`.
    ///
    /// Returns `None` when another writer got there first.
    pub async fn compare_and_swap(
        pool: &PgPool,
        expected: &StationPosition,
        next_track_id: Option<DbId>,
        started_at: Timestamp,
    ) -> Result<Option<StationState>, sqlx::Error> {
        sqlx::query_as::<_, StationState>(
            "UPDATE station_state SET \
                current_track_id = $2, \
                started_at = $3, \
                updated_at = NOW() \
             WHERE id = $1 \
               AND current_track_id IS NOT DISTINCT FROM $4 \
               AND started_at = $5 \
             RETURNING current_track_id, started_at, updated_at",
        )
        .bind(STATION_ID)
        .bind(next_track_id)
        .bind(started_at)
        .bind(expected.current_track_id)
        .bind(expected.started_at)
        .fetch_optional(pool)
        .await
    }
}
