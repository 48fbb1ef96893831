//! Repository for the `tracks` table.

use radar_core::track::STATUS_ACTIVE;
use radar_core::types::DbId;
use sqlx::PgPool;

use crate::models::track::{CreateTrack, Track, UpdateTrack};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, artist_name, track_title, audio_source_url, cover_image_url, \
                       source_type, duration_seconds, status, created_at, updated_at";

/// Provides catalog operations for tracks.
pub struct TrackRepo;

impl TrackRepo {
    /// Append a new track, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTrack) -> Result<Track, sqlx::Error> {
        let query = format!(
            "INSERT INTO tracks \
                (artist_name, track_title, audio_source_url, cover_image_url, \
                 source_type, duration_seconds, status) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 'soundcloud'), $6, COALESCE($7, 'active')) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(&input.artist_name)
            .bind(&input.track_title)
            .bind(&input.audio_source_url)
            .bind(&input.cover_image_url)
            .bind(&input.source_type)
            .bind(input.duration_seconds)
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    /// Find a track by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Track>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tracks WHERE id = $1");
        sqlx::query_as::<_, Track>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The active rotation: active tracks by creation order, id as tiebreak.
    ///
    /// Every caller computing "what comes next" must see the same order.
    pub async fn list_rotation(pool: &PgPool) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracks WHERE status = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(STATUS_ACTIVE)
            .fetch_all(pool)
            .await
    }

    /// Every track regardless of status, newest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tracks ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Track>(&query).fetch_all(pool).await
    }

    /// Update a track. Only non-`None` fields are applied; a
    /// `cover_image_url` of `Some(None)` clears the image.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTrack,
    ) -> Result<Option<Track>, sqlx::Error> {
        let cover_provided = input.cover_image_url.is_some();
        let cover_value = input.cover_image_url.as_ref().and_then(|v| v.as_deref());

        let query = format!(
            "UPDATE tracks SET \
                artist_name = COALESCE($2, artist_name), \
                track_title = COALESCE($3, track_title), \
                audio_source_url = COALESCE($4, audio_source_url), \
                cover_image_url = CASE WHEN $5 THEN $6 ELSE cover_image_url END, \
                source_type = COALESCE($7, source_type), \
                duration_seconds = COALESCE($8, duration_seconds), \
                status = COALESCE($9, status), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(id)
            .bind(&input.artist_name)
            .bind(&input.track_title)
            .bind(&input.audio_source_url)
            .bind(cover_provided)
            .bind(cover_value)
            .bind(&input.source_type)
            .bind(input.duration_seconds)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Delete a track. Fails with a foreign key violation while the track is
    /// the station's current track.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tracks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
