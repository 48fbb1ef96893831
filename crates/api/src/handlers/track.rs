//! Handlers for the track catalog.
//!
//! The public listing is the active rotation in play order. Everything else
//! is admin-only and publishes a `catalog_changed` event on success.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use radar_core::error::CoreError;
use radar_core::types::DbId;
use radar_db::models::track::{CreateTrack, UpdateTrack};
use radar_db::repositories::{StationRepo, TrackRepo};
use radar_events::{CatalogChange, StationEvent};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Track", id })
}

fn publish(state: &AppState, track_id: DbId, change: CatalogChange) {
    state
        .event_bus
        .publish(StationEvent::CatalogChanged { track_id, change });
}

/// GET /api/v1/tracks
pub async fn list_rotation(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let tracks = TrackRepo::list_rotation(&state.pool).await?;
    Ok(Json(DataResponse { data: tracks }))
}

/// GET /api/v1/admin/tracks
pub async fn list_all(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tracks = TrackRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: tracks }))
}

/// POST /api/v1/admin/tracks
///
/// Appends the track to the end of the rotation when it is active.
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTrack>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(CoreError::from)?;

    let track = TrackRepo::create(&state.pool, &input).await?;

    tracing::info!(
        track_id = track.id,
        artist = %track.artist_name,
        title = %track.track_title,
        "Track created",
    );
    publish(&state, track.id, CatalogChange::Created);

    Ok((StatusCode::CREATED, Json(DataResponse { data: track })))
}

/// PUT /api/v1/admin/tracks/{id}
///
/// Partial update. Deactivating the current track does not interrupt it;
/// the next advance moves past it.
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTrack>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(CoreError::from)?;

    let track = TrackRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(track_id = id, status = %track.status, "Track updated");
    publish(&state, id, CatalogChange::Updated);

    Ok(Json(DataResponse { data: track }))
}

/// DELETE /api/v1/admin/tracks/{id}
///
/// Refused with 409 while the track is on air.
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let station = StationRepo::get(&state.pool).await?;
    if station.current_track_id == Some(id) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Track {id} is currently on air; deactivate it and wait for the next advance"
        ))));
    }

    // The foreign key still guards the window between the check and the delete.
    if !TrackRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }

    tracing::info!(track_id = id, "Track deleted");
    publish(&state, id, CatalogChange::Deleted);

    Ok(StatusCode::NO_CONTENT)
}
