//! Handlers for the station surface: now-playing, advance, and admin tune.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use radar_core::rotation::AdvanceTrigger;
use radar_core::station::{AdvanceReply, AdvanceRequest};
use radar_core::types::DbId;
use serde::Deserialize;

use crate::engine;
use crate::error::{AppError, AppResult};
use crate::middleware::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /admin/station/current`.
#[derive(Debug, Deserialize)]
pub struct TuneRequest {
    pub track_id: DbId,
}

/// GET /api/v1/station
///
/// The current track, its `started_at`, the database clock, the next track
/// in rotation, and the sync snapshot. Idle stations report `track: null`.
pub async fn get_station(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let now_playing = engine::now_playing(&state.pool).await?;
    Ok(Json(DataResponse { data: now_playing }))
}

/// POST /api/v1/station/advance
///
/// Body is optional; an empty body is `{"force": false}`. Safe to call any
/// number of times concurrently: at most one call per track boundary
/// switches the station.
pub async fn advance(State(state): State<AppState>, body: Bytes) -> AppResult<Json<AdvanceReply>> {
    let request = parse_advance_request(&body)?;
    let trigger = AdvanceTrigger::from_force(request.force);

    let outcome = engine::advance(&state.pool, &state.event_bus, trigger).await?;
    Ok(Json(outcome.into()))
}

/// PUT /api/v1/admin/station/current
///
/// Put an active track on air immediately.
pub async fn tune(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<TuneRequest>,
) -> AppResult<impl IntoResponse> {
    engine::tune(&state.pool, &state.event_bus, input.track_id).await?;

    tracing::info!(track_id = input.track_id, "Station tuned by admin");

    let now_playing = engine::now_playing(&state.pool).await?;
    Ok(Json(DataResponse { data: now_playing }))
}

fn parse_advance_request(body: &[u8]) -> AppResult<AdvanceRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AdvanceRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid advance request body: {e}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_body_defaults_to_unforced() {
        let req = parse_advance_request(b"").unwrap();
        assert!(!req.force);
        let req = parse_advance_request(b"  \n").unwrap();
        assert!(!req.force);
    }

    #[test]
    fn force_flag_is_read() {
        assert!(parse_advance_request(br#"{"force": true}"#).unwrap().force);
        assert!(!parse_advance_request(b"{}").unwrap().force);
    }

    #[test]
    fn malformed_body_is_bad_request() {
        assert_matches!(
            parse_advance_request(b"{force"),
            Err(AppError::BadRequest(_))
        );
    }
}
