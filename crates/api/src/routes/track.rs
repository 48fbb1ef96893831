//! Route definitions for the track catalog.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::track;
use crate::state::AppState;

/// Public rotation listing mounted at `/tracks`.
///
/// ```text
/// GET /   -> list_rotation
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(track::list_rotation))
}

/// Admin catalog routes mounted at `/admin/tracks`.
///
/// ```text
/// GET    /        -> list_all
/// POST   /        -> create
/// PUT    /{id}    -> update
/// DELETE /{id}    -> delete
/// ```
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(track::list_all).post(track::create))
        .route("/{id}", put(track::update).delete(track::delete))
}
