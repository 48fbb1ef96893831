//! Route definitions for the station.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::station;
use crate::state::AppState;

/// Public station routes mounted at `/station`.
///
/// ```text
/// GET  /          -> get_station
/// POST /advance   -> advance
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(station::get_station))
        .route("/advance", post(station::advance))
}

/// Admin station routes mounted at `/admin/station`.
///
/// ```text
/// PUT /current    -> tune
/// ```
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/current", put(station::tune))
}
