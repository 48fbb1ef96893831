pub mod health;
pub mod station;
pub mod track;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          station change feed (WebSocket)
///
/// /station                     now playing (GET)
/// /station/advance             conditional advance (POST, public)
///
/// /tracks                      active rotation in play order (GET)
///
/// /admin/tracks                list, create (admin only)
/// /admin/tracks/{id}           update, delete
/// /admin/station/current       tune to a track (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/station", station::router())
        .nest("/tracks", track::router())
        .nest("/admin/tracks", track::admin_router())
        .nest("/admin/station", station::admin_router())
}
