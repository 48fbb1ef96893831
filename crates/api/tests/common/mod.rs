#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use radar_api::config::ServerConfig;
use radar_api::routes;
use radar_api::state::AppState;
use radar_api::ws::WsManager;
use radar_core::admin_token::hash_token;
use radar_events::EventBus;

/// Admin token accepted by apps built with [`build_test_app`].
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Build a test `ServerConfig` with safe defaults.
///
/// The station ticker is disabled so tests control every advance.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        admin_token_hash: Some(hash_token(ADMIN_TOKEN)),
        station_tick_secs: 0,
    }
}

/// Build the application state used by [`build_test_app`].
pub fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        ws_manager: Arc::new(WsManager::new()),
        event_bus: Arc::new(EventBus::default()),
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_with_state(test_state(pool))
}

/// Same as [`build_test_app`] but with a caller-supplied state, so tests can
/// subscribe to the event bus before sending requests.
pub fn build_app_with_state(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), None).await
}

/// POST with no body at all.
pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None, None).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body), None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None, None).await
}

pub async fn admin_get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, Some(ADMIN_TOKEN)).await
}

pub async fn admin_post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), Some(ADMIN_TOKEN)).await
}

pub async fn admin_put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body), Some(ADMIN_TOKEN)).await
}

pub async fn admin_delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None, Some(ADMIN_TOKEN)).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert an active track and return its id.
pub async fn seed_track(pool: &PgPool, title: &str, duration_seconds: i32) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO tracks (artist_name, track_title, audio_source_url, duration_seconds) \
         VALUES ('Test Artist', $1, $2, $3) RETURNING id",
    )
    .bind(title)
    .bind(format!("https://soundcloud.com/test/{}", title.to_lowercase()))
    .bind(duration_seconds)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Put `track_id` on air as if it started `seconds_ago` seconds before the
/// database clock.
pub async fn set_station(pool: &PgPool, track_id: Option<i64>, seconds_ago: i64) {
    sqlx::query(
        "UPDATE station_state SET current_track_id = $1, \
            started_at = NOW() - make_interval(secs => $2::double precision) \
         WHERE id = 1",
    )
    .bind(track_id)
    .bind(seconds_ago as f64)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn set_track_status(pool: &PgPool, track_id: i64, status: &str) {
    sqlx::query("UPDATE tracks SET status = $2 WHERE id = $1")
        .bind(track_id)
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
}

/// Current `(current_track_id, started_at)` straight from the table.
pub async fn station_row(pool: &PgPool) -> (Option<i64>, chrono::DateTime<chrono::Utc>) {
    sqlx::query_as("SELECT current_track_id, started_at FROM station_state WHERE id = 1")
        .fetch_one(pool)
        .await
        .unwrap()
}
