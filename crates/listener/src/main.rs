//! `radar-listener` -- headless station listener.
//!
//! Follows the shared station timeline the way a browser listener does and
//! takes part in advancing it. Useful as a keep-alive for the station and as
//! a reference client.
//!
//! # Environment variables
//!
//! | Variable                | Default                          |
//! |-------------------------|----------------------------------|
//! | `RADAR_API_URL`         | `http://localhost:3000/api/v1`   |
//! | `RADAR_WS_URL`          | `ws://localhost:3000/api/v1/ws`  |
//! | `LISTENER_VOLUME`       | `80`                             |
//! | `REFETCH_INTERVAL_SECS` | `30`                             |

use radar_listener::client::StationClient;
use radar_listener::config::ListenerConfig;
use radar_listener::feed;
use radar_listener::listener::Listener;
use radar_listener::playback::HeadlessSurface;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Buffered feed events between the WebSocket task and the listener loop.
const FEED_BUFFER: usize = 64;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "radar_listener=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ListenerConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        volume = config.volume,
        refetch_secs = config.refetch_interval.as_secs(),
        "Starting radar-listener",
    );

    let (feed_tx, feed_rx) = mpsc::channel(FEED_BUFFER);
    let feed_handle = tokio::spawn(feed::run(config.ws_url.clone(), feed_tx));

    let (surface, playback_events) = HeadlessSurface::new();
    let listener = Listener::new(StationClient::new(&config.api_url), surface, config.volume);

    tokio::select! {
        () = listener.run(feed_rx, playback_events, config.refetch_interval) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Received SIGINT (Ctrl-C), stopping listener");
        }
    }

    feed_handle.abort();
}
