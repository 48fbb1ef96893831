use std::time::Duration;

/// Listener configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Base URL of the station API, without a trailing slash.
    pub api_url: String,
    /// WebSocket change feed URL.
    pub ws_url: String,
    /// Playback volume, `0..=100`.
    pub volume: u8,
    /// How often the full station state is re-fetched.
    pub refetch_interval: Duration,
}

impl ListenerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `RADAR_API_URL`         | `http://localhost:3000/api/v1`   |
    /// | `RADAR_WS_URL`          | `ws://localhost:3000/api/v1/ws`  |
    /// | `LISTENER_VOLUME`       | `80`                             |
    /// | `REFETCH_INTERVAL_SECS` | `30`                             |
    pub fn from_env() -> Self {
        let api_url = std::env::var("RADAR_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api/v1".into())
            .trim_end_matches('/')
            .to_string();

        let ws_url = std::env::var("RADAR_WS_URL")
            .unwrap_or_else(|_| "ws://localhost:3000/api/v1/ws".into());

        let volume = std::env::var("LISTENER_VOLUME")
            .ok()
            .and_then(|v| parse_volume(&v))
            .unwrap_or(DEFAULT_VOLUME);

        let refetch_secs: u64 = std::env::var("REFETCH_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REFETCH_SECS);

        Self {
            api_url,
            ws_url,
            volume,
            refetch_interval: Duration::from_secs(refetch_secs),
        }
    }
}

const DEFAULT_VOLUME: u8 = 80;
const DEFAULT_REFETCH_SECS: u64 = 30;

/// Parse a volume, clamping anything above 100.
fn parse_volume(raw: &str) -> Option<u8> {
    raw.trim().parse::<u32>().ok().map(|v| v.min(100) as u8)
}
