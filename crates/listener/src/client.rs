//! HTTP client for the station API.
//!
//! Wraps `GET /station` and `POST /station/advance` using [`reqwest`].

use std::time::Duration;

use chrono::Utc;
use radar_core::retry::RetryPolicy;
use radar_core::station::{AdvanceReply, AdvanceRequest, NowPlaying};
use radar_core::sync::ClockOffset;
use serde::Deserialize;

/// Timeout for a single station API request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the station API client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Station API error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One `GET /station` result plus the clock offset measured on it.
#[derive(Debug, Clone)]
pub struct StationFetch {
    pub now_playing: NowPlaying,
    pub offset: ClockOffset,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

/// HTTP client for one station API.
#[derive(Debug, Clone)]
pub struct StationClient {
    client: reqwest::Client,
    api_url: String,
}

impl StationClient {
    /// * `api_url` - Base URL, e.g. `http://host:3000/api/v1`.
    pub fn new(api_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self::with_client(client, api_url)
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// Fetch the current station state and estimate the server clock offset
    /// from the request round-trip.
    pub async fn fetch_station(&self) -> Result<StationFetch, ClientError> {
        let sent_at = Utc::now();
        let response = self.client.get(self.url("/station")).send().await?;
        let body = Self::read_body(response).await?;
        let received_at = Utc::now();

        let envelope: DataEnvelope<NowPlaying> = serde_json::from_slice(&body)?;
        let offset = ClockOffset::estimate(sent_at, envelope.data.server_time, received_at);

        Ok(StationFetch {
            now_playing: envelope.data,
            offset,
        })
    }

    /// Send one advance request.
    pub async fn advance(&self, force: bool) -> Result<AdvanceReply, ClientError> {
        let response = self
            .client
            .post(self.url("/station/advance"))
            .json(&AdvanceRequest { force })
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send an advance request, retrying failures on `policy`'s schedule.
    ///
    /// Only transport and server errors are retried; any parsed reply,
    /// including "No action needed", ends the loop. Returns the last error
    /// once the schedule is exhausted.
    pub async fn advance_with_retry(
        &self,
        force: bool,
        policy: RetryPolicy,
    ) -> Result<AdvanceReply, ClientError> {
        let mut attempt = 0;
        loop {
            if let Some(delay) = policy.delay_before(attempt) {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            match self.advance(force).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt + 1 < policy.max_attempts() => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Advance attempt failed");
                }
                Err(e) => return Err(e),
            }
            attempt += 1;
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, ClientError> {
        let status = response.status();
        let body = response.bytes().await?;
        if status.is_success() {
            return Ok(body.to_vec());
        }
        Err(api_error(status.as_u16(), &body))
    }
}

fn api_error(status: u16, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(err) => ClientError::Api {
            status,
            code: err.code,
            message: err.error,
        },
        Err(_) => ClientError::Api {
            status,
            code: "UNKNOWN".into(),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    static FAST_RETRY: [Duration; 3] = [
        Duration::ZERO,
        Duration::from_millis(10),
        Duration::from_millis(20),
    ];

    /// Serve `POST /station/advance`, answering 500 to the first `failures`
    /// requests and "Track switched" afterwards. Returns the base URL and the
    /// request counter.
    async fn advance_stub(failures: usize) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut socket).await;
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = if n < failures {
                    ("500 Internal Server Error", r#"{"error":"boom","code":"INTERNAL_ERROR"}"#)
                } else {
                    ("200 OK", r#"{"message":"Track switched","new_track_id":2}"#)
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/api/v1"), hits)
    }

    /// Read one request's headers and body.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let Ok(n) = socket.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    #[tokio::test]
    async fn advance_retry_stops_at_first_reply() {
        let (url, hits) = advance_stub(0).await;
        let client = StationClient::new(url);

        let reply = client
            .advance_with_retry(true, RetryPolicy::new(&FAST_RETRY))
            .await
            .unwrap();

        assert_eq!(reply.new_track_id, Some(2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn advance_retry_recovers_on_third_attempt() {
        let (url, hits) = advance_stub(2).await;
        let client = StationClient::new(url);

        let reply = client
            .advance_with_retry(true, RetryPolicy::new(&FAST_RETRY))
            .await
            .unwrap();

        assert_eq!(reply.message, "Track switched");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn advance_retry_gives_up_after_schedule() {
        let (url, hits) = advance_stub(usize::MAX).await;
        let client = StationClient::new(url);

        let err = client
            .advance_with_retry(true, RetryPolicy::new(&FAST_RETRY))
            .await
            .unwrap_err();

        assert_matches!(err, ClientError::Api { status: 500, .. });
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = StationClient::new("http://localhost:3000/api/v1/");
        assert_eq!(
            client.url("/station"),
            "http://localhost:3000/api/v1/station"
        );
    }

    #[test]
    fn api_error_reads_error_envelope() {
        let err = api_error(409, br#"{"error":"Track 3 is on air","code":"CONFLICT"}"#);
        assert_matches!(
            err,
            ClientError::Api { status: 409, ref code, ref message }
                if code == "CONFLICT" && message == "Track 3 is on air"
        );
    }

    #[test]
    fn api_error_keeps_raw_body_when_not_json() {
        let err = api_error(502, b"Bad Gateway");
        assert_matches!(
            err,
            ClientError::Api { status: 502, ref code, ref message }
                if code == "UNKNOWN" && message == "Bad Gateway"
        );
    }
}
