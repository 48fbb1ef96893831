//! Playback surface: the only control points into the audio transport.
//!
//! The listener loop drives a [`PlaybackSurface`] with load/play/pause/seek
//! and volume commands. The surface reports back through a channel of
//! [`PlaybackEvent`]s, chiefly end-of-media, which the loop routes through
//! the same end-of-track latch as its own clock.

use std::time::Duration;

use radar_core::station::TrackInfo;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Something the transport reports back to the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The loaded media played to its end.
    Finished,
    /// The transport could not load or play the media.
    Failed(String),
}

pub type PlaybackEvents = mpsc::UnboundedReceiver<PlaybackEvent>;

/// Audio transport controlled by the listener.
pub trait PlaybackSurface: Send {
    /// Load `track`, replacing whatever was loaded. Does not start playback.
    fn load(&mut self, track: &TrackInfo);
    /// Unload everything; the station went idle.
    fn stop(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    /// `0..=100`.
    fn set_volume(&mut self, volume: u8);
    fn seek_to(&mut self, position_ms: i64);
}

/// A transport with no audio output.
///
/// Tracks the play position in real time and reports
/// [`PlaybackEvent::Finished`] when it reaches the loaded duration, the way
/// an embedded player's end-of-media event would.
pub struct HeadlessSurface {
    events: mpsc::UnboundedSender<PlaybackEvent>,
    track_id: Option<i64>,
    duration_ms: i64,
    position_ms: i64,
    playing_since: Option<Instant>,
    volume: u8,
    end_timer: Option<JoinHandle<()>>,
}

impl HeadlessSurface {
    /// Create a surface and the receiver for its events.
    pub fn new() -> (Self, PlaybackEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let surface = Self {
            events: tx,
            track_id: None,
            duration_ms: 0,
            position_ms: 0,
            playing_since: None,
            volume: 100,
            end_timer: None,
        };
        (surface, rx)
    }

    /// Current play position.
    pub fn position_ms(&self) -> i64 {
        let running = self
            .playing_since
            .map(|since| since.elapsed().as_millis() as i64)
            .unwrap_or(0);
        (self.position_ms + running).min(self.duration_ms)
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    fn cancel_end_timer(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }

    fn arm_end_timer(&mut self) {
        self.cancel_end_timer();
        let remaining = (self.duration_ms - self.position_ms).max(0) as u64;
        let events = self.events.clone();
        self.end_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(remaining)).await;
            let _ = events.send(PlaybackEvent::Finished);
        }));
    }
}

impl PlaybackSurface for HeadlessSurface {
    fn load(&mut self, track: &TrackInfo) {
        self.cancel_end_timer();
        self.playing_since = None;
        self.position_ms = 0;

        if track.audio_source_url.trim().is_empty() || track.duration_seconds <= 0 {
            self.track_id = None;
            self.duration_ms = 0;
            let _ = self.events.send(PlaybackEvent::Failed(format!(
                "Track {} has no playable source",
                track.id
            )));
            return;
        }

        self.track_id = Some(track.id);
        self.duration_ms = i64::from(track.duration_seconds) * 1000;
        tracing::debug!(track_id = track.id, url = %track.audio_source_url, "Media loaded");
    }

    fn stop(&mut self) {
        self.cancel_end_timer();
        self.track_id = None;
        self.duration_ms = 0;
        self.position_ms = 0;
        self.playing_since = None;
    }

    fn play(&mut self) {
        if self.track_id.is_none() || self.is_playing() {
            return;
        }
        self.playing_since = Some(Instant::now());
        self.arm_end_timer();
    }

    fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.position_ms = self.position_ms();
        self.playing_since = None;
        self.cancel_end_timer();
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    fn seek_to(&mut self, position_ms: i64) {
        self.position_ms = position_ms.clamp(0, self.duration_ms);
        if self.is_playing() {
            self.playing_since = Some(Instant::now());
            self.arm_end_timer();
        }
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        self.cancel_end_timer();
    }
}
