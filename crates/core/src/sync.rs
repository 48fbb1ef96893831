//! Listener-side clock synchronisation against the shared station timeline.
//!
//! Everything a listener shows (elapsed, remaining, progress) and the offset
//! a freshly attached player seeks to is derived from `(track, started_at,
//! now)` alone. Nothing accumulates between ticks, so a suspended listener
//! lands back on the correct position on its next tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Cadence of the listener tick loop while playing.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Playback position of the current track as seen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Whole seconds played, clamped to the track duration.
    pub elapsed_seconds: i64,
    /// `duration_seconds - elapsed_seconds`.
    pub remaining_seconds: i64,
    /// Fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Offset a newly attached player must seek to.
    pub initial_seek_ms: i64,
}

impl SyncSnapshot {
    /// The "nothing is playing" snapshot.
    pub fn idle() -> Self {
        Self {
            elapsed_seconds: 0,
            remaining_seconds: 0,
            progress: 0.0,
            initial_seek_ms: 0,
        }
    }

    /// Compute the snapshot for a track of `duration_seconds` that started at
    /// `started_at`, observed at `now`.
    ///
    /// A started_at in the future (clock skew) reads as position zero. A
    /// track with a non-positive duration reads as already finished.
    pub fn compute(duration_seconds: i32, started_at: Timestamp, now: Timestamp) -> Self {
        let duration_secs = i64::from(duration_seconds);
        if duration_secs <= 0 {
            return Self {
                progress: 1.0,
                ..Self::idle()
            };
        }

        let elapsed_ms = (now - started_at).num_milliseconds();
        let duration_ms = duration_secs * 1000;
        let played_ms = elapsed_ms.max(0);

        let elapsed_seconds = (played_ms / 1000).min(duration_secs);

        Self {
            elapsed_seconds,
            remaining_seconds: duration_secs - elapsed_seconds,
            progress: (played_ms as f64 / duration_ms as f64).min(1.0),
            initial_seek_ms: initial_seek_ms(elapsed_ms, duration_ms),
        }
    }
}

/// Seek offset for a player attaching `elapsed_ms` into a track.
///
/// Past the end the offset wraps modulo the duration, so a station whose
/// advance is stuck keeps every listener looping the same track in lockstep.
pub fn initial_seek_ms(elapsed_ms: i64, duration_ms: i64) -> i64 {
    if duration_ms <= 0 {
        return 0;
    }
    if elapsed_ms >= duration_ms {
        elapsed_ms % duration_ms
    } else {
        elapsed_ms.max(0)
    }
}

/// Whether a track of `duration_seconds` started at `started_at` is over.
pub fn has_ended(duration_seconds: i32, started_at: Timestamp, now: Timestamp) -> bool {
    (now - started_at).num_milliseconds() >= i64::from(duration_seconds) * 1000
}

/// Format seconds as `m:ss`.
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

// ---------------------------------------------------------------------------
// Per-listener engine
// ---------------------------------------------------------------------------

/// The scheduling-relevant part of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackTiming {
    pub track_id: DbId,
    pub duration_seconds: i32,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTick {
    pub snapshot: SyncSnapshot,
    /// True on the single tick that first observes the end of the current
    /// activation.
    pub track_ended: bool,
}

/// One listener's view of the station plus its end-of-track latch.
///
/// The latch guarantees at most one end signal per track activation, where
/// an activation is a `(track_id, started_at)` pair. Re-observing the same
/// pair (e.g. from a periodic re-fetch) keeps the latch set.
#[derive(Debug, Default)]
pub struct ClockSync {
    track: Option<TrackTiming>,
    started_at: Option<Timestamp>,
    end_signaled: bool,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the station view. Returns `true` when this starts a new
    /// activation (different track or different `started_at`).
    pub fn observe(&mut self, track: Option<TrackTiming>, started_at: Option<Timestamp>) -> bool {
        let track_changed = self.track.map(|t| t.track_id) != track.map(|t| t.track_id);
        let activation_changed = track_changed || self.started_at != started_at;

        if activation_changed {
            self.end_signaled = false;
        }
        self.track = track;
        self.started_at = started_at;

        activation_changed
    }

    pub fn current_track_id(&self) -> Option<DbId> {
        self.track.map(|t| t.track_id)
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    /// Whether there is anything to play.
    pub fn is_live(&self) -> bool {
        self.track.is_some() && self.started_at.is_some()
    }

    /// Snapshot at `now` without touching the latch.
    pub fn snapshot(&self, now: Timestamp) -> SyncSnapshot {
        match (self.track, self.started_at) {
            (Some(track), Some(started_at)) => {
                SyncSnapshot::compute(track.duration_seconds, started_at, now)
            }
            _ => SyncSnapshot::idle(),
        }
    }

    /// Recompute the snapshot and report the end of the track at most once.
    pub fn tick(&mut self, now: Timestamp) -> SyncTick {
        let (Some(track), Some(started_at)) = (self.track, self.started_at) else {
            return SyncTick {
                snapshot: SyncSnapshot::idle(),
                track_ended: false,
            };
        };

        let snapshot = SyncSnapshot::compute(track.duration_seconds, started_at, now);
        let track_ended = has_ended(track.duration_seconds, started_at, now) && self.latch_end();

        SyncTick {
            snapshot,
            track_ended,
        }
    }

    /// Route the player's own end-of-media event through the latch.
    ///
    /// Returns `true` when the caller should request an advance.
    pub fn signal_transport_end(&mut self) -> bool {
        if !self.is_live() {
            return false;
        }
        self.latch_end()
    }

    fn latch_end(&mut self) -> bool {
        if self.end_signaled {
            return false;
        }
        self.end_signaled = true;
        true
    }
}

// ---------------------------------------------------------------------------
// Server clock offset
// ---------------------------------------------------------------------------

/// Estimated difference between the server clock and the local clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockOffset {
    offset_ms: i64,
}

impl ClockOffset {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Estimate from a single request: the server stamped `server_time`
    /// somewhere between `sent_at` and `received_at`; assume the midpoint.
    pub fn estimate(sent_at: Timestamp, server_time: Timestamp, received_at: Timestamp) -> Self {
        let rtt_ms = (received_at - sent_at).num_milliseconds().max(0);
        let local_mid = sent_at + chrono::Duration::milliseconds(rtt_ms / 2);
        Self {
            offset_ms: (server_time - local_mid).num_milliseconds(),
        }
    }

    /// Translate a local instant to server time.
    pub fn server_now(&self, local_now: Timestamp) -> Timestamp {
        local_now + chrono::Duration::milliseconds(self.offset_ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.offset_ms
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
