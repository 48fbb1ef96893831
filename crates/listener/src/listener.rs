//! The listener loop.
//!
//! One cooperative `tokio::select!` loop owns the clock-sync state and the
//! playback surface. It ticks once per second while playing, applies pushed
//! and re-fetched station state, and asks the server to advance when the
//! current activation ends. Fetches and advance requests run on spawned
//! tasks and report back through channels; the loop never waits on the
//! network.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use radar_core::retry::RetryPolicy;
use radar_core::station::{AdvanceReply, TrackInfo};
use radar_core::sync::{format_time, ClockOffset, ClockSync, TICK_INTERVAL};
use radar_core::types::Timestamp;
use radar_events::StationEvent;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::client::{ClientError, StationClient, StationFetch};
use crate::playback::{PlaybackEvent, PlaybackEvents, PlaybackSurface};

type AdvanceResult = Result<AdvanceReply, ClientError>;
type FetchResult = Result<StationFetch, ClientError>;

/// Where spawned requests report back to the loop.
struct Completions {
    advance: mpsc::UnboundedSender<AdvanceResult>,
    fetch: mpsc::UnboundedSender<FetchResult>,
}

/// A single listener attached to the station.
pub struct Listener<S> {
    client: Arc<StationClient>,
    surface: S,
    sync: ClockSync,
    offset: ClockOffset,
    current: Option<TrackInfo>,
    /// When the newest applied station state came into effect.
    as_of: Option<Timestamp>,
    playing: bool,
    retry: RetryPolicy,
    advance_in_flight: bool,
    fetch_in_flight: bool,
    refresh_pending: bool,
}

impl<S: PlaybackSurface> Listener<S> {
    /// A listener that starts playing as soon as the station has a track.
    pub fn new(client: StationClient, mut surface: S, volume: u8) -> Self {
        surface.set_volume(volume);
        Self {
            client: Arc::new(client),
            surface,
            sync: ClockSync::new(),
            offset: ClockOffset::zero(),
            current: None,
            as_of: None,
            playing: true,
            retry: RetryPolicy::default(),
            advance_in_flight: false,
            fetch_in_flight: false,
            refresh_pending: false,
        }
    }

    pub fn current_track(&self) -> Option<&TrackInfo> {
        self.current.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Drive the listener until the surrounding task is dropped.
    pub async fn run(
        mut self,
        mut feed: mpsc::Receiver<StationEvent>,
        mut playback: PlaybackEvents,
        refetch_interval: Duration,
    ) {
        let (advance_tx, mut advance_rx) = mpsc::unbounded_channel();
        let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel();
        let done = Completions {
            advance: advance_tx,
            fetch: fetch_tx,
        };

        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first refetch tick fires immediately: initial load.
        let mut refetch = tokio::time::interval(refetch_interval);
        refetch.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick(), if self.is_ticking() => {
                    if self.on_tick(self.server_now()) {
                        self.request_advance(&done);
                    }
                }
                _ = refetch.tick() => {
                    self.request_refresh(&done);
                }
                Some(event) = feed.recv() => {
                    self.on_feed_event(event, &done);
                }
                Some(event) = playback.recv() => {
                    if self.on_playback_event(event) {
                        self.request_advance(&done);
                    }
                }
                Some(result) = advance_rx.recv() => {
                    self.on_advance_done(result, &done);
                }
                Some(result) = fetch_rx.recv() => {
                    self.on_fetch_done(result, &done);
                }
            }
        }
    }

    /// Pause or resume. Resuming rejoins the live timeline.
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        if playing {
            self.seek_to_live(self.server_now());
            self.surface.play();
        } else {
            self.surface.pause();
        }
    }

    fn is_ticking(&self) -> bool {
        self.playing && self.sync.is_live()
    }

    fn server_now(&self) -> Timestamp {
        self.offset.server_now(Utc::now())
    }

    /// Record `as_of` as the newest station state seen. Returns `false` for
    /// a state older than one already applied.
    fn accept(&mut self, as_of: Timestamp) -> bool {
        if self.as_of.is_some_and(|held| as_of < held) {
            tracing::debug!(%as_of, "Ignoring station state older than the current view");
            return false;
        }
        self.as_of = Some(as_of);
        true
    }

    /// Replace the station view. A new activation reloads the surface and
    /// seeks to the shared position.
    fn apply(&mut self, track: Option<TrackInfo>, started_at: Option<Timestamp>, now: Timestamp) {
        let started_at = track.as_ref().and(started_at);
        let changed = self
            .sync
            .observe(track.as_ref().map(TrackInfo::timing), started_at);
        if !changed {
            // Same activation; keep metadata fresh for display.
            self.current = track;
            return;
        }

        match &track {
            Some(t) if started_at.is_some() => {
                self.surface.load(t);
                self.seek_to_live(now);
                if self.playing {
                    self.surface.play();
                }
                let snapshot = self.sync.snapshot(now);
                tracing::info!(
                    track_id = t.id,
                    artist = %t.artist_name,
                    title = %t.track_title,
                    position = %format_time(snapshot.elapsed_seconds),
                    duration = %format_time(i64::from(t.duration_seconds)),
                    "Now playing"
                );
            }
            _ => {
                self.surface.stop();
                tracing::info!("Nothing is currently playing");
            }
        }
        self.current = track;
    }

    fn seek_to_live(&mut self, now: Timestamp) {
        if self.sync.is_live() {
            self.surface.seek_to(self.sync.snapshot(now).initial_seek_ms);
        }
    }

    /// Returns `true` when the clock says the current activation just ended.
    fn on_tick(&mut self, now: Timestamp) -> bool {
        let tick = self.sync.tick(now);
        tracing::trace!(
            elapsed = tick.snapshot.elapsed_seconds,
            remaining = tick.snapshot.remaining_seconds,
            progress = tick.snapshot.progress,
            "Tick"
        );
        if tick.track_ended {
            tracing::debug!(track_id = ?self.sync.current_track_id(), "Track ended on clock");
        }
        tick.track_ended
    }

    /// Returns `true` when the transport's end should trigger an advance.
    fn on_playback_event(&mut self, event: PlaybackEvent) -> bool {
        match event {
            PlaybackEvent::Finished => {
                let fire = self.sync.signal_transport_end();
                tracing::debug!(fire, "Transport reported end of media");
                fire
            }
            PlaybackEvent::Failed(reason) => {
                // Timing stays on the clock; the end signal still fires.
                tracing::warn!(reason = %reason, "Playback failed");
                false
            }
        }
    }

    fn on_feed_event(&mut self, event: StationEvent, done: &Completions) {
        match event {
            StationEvent::TrackChanged {
                track,
                started_at,
                trigger,
            } => {
                tracing::debug!(trigger = trigger.as_str(), "Station changed");
                if self.accept(started_at) {
                    self.apply(track, Some(started_at), self.server_now());
                }
            }
            StationEvent::StationSnapshot(now_playing) => {
                if self.accept(now_playing.as_of()) {
                    self.apply(now_playing.track, now_playing.started_at, self.server_now());
                }
            }
            StationEvent::CatalogChanged { track_id, change } => {
                if self.sync.current_track_id() == Some(track_id) {
                    tracing::debug!(track_id, ?change, "Current track edited, refreshing");
                    self.request_refresh(done);
                }
            }
        }
    }

    /// Start a re-fetch of the full station state. A request made while one
    /// is in flight is queued behind it.
    fn request_refresh(&mut self, done: &Completions) {
        if self.fetch_in_flight {
            self.refresh_pending = true;
            return;
        }
        self.fetch_in_flight = true;

        let client = Arc::clone(&self.client);
        let done = done.fetch.clone();
        tokio::spawn(async move {
            let _ = done.send(client.fetch_station().await);
        });
    }

    /// Apply a finished re-fetch. Failures keep the stale view.
    fn on_fetch_done(&mut self, result: FetchResult, done: &Completions) {
        self.fetch_in_flight = false;
        match result {
            Ok(fetch) => {
                self.offset = fetch.offset;
                if self.accept(fetch.now_playing.as_of()) {
                    let now = self.server_now();
                    self.apply(fetch.now_playing.track, fetch.now_playing.started_at, now);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Station fetch failed, keeping current view");
            }
        }
        if std::mem::take(&mut self.refresh_pending) {
            self.request_refresh(done);
        }
    }

    fn request_advance(&mut self, done: &Completions) {
        if self.advance_in_flight {
            return;
        }
        self.advance_in_flight = true;

        let client = Arc::clone(&self.client);
        let policy = self.retry;
        let done = done.advance.clone();
        tokio::spawn(async move {
            let result = client.advance_with_retry(true, policy).await;
            let _ = done.send(result);
        });
    }

    fn on_advance_done(&mut self, result: AdvanceResult, done: &Completions) {
        self.advance_in_flight = false;
        match result {
            Ok(reply) => {
                tracing::info!(
                    message = %reply.message,
                    new_track_id = ?reply.new_track_id,
                    remaining_seconds = ?reply.remaining_seconds,
                    "Advance answered"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Advance failed after retries, station unchanged");
            }
        }
        // Whatever the answer, the freshest state comes from the server.
        self.request_refresh(done);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Duration as ChronoDuration, TimeZone};
    use radar_core::rotation::AdvanceTrigger;
    use radar_core::station::NowPlaying;
    use tokio::net::TcpListener;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Load(i64),
        Stop,
        Play,
        Pause,
        Volume(u8),
        Seek(i64),
    }

    #[derive(Clone, Default)]
    struct RecordingSurface {
        commands: Arc<Mutex<Vec<Command>>>,
    }

    impl RecordingSurface {
        fn take(&self) -> Vec<Command> {
            std::mem::take(&mut self.commands.lock().unwrap())
        }
    }

    impl PlaybackSurface for RecordingSurface {
        fn load(&mut self, track: &TrackInfo) {
            self.commands.lock().unwrap().push(Command::Load(track.id));
        }
        fn stop(&mut self) {
            self.commands.lock().unwrap().push(Command::Stop);
        }
        fn play(&mut self) {
            self.commands.lock().unwrap().push(Command::Play);
        }
        fn pause(&mut self) {
            self.commands.lock().unwrap().push(Command::Pause);
        }
        fn set_volume(&mut self, volume: u8) {
            self.commands.lock().unwrap().push(Command::Volume(volume));
        }
        fn seek_to(&mut self, position_ms: i64) {
            self.commands.lock().unwrap().push(Command::Seek(position_ms));
        }
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn track(id: i64, duration_seconds: i32) -> TrackInfo {
        TrackInfo {
            id,
            artist_name: "Night Drive".into(),
            track_title: format!("Track {id}"),
            audio_source_url: format!("https://soundcloud.com/night-drive/{id}"),
            cover_image_url: None,
            duration_seconds,
        }
    }

    fn listener() -> (Listener<RecordingSurface>, RecordingSurface) {
        let surface = RecordingSurface::default();
        let listener = Listener::new(
            StationClient::new("http://127.0.0.1:9/api/v1"),
            surface.clone(),
            80,
        );
        surface.take();
        (listener, surface)
    }

    /// Completion channels whose receivers are dropped; nothing in these
    /// tests waits on a spawned request.
    fn completions() -> Completions {
        let (advance, _) = mpsc::unbounded_channel();
        let (fetch, _) = mpsc::unbounded_channel();
        Completions { advance, fetch }
    }

    fn track_changed(track: Option<TrackInfo>, started_at: Timestamp) -> StationEvent {
        StationEvent::TrackChanged {
            track,
            started_at,
            trigger: AdvanceTrigger::Scheduler,
        }
    }

    #[test]
    fn new_listener_sets_volume() {
        let surface = RecordingSurface::default();
        let _listener = Listener::new(StationClient::new("http://x"), surface.clone(), 55);
        assert_eq!(surface.take(), vec![Command::Volume(55)]);
    }

    #[test]
    fn joining_mid_track_seeks_to_shared_position() {
        let (mut listener, surface) = listener();
        let now = t0() + ChronoDuration::seconds(95);

        listener.apply(Some(track(1, 180)), Some(t0()), now);

        assert_eq!(
            surface.take(),
            vec![Command::Load(1), Command::Seek(95_000), Command::Play]
        );
        assert_eq!(listener.current_track().map(|t| t.id), Some(1));
    }

    #[test]
    fn stuck_station_seeks_modulo_duration() {
        let (mut listener, surface) = listener();
        let now = t0() + ChronoDuration::seconds(200);

        listener.apply(Some(track(1, 180)), Some(t0()), now);

        assert!(surface.take().contains(&Command::Seek(20_000)));
    }

    #[test]
    fn reapplying_same_activation_does_not_reload() {
        let (mut listener, surface) = listener();
        listener.apply(Some(track(1, 180)), Some(t0()), t0());
        surface.take();

        listener.apply(Some(track(1, 180)), Some(t0()), t0() + ChronoDuration::seconds(30));

        assert!(surface.take().is_empty());
    }

    #[test]
    fn idle_station_stops_surface() {
        let (mut listener, surface) = listener();
        listener.apply(Some(track(1, 180)), Some(t0()), t0());
        surface.take();

        listener.apply(None, None, t0());

        assert_eq!(surface.take(), vec![Command::Stop]);
        assert!(!listener.is_ticking());
    }

    #[test]
    fn clock_end_fires_once_per_activation() {
        let (mut listener, _surface) = listener();
        listener.apply(Some(track(1, 180)), Some(t0()), t0());

        assert!(!listener.on_tick(t0() + ChronoDuration::seconds(179)));
        assert!(listener.on_tick(t0() + ChronoDuration::seconds(180)));
        assert!(!listener.on_tick(t0() + ChronoDuration::seconds(181)));
        // A re-fetch returning the same stalled activation keeps the latch.
        listener.apply(Some(track(1, 180)), Some(t0()), t0() + ChronoDuration::seconds(200));
        assert!(!listener.on_tick(t0() + ChronoDuration::seconds(201)));

        // The next activation re-arms it.
        let next_start = t0() + ChronoDuration::seconds(202);
        listener.apply(Some(track(2, 60)), Some(next_start), next_start);
        assert!(listener.on_tick(next_start + ChronoDuration::seconds(60)));
    }

    #[test]
    fn transport_end_shares_the_clock_latch() {
        let (mut listener, _surface) = listener();
        listener.apply(Some(track(1, 180)), Some(t0()), t0());

        assert!(listener.on_playback_event(PlaybackEvent::Finished));
        assert!(!listener.on_tick(t0() + ChronoDuration::seconds(180)));
        assert!(!listener.on_playback_event(PlaybackEvent::Finished));
    }

    #[test]
    fn playback_failure_does_not_trigger_advance() {
        let (mut listener, _surface) = listener();
        listener.apply(Some(track(1, 180)), Some(t0()), t0());

        assert!(!listener.on_playback_event(PlaybackEvent::Failed("decode".into())));
    }

    #[test]
    fn paused_listener_does_not_tick_or_autoplay() {
        let (mut listener, surface) = listener();
        listener.set_playing(false);
        listener.apply(Some(track(1, 180)), Some(t0()), t0() + ChronoDuration::seconds(10));

        assert_eq!(
            surface.take(),
            vec![Command::Pause, Command::Load(1), Command::Seek(10_000)]
        );
        assert!(!listener.is_ticking());
    }

    #[tokio::test]
    async fn track_changed_event_applies_new_activation() {
        let (mut listener, surface) = listener();
        let started_at = Utc::now() - ChronoDuration::seconds(3);

        listener.on_feed_event(track_changed(Some(track(4, 120)), started_at), &completions());

        let commands = surface.take();
        assert_eq!(commands[0], Command::Load(4));
        assert!(matches!(commands[1], Command::Seek(ms) if (3_000..5_000).contains(&ms)));
        assert_eq!(commands[2], Command::Play);
    }

    #[tokio::test]
    async fn idle_track_changed_event_stops_playback() {
        let (mut listener, surface) = listener();
        listener.apply(Some(track(1, 180)), Some(t0()), t0());
        surface.take();

        listener.on_feed_event(track_changed(None, Utc::now()), &completions());

        assert_eq!(surface.take(), vec![Command::Stop]);
    }

    #[tokio::test]
    async fn older_snapshot_does_not_replace_newer_activation() {
        let (mut listener, surface) = listener();
        let old_start = Utc::now() - ChronoDuration::seconds(100);
        let new_start = Utc::now() - ChronoDuration::seconds(1);
        let done = completions();

        listener.on_feed_event(track_changed(Some(track(2, 180)), new_start), &done);
        surface.take();

        // A snapshot read before the switch committed arrives late.
        let stale = NowPlaying {
            track: Some(track(1, 180)),
            started_at: Some(old_start),
            server_time: new_start - ChronoDuration::milliseconds(5),
            next_track_id: Some(2),
            snapshot: radar_core::sync::SyncSnapshot::compute(180, old_start, new_start),
        };
        listener.on_feed_event(StationEvent::StationSnapshot(stale), &done);

        assert!(surface.take().is_empty());
        assert_eq!(listener.current_track().map(|t| t.id), Some(2));

        // An idle snapshot read before the switch is stale as well.
        let stale_idle = NowPlaying::idle(new_start - ChronoDuration::milliseconds(5));
        listener.on_feed_event(StationEvent::StationSnapshot(stale_idle), &done);
        assert!(surface.take().is_empty());
        assert_eq!(listener.current_track().map(|t| t.id), Some(2));
    }

    #[tokio::test]
    async fn hung_station_fetch_does_not_block_pushed_events() {
        // Accepts connections and never answers them.
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = server.accept().await {
                held.push(socket);
            }
        });

        let surface = RecordingSurface::default();
        let listener = Listener::new(
            StationClient::new(format!("http://{addr}/api/v1")),
            surface.clone(),
            80,
        );
        let (feed_tx, feed_rx) = mpsc::channel(8);
        let (_playback_tx, playback_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = feed_tx
                .send(track_changed(Some(track(9, 180)), Utc::now()))
                .await;
            // Keep the feed open for the rest of the test.
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let _ = tokio::time::timeout(
            Duration::from_secs(2),
            listener.run(feed_rx, playback_rx, Duration::from_secs(30)),
        )
        .await;

        assert!(surface.take().contains(&Command::Load(9)));
    }
}
