//! Data-domain lifecycle: the poller and the pipeline threads.
//!
//! The poller asks the snapshot source for playback state on a slow timer and
//! forwards numbered results. The pipeline thread is the only owner of the
//! estimator, the lyric sheet and the publisher; it folds in poll results and
//! lyric arrivals, re-estimates on its own faster timer, and publishes an
//! [`AnimationInput`] after each step. Lyric lookups run on detached threads
//! tagged with the track they were started for.

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    channel::{published, AnimationInput, AnimationPublisher, AnimationSubscriber, PlaybackStatus},
    error::PollError,
    estimator::{Observation, PositionEstimator},
    lyrics::{self, LyricDocument, LyricSource},
    mapper::map_line,
    snapshot::{SnapshotSource, TrackInfo, TrackSnapshot},
};

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub poll_interval: Duration,
    pub update_interval: Duration,
    pub drift_tolerance_ms: u64,
    pub window_len: usize,
}

impl From<&crate::config::AppConfig> for SessionConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        SessionConfig {
            poll_interval: cfg.poll_interval(),
            update_interval: cfg.update_interval(),
            drift_tolerance_ms: cfg.drift_tolerance_ms,
            window_len: cfg.window_len,
        }
    }
}

enum Event {
    Poll {
        seq: u64,
        result: Result<Option<TrackSnapshot>, PollError>,
    },
    Lyrics(LyricDocument),
    Shutdown,
}

/// A running display session's data side.
pub struct Session {
    subscriber: AnimationSubscriber,
    events: Sender<Event>,
    stop_poller: Sender<()>,
    poller: Option<JoinHandle<()>>,
    pipeline: Option<JoinHandle<()>>,
}

impl Session {
    pub fn start<S>(config: SessionConfig, source: S, lyric_source: Arc<dyn LyricSource>) -> Session
    where
        S: SnapshotSource,
    {
        let (publisher, subscriber) = published(AnimationInput::default());
        let (events_tx, events_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        let poller = {
            let events = events_tx.clone();
            let interval = config.poll_interval;
            thread::Builder::new()
                .name("snapshot-poller".into())
                .spawn(move || run_poller(source, interval, events, stop_rx))
        };
        let pipeline = {
            let events = events_tx.clone();
            thread::Builder::new()
                .name("playback-pipeline".into())
                .spawn(move || {
                    Pipeline::new(config, publisher, lyric_source, events).run(events_rx)
                })
        };

        Session {
            subscriber,
            events: events_tx,
            stop_poller: stop_tx,
            poller: spawned(poller, "snapshot-poller"),
            pipeline: spawned(pipeline, "playback-pipeline"),
        }
    }

    pub fn subscriber(&self) -> AnimationSubscriber {
        self.subscriber.clone()
    }

    /// Stop both threads and wait for them. Lyric lookups still in flight
    /// finish on their own; their results go nowhere.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.stop_poller.send(());
        let _ = self.events.send(Event::Shutdown);
        if let Some(poller) = self.poller.take() {
            // A poll in flight can take up to the request timeout; the poller
            // exits on its own once it sees the stop signal.
            if poller.is_finished() {
                if poller.join().is_err() {
                    tracing::error!(thread = "snapshot-poller", "thread panicked");
                }
            } else {
                tracing::debug!("poller busy, detaching");
            }
        }
        if let Some(pipeline) = self.pipeline.take() {
            if pipeline.join().is_err() {
                tracing::error!(thread = "playback-pipeline", "thread panicked");
            }
        }
        tracing::debug!("session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.poller.is_some() || self.pipeline.is_some() {
            self.stop();
        }
    }
}

fn spawned(result: std::io::Result<JoinHandle<()>>, name: &str) -> Option<JoinHandle<()>> {
    match result {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::error!(thread = name, "failed to spawn: {err}");
            None
        }
    }
}

fn run_poller<S: SnapshotSource>(mut source: S, interval: Duration, events: Sender<Event>, stop: Receiver<()>) {
    let mut seq = 0u64;
    loop {
        seq += 1;
        let result = source.poll();
        let unauthorized = matches!(result, Err(PollError::Unauthorized(_)));
        if events.send(Event::Poll { seq, result }).is_err() || unauthorized {
            break;
        }
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            _ => break,
        }
    }
    tracing::debug!(polls = seq, "poller exiting");
}

struct Pipeline {
    config: SessionConfig,
    publisher: AnimationPublisher,
    lyric_source: Arc<dyn LyricSource>,
    events: Sender<Event>,
    estimator: PositionEstimator,
    status: PlaybackStatus,
    track: Option<TrackInfo>,
    lyrics: LyricDocument,
    lyrics_pending: bool,
    version: u64,
}

impl Pipeline {
    fn new(
        config: SessionConfig,
        publisher: AnimationPublisher,
        lyric_source: Arc<dyn LyricSource>,
        events: Sender<Event>,
    ) -> Self {
        Pipeline {
            estimator: PositionEstimator::new(config.drift_tolerance_ms),
            config,
            publisher,
            lyric_source,
            events,
            status: PlaybackStatus::Connecting,
            track: None,
            lyrics: LyricDocument::default(),
            lyrics_pending: false,
            version: 0,
        }
    }

    fn run(mut self, events: Receiver<Event>) {
        loop {
            match events.recv_timeout(self.config.update_interval) {
                Ok(Event::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(Event::Poll { seq, result }) => self.on_poll(seq, result, Instant::now()),
                Ok(Event::Lyrics(doc)) => self.on_lyrics(doc),
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.publish(Instant::now());
        }
        tracing::debug!("pipeline exiting");
    }

    fn on_poll(&mut self, seq: u64, result: Result<Option<TrackSnapshot>, PollError>, now: Instant) {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(PollError::Unauthorized(code)) => {
                tracing::warn!(code, "credential rejected, disconnecting");
                self.status = PlaybackStatus::Disconnected;
                return;
            }
            Err(err @ PollError::Transient(_)) => {
                tracing::warn!(seq, "poll failed, keeping last state: {err}");
                return;
            }
        };
        if self.status == PlaybackStatus::Disconnected {
            return;
        }

        let track = snapshot.as_ref().map(|s| s.track.clone());
        match self.estimator.observe(seq, snapshot, now) {
            Observation::Stale => {
                tracing::debug!(seq, "dropping out-of-order poll");
            }
            Observation::Cleared => {
                if self.status != PlaybackStatus::Idle {
                    tracing::info!("nothing playing");
                }
                self.status = PlaybackStatus::Idle;
                self.track = None;
                self.lyrics = LyricDocument::default();
                self.lyrics_pending = false;
            }
            Observation::TrackChanged => {
                self.status = PlaybackStatus::Active;
                if let Some(track) = track {
                    tracing::info!(id = %track.id, name = %track.name, artist = %track.artist_line(), "track changed");
                    self.request_lyrics(&track);
                    self.track = Some(track);
                }
            }
            Observation::Resynced => {
                self.status = PlaybackStatus::Active;
                tracing::debug!(seq, "baseline resynced");
            }
            Observation::Continued => {
                self.status = PlaybackStatus::Active;
            }
        }
    }

    fn request_lyrics(&mut self, track: &TrackInfo) {
        self.lyrics = LyricDocument::empty(&track.id);
        self.lyrics_pending = true;

        let source = Arc::clone(&self.lyric_source);
        let events = self.events.clone();
        let (id, title, artist) = (track.id.clone(), track.name.clone(), track.primary_artist().to_string());
        let spawn = thread::Builder::new().name("lyrics-fetch".into()).spawn(move || {
            let doc = lyrics::acquire(source.as_ref(), &id, &title, &artist);
            // The session may be gone by now.
            let _ = events.send(Event::Lyrics(doc));
        });
        if let Err(err) = spawn {
            tracing::warn!("failed to spawn lyrics fetch: {err}");
            self.lyrics_pending = false;
        }
    }

    fn on_lyrics(&mut self, doc: LyricDocument) {
        if self.estimator.track_id() != Some(doc.track_id.as_str()) {
            tracing::debug!(track_id = %doc.track_id, "dropping lyrics for a track no longer playing");
            return;
        }
        tracing::debug!(track_id = %doc.track_id, lines = doc.lines.len(), "lyrics applied");
        self.lyrics = doc;
        self.lyrics_pending = false;
    }

    fn snapshot_input(&self, now: Instant) -> AnimationInput {
        let base = AnimationInput {
            status: self.status,
            track: self.track.clone(),
            lyrics_pending: self.lyrics_pending,
            line_count: self.lyrics.lines.len(),
            version: self.version,
            ..AnimationInput::default()
        };
        if self.status == PlaybackStatus::Disconnected {
            return AnimationInput {
                track: None,
                lyrics_pending: false,
                line_count: 0,
                ..base
            };
        }
        let Some(estimate) = self.estimator.estimate(now) else {
            return base;
        };
        let lines = map_line(
            estimate.estimated_progress_ms as f64,
            estimate.duration_ms,
            &self.lyrics.lines,
            self.config.window_len,
        );
        AnimationInput {
            progress_ms: estimate.estimated_progress_ms,
            duration_ms: estimate.duration_ms,
            is_playing: estimate.is_playing,
            active_line: lines.active_line().map(str::to_string),
            active_index: lines.active_index,
            window: lines.window,
            ..base
        }
    }

    fn publish(&mut self, now: Instant) {
        self.version += 1;
        let input = self.snapshot_input(now);
        self.publisher.publish(input);
    }
}
