//! Turns sparse playback snapshots into a continuous position.
//!
//! The remote player only tells us where it was when it answered. Between
//! polls the position is extrapolated from the last snapshot (the baseline)
//! using the monotonic clock. New snapshots for the same track either nudge
//! the baseline (small drift, never stepping backwards) or replace it outright
//! (seek, pause/resume, large drift). A different track always replaces it.

use std::time::Instant;

use crate::snapshot::TrackSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackEstimate {
    pub estimated_progress_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub track_id: String,
}

/// How a poll result changed the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Older than a poll already applied; ignored.
    Stale,
    /// Nothing playing; baseline dropped.
    Cleared,
    /// First snapshot, or a different track. Baseline replaced, no blending.
    TrackChanged,
    /// Same track but seek, pause/resume or drift beyond tolerance.
    Resynced,
    /// Same track, within tolerance.
    Continued,
}

/// Position a snapshot implies at `now`, clamped to the track length.
pub fn extrapolate(snapshot: &TrackSnapshot, now: Instant) -> u64 {
    let progress = if snapshot.is_playing {
        let elapsed = now.saturating_duration_since(snapshot.fetched_at).as_millis();
        let elapsed = u64::try_from(elapsed).unwrap_or(u64::MAX);
        snapshot.reported_progress_ms.saturating_add(elapsed)
    } else {
        snapshot.reported_progress_ms
    };
    progress.min(snapshot.duration_ms)
}

#[derive(Debug)]
pub struct PositionEstimator {
    baseline: Option<TrackSnapshot>,
    /// Lowest value the estimate may report after a small backwards
    /// correction while playing.
    floor_ms: Option<u64>,
    last_seq: Option<u64>,
    drift_tolerance_ms: u64,
}

impl PositionEstimator {
    pub fn new(drift_tolerance_ms: u64) -> Self {
        PositionEstimator {
            baseline: None,
            floor_ms: None,
            last_seq: None,
            drift_tolerance_ms,
        }
    }

    pub fn track_id(&self) -> Option<&str> {
        self.baseline.as_ref().map(TrackSnapshot::track_id)
    }

    /// Apply the result of poll number `seq`.
    pub fn observe(&mut self, seq: u64, snapshot: Option<TrackSnapshot>, now: Instant) -> Observation {
        if self.last_seq.is_some_and(|last| seq <= last) {
            return Observation::Stale;
        }
        self.last_seq = Some(seq);

        let Some(snapshot) = snapshot else {
            self.reset(None);
            return Observation::Cleared;
        };
        let Some(prev) = self.baseline.as_ref() else {
            self.reset(Some(snapshot));
            return Observation::TrackChanged;
        };
        if prev.track_id() != snapshot.track_id() {
            self.reset(Some(snapshot));
            return Observation::TrackChanged;
        }

        if !snapshot.is_playing {
            let unchanged = !prev.is_playing && prev.reported_progress_ms == snapshot.reported_progress_ms;
            self.reset(Some(snapshot));
            return if unchanged {
                Observation::Continued
            } else {
                Observation::Resynced
            };
        }

        let current = self.progress_at(now);
        let incoming = extrapolate(&snapshot, now);
        if !prev.is_playing || incoming.abs_diff(current) > self.drift_tolerance_ms {
            self.reset(Some(snapshot));
            return Observation::Resynced;
        }

        self.floor_ms = (current > incoming).then_some(current);
        self.baseline = Some(snapshot);
        Observation::Continued
    }

    /// Current estimate, or `None` when nothing is playing.
    pub fn estimate(&self, now: Instant) -> Option<PlaybackEstimate> {
        let baseline = self.baseline.as_ref()?;
        Some(PlaybackEstimate {
            estimated_progress_ms: self.progress_at(now),
            duration_ms: baseline.duration_ms,
            is_playing: baseline.is_playing,
            track_id: baseline.track.id.clone(),
        })
    }

    fn progress_at(&self, now: Instant) -> u64 {
        let Some(baseline) = self.baseline.as_ref() else {
            return 0;
        };
        let raw = extrapolate(baseline, now);
        match self.floor_ms {
            Some(floor) if baseline.is_playing => raw.max(floor).min(baseline.duration_ms),
            _ => raw,
        }
    }

    fn reset(&mut self, baseline: Option<TrackSnapshot>) {
        self.baseline = baseline;
        self.floor_ms = None;
    }
}
