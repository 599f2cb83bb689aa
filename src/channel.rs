//! Single-slot published state shared between the data pipeline and the
//! render loop.
//!
//! The writer replaces the whole value at once; readers always get the most
//! recent complete value as an `Arc`. Neither side owns the other: the cell
//! lives as long as any handle does, and the render loop never waits on how
//! often it is written.

use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::snapshot::TrackInfo;

type Slot<T> = Arc<Mutex<Arc<T>>>;

/// Create a cell holding `initial` and return its write and read ends.
pub fn published<T>(initial: T) -> (Publisher<T>, Subscriber<T>) {
    let slot: Slot<T> = Arc::new(Mutex::new(Arc::new(initial)));
    (
        Publisher {
            slot: Arc::clone(&slot),
        },
        Subscriber { slot },
    )
}

/// The only write end. Deliberately not `Clone`.
pub struct Publisher<T> {
    slot: Slot<T>,
}

impl<T> Publisher<T> {
    pub fn publish(&self, value: T) {
        let value = Arc::new(value);
        // The slot only ever holds a complete value, so a poisoned lock is
        // still safe to overwrite.
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = value;
    }
}

pub struct Subscriber<T> {
    slot: Slot<T>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Subscriber<T> {
    /// Latest value, waiting out a concurrent publish if there is one.
    pub fn latest(&self) -> Arc<T> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*slot)
    }

    /// Latest value without waiting. `None` only while a publish is in
    /// progress; callers keep whatever they read last.
    pub fn try_latest(&self) -> Option<Arc<T>> {
        match self.slot.try_lock() {
            Ok(slot) => Some(Arc::clone(&*slot)),
            Err(TryLockError::Poisoned(poisoned)) => Some(Arc::clone(&*poisoned.into_inner())),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

/// Connection state shown when there is no track to animate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// No poll has completed yet.
    #[default]
    Connecting,
    /// The player reported nothing playing.
    Idle,
    Active,
    /// The credential was rejected. Nothing more will be polled.
    Disconnected,
}

/// What the render loop animates from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationInput {
    pub status: PlaybackStatus,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub active_line: Option<String>,
    pub active_index: Option<usize>,
    pub line_count: usize,
    /// Active line followed by the next few.
    pub window: Vec<String>,
    pub track: Option<TrackInfo>,
    pub lyrics_pending: bool,
    /// Bumped on every publish.
    pub version: u64,
}

pub type AnimationPublisher = Publisher<AnimationInput>;
pub type AnimationSubscriber = Subscriber<AnimationInput>;

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn readers_see_latest_write() {
        let (tx, rx) = published(1u32);
        let other = rx.clone();
        assert_eq!(*rx.latest(), 1);
        tx.publish(2);
        tx.publish(3);
        assert_eq!(*rx.latest(), 3);
        assert_eq!(*other.try_latest().unwrap(), 3);
    }

    #[test]
    fn cell_outlives_the_writer() {
        let (tx, rx) = published(String::from("first"));
        tx.publish("last".into());
        drop(tx);
        assert_eq!(rx.latest().as_str(), "last");
    }

    #[test]
    fn reads_are_never_torn() {
        // Each published pair is consistent; a torn read would mismatch.
        let (tx, rx) = published((0u64, 0u64));
        let writer = thread::spawn(move || {
            for i in 1..=20_000u64 {
                tx.publish((i, i * 2));
            }
        });
        let mut last = 0;
        while last < 20_000 {
            let value = rx.latest();
            assert_eq!(value.1, value.0 * 2);
            assert!(value.0 >= last);
            last = value.0;
        }
        writer.join().unwrap();
    }

    #[test]
    fn cloned_subscribers_share_the_slot() {
        let (tx, rx) = published(AnimationInput::default());
        let late = rx.clone();
        drop(rx);
        tx.publish(AnimationInput {
            status: PlaybackStatus::Idle,
            version: 7,
            ..AnimationInput::default()
        });
        let seen = late.latest();
        assert_eq!(seen.status, PlaybackStatus::Idle);
        assert_eq!(seen.version, 7);
    }
}
