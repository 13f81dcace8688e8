//! Playback commands, events and state snapshots.

use std::time::Duration;

use crate::library::{Track, TrackId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone)]
pub enum Command {
    /// Load `track` and start playing it, replacing anything loaded.
    Play(Track),
    Pause,
    Resume,
    /// Release the stream and reset the position.
    Stop,
    /// Jump to an absolute position, clamped to the track length.
    Seek(Duration),
    /// Move by the given number of seconds (positive or negative).
    SeekBy(i64),
    /// Linear volume, clamped to `[0, 1]`.
    SetVolume(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StateChanged(PlaybackStatus),
    /// Periodic position sample. Dropped when the subscriber lags.
    PositionUpdate(Duration),
    /// The loaded track played to its end; the engine is now stopped.
    TrackEnded(TrackId),
    PlaybackFailed(String),
}

impl Event {
    /// Events the caller relies on to advance playback; never dropped.
    pub fn is_critical(&self) -> bool {
        matches!(self, Event::TrackEnded(_) | Event::PlaybackFailed(_))
    }
}

/// Read-only snapshot of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub track: Option<Track>,
    pub position: Duration,
    pub duration: Duration,
    pub volume: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            track: None,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            volume: 1.0,
        }
    }
}
