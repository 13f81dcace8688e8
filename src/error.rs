//! Error types shared across the playback, queue, scan and storage layers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while opening, decoding or outputting audio.
///
/// The engine never propagates these out of its command loop; they surface as
/// `Event::PlaybackFailed` instead. Callers only see them synchronously when a
/// command cannot be submitted at all.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("invalid volume: {0}")]
    InvalidVolume(f32),

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("playback engine is not running")]
    EngineClosed,
}

impl PlaybackError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue is empty")]
    Empty,

    #[error("index {index} out of range for queue of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A single file that could not be indexed. Collected, never fatal to a scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {reason}", .path.display())]
pub struct ScanError {
    pub path: PathBuf,
    pub reason: String,
}

impl ScanError {
    pub fn new(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown playlist: {0}")]
    UnknownPlaylist(String),

    #[error("playlist already exists: {0}")]
    DuplicatePlaylist(String),

    #[error("invalid playlist name: {0:?}")]
    InvalidPlaylistName(String),
}
