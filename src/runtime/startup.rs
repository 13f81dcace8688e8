use std::fs;
use std::io;
use std::path::PathBuf;

use crate::audio::{PlayQueue, RepeatMode};
use crate::config;
use crate::library::{Library, PlaylistStore, Track};

pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    // A second init (tests, embedding) is harmless.
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Resolve and create the data directory. Failure here is fatal.
pub fn prepare_data_dir(settings: &config::Settings) -> io::Result<PathBuf> {
    let dir = settings.data_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "no data directory: set storage.data_dir or HOME",
        )
    })?;
    fs::create_dir_all(dir.join("playlists"))?;
    Ok(dir)
}

pub fn repeat_mode(setting: config::RepeatModeSetting) -> RepeatMode {
    match setting {
        config::RepeatModeSetting::Off => RepeatMode::Off,
        config::RepeatModeSetting::One => RepeatMode::One,
        config::RepeatModeSetting::All => RepeatMode::All,
    }
}

/// Tracks to queue: the configured playlist when it resolves, otherwise the
/// whole library in display order.
pub fn initial_tracks(
    settings: &config::Settings,
    library: &Library,
    playlists: &PlaylistStore,
) -> Vec<Track> {
    if let Some(name) = settings.playback.playlist.as_deref() {
        match playlists.resolve(name, library) {
            Ok(tracks) => return tracks,
            Err(e) => log::warn!("{e}; queueing the whole library"),
        }
    }
    library.tracks()
}

pub fn build_queue(settings: &config::Settings, tracks: Vec<Track>) -> PlayQueue {
    let mut queue = PlayQueue::new();
    queue.set(tracks);
    queue.set_repeat_mode(repeat_mode(settings.playback.repeat_mode));
    if settings.playback.shuffle {
        queue.shuffle();
    }
    queue
}
