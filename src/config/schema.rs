use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/sonata/config.toml` or `~/.config/sonata/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `SONATA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// How often the engine samples the playback position (milliseconds).
    pub position_interval_ms: u64,
    /// Initial volume as a linear fraction in `[0, 1]`.
    pub volume: f32,
    /// Capacity of the engine's command channel.
    pub command_capacity: usize,
    /// Per-subscriber event buffer.
    pub event_capacity: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            position_interval_ms: 500,
            volume: 1.0,
            command_capacity: 64,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether the queue starts shuffled.
    pub shuffle: bool,
    /// Default repeat mode.
    pub repeat_mode: RepeatModeSetting,
    /// Start playing the first queued track right after startup.
    pub autoplay: bool,
    /// Queue this playlist instead of the whole library.
    pub playlist: Option<String>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat_mode: RepeatModeSetting::Off,
            autoplay: true,
            playlist: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatModeSetting {
    #[serde(alias = "no-loop", alias = "no_loop", alias = "none")]
    Off,
    #[serde(alias = "repeat-one", alias = "loop-one", alias = "loop_one")]
    One,
    #[serde(alias = "repeat-all", alias = "loop-all", alias = "loop_all")]
    All,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directories scanned at startup.
    pub roots: Vec<PathBuf>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Number of metadata extraction workers.
    pub workers: usize,
    /// Bound on discovered paths waiting for a worker.
    pub queue_capacity: usize,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            follow_links: true,
            include_hidden: false,
            max_depth: None,
            workers: 4,
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the library and playlists live. Defaults to the XDG data dir.
    pub data_dir: Option<PathBuf>,
}
