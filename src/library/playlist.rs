//! Named playlists, one JSON document per playlist.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

use super::catalog::Library;
use super::model::{Track, TrackId};
use super::store::write_json_atomic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub tracks: Vec<TrackId>,
}

/// All playlists under one directory. Loaded eagerly, saved on every change.
#[derive(Debug)]
pub struct PlaylistStore {
    dir: PathBuf,
    playlists: BTreeMap<String, Playlist>,
}

impl PlaylistStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut playlists = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path)
                .map_err(StoreError::from)
                .and_then(|raw| serde_json::from_slice::<Playlist>(&raw).map_err(StoreError::from))
            {
                Ok(p) if path.file_stem().and_then(|s| s.to_str()) != Some(p.name.as_str()) => {
                    log::warn!(
                        "skipping playlist {}: file name does not match {:?}",
                        path.display(),
                        p.name
                    );
                }
                Ok(p) => {
                    playlists.insert(p.name.clone(), p);
                }
                Err(e) => log::warn!("skipping playlist {}: {e}", path.display()),
            }
        }

        log::info!("loaded {} playlists from {}", playlists.len(), dir.display());
        Ok(Self { dir, playlists })
    }

    pub fn names(&self) -> Vec<String> {
        self.playlists.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.get(name)
    }

    pub fn create(&mut self, name: &str) -> Result<&Playlist, StoreError> {
        validate_name(name)?;
        if self.playlists.contains_key(name) {
            return Err(StoreError::DuplicatePlaylist(name.to_string()));
        }
        let playlist = Playlist {
            name: name.to_string(),
            tracks: Vec::new(),
        };
        write_json_atomic(&self.file_for(name), &playlist)?;
        Ok(self.playlists.entry(name.to_string()).or_insert(playlist))
    }

    pub fn delete(&mut self, name: &str) -> Result<Playlist, StoreError> {
        if !self.playlists.contains_key(name) {
            return Err(StoreError::UnknownPlaylist(name.to_string()));
        }
        fs::remove_file(self.file_for(name))?;
        self.playlists
            .remove(name)
            .ok_or_else(|| StoreError::UnknownPlaylist(name.to_string()))
    }

    pub fn add_track(&mut self, name: &str, id: TrackId) -> Result<(), StoreError> {
        self.update(name, |p| p.tracks.push(id))
    }

    /// Remove the entry at `index`. Out-of-range indices leave the playlist untouched.
    pub fn remove_track(&mut self, name: &str, index: usize) -> Result<Option<TrackId>, StoreError> {
        let mut removed = None;
        self.update(name, |p| {
            if index < p.tracks.len() {
                removed = Some(p.tracks.remove(index));
            }
        })?;
        Ok(removed)
    }

    /// Tracks of a playlist that still exist in the library, in playlist order.
    pub fn resolve(&self, name: &str, library: &Library) -> Result<Vec<Track>, StoreError> {
        let playlist = self
            .get(name)
            .ok_or_else(|| StoreError::UnknownPlaylist(name.to_string()))?;
        Ok(playlist
            .tracks
            .iter()
            .filter_map(|id| library.get(id))
            .collect())
    }

    /// Apply `f` to a copy and keep it only once it is on disk.
    fn update(&mut self, name: &str, f: impl FnOnce(&mut Playlist)) -> Result<(), StoreError> {
        let mut edited = self
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownPlaylist(name.to_string()))?;
        f(&mut edited);
        write_json_atomic(&self.file_for(name), &edited)?;
        self.playlists.insert(name.to_string(), edited);
        Ok(())
    }

    fn file_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let bad = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(StoreError::InvalidPlaylistName(name.to_string()));
    }
    Ok(())
}
