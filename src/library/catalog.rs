//! In-memory library: tracks keyed by fingerprint plus artist/album/path indices.
//!
//! The scan aggregator writes while the caller reads, so everything sits
//! behind one `RwLock`. Indices are only touched through `Catalog::index` and
//! `Catalog::unindex`, which keeps them consistent with the primary map.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::model::{Track, TrackId};

#[derive(Debug, Default)]
struct Catalog {
    tracks: HashMap<TrackId, Track>,
    by_path: HashMap<PathBuf, TrackId>,
    by_artist: HashMap<String, BTreeSet<TrackId>>,
    by_album: HashMap<String, BTreeSet<TrackId>>,
}

impl Catalog {
    fn insert(&mut self, track: Track) -> Option<Track> {
        // Same file re-scanned with new content: the old fingerprint goes away.
        let stale = self
            .by_path
            .get(&track.path)
            .filter(|id| **id != track.id)
            .cloned();
        let mut replaced = stale.and_then(|id| self.remove(&id));

        if let Some(prev) = self.remove(&track.id) {
            replaced = Some(prev);
        }

        self.index(&track);
        self.tracks.insert(track.id.clone(), track);
        replaced
    }

    fn remove(&mut self, id: &TrackId) -> Option<Track> {
        let track = self.tracks.remove(id)?;
        self.unindex(&track);
        Some(track)
    }

    fn index(&mut self, track: &Track) {
        self.by_path.insert(track.path.clone(), track.id.clone());
        if let Some(artist) = &track.artist {
            self.by_artist
                .entry(artist.clone())
                .or_default()
                .insert(track.id.clone());
        }
        if let Some(album) = &track.album {
            self.by_album
                .entry(album.clone())
                .or_default()
                .insert(track.id.clone());
        }
    }

    fn unindex(&mut self, track: &Track) {
        if self.by_path.get(&track.path) == Some(&track.id) {
            self.by_path.remove(&track.path);
        }
        if let Some(artist) = &track.artist {
            remove_from_index(&mut self.by_artist, artist, &track.id);
        }
        if let Some(album) = &track.album {
            remove_from_index(&mut self.by_album, album, &track.id);
        }
    }

    fn collect(&self, ids: Option<&BTreeSet<TrackId>>) -> Vec<Track> {
        let mut out: Vec<Track> = ids
            .into_iter()
            .flatten()
            .filter_map(|id| self.tracks.get(id).cloned())
            .collect();
        sort_tracks(&mut out);
        out
    }
}

fn remove_from_index(index: &mut HashMap<String, BTreeSet<TrackId>>, key: &str, id: &TrackId) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

fn sort_key(t: &Track) -> (String, String, String, PathBuf) {
    (
        t.artist.as_deref().unwrap_or_default().to_lowercase(),
        t.album.as_deref().unwrap_or_default().to_lowercase(),
        t.title.to_lowercase(),
        t.path.clone(),
    )
}

fn sort_tracks(tracks: &mut [Track]) {
    tracks.sort_by_cached_key(sort_key);
}

/// Shared, lock-protected track collection.
#[derive(Debug, Default)]
pub struct Library {
    inner: RwLock<Catalog>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from a flat list, rebuilding every index.
    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut catalog = Catalog::default();
        for track in tracks {
            catalog.insert(track);
        }
        Self {
            inner: RwLock::new(catalog),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a track. Returns the track it displaced, if any:
    /// either the same fingerprint or a different fingerprint at the same path.
    pub fn insert(&self, track: Track) -> Option<Track> {
        self.write().insert(track)
    }

    pub fn remove(&self, id: &TrackId) -> Option<Track> {
        self.write().remove(id)
    }

    pub fn get(&self, id: &TrackId) -> Option<Track> {
        self.read().tracks.get(id).cloned()
    }

    pub fn id_for_path(&self, path: &Path) -> Option<TrackId> {
        self.read().by_path.get(path).cloned()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.read().tracks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().tracks.is_empty()
    }

    /// Every track, ordered by artist, album, then title (case-insensitive).
    pub fn tracks(&self) -> Vec<Track> {
        let mut out: Vec<Track> = self.read().tracks.values().cloned().collect();
        sort_tracks(&mut out);
        out
    }

    pub fn by_artist(&self, artist: &str) -> Vec<Track> {
        let catalog = self.read();
        catalog.collect(catalog.by_artist.get(artist))
    }

    pub fn by_album(&self, album: &str) -> Vec<Track> {
        let catalog = self.read();
        catalog.collect(catalog.by_album.get(album))
    }

    pub fn artists(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().by_artist.keys().cloned().collect();
        names.sort_by_key(|n| n.to_lowercase());
        names
    }

    pub fn albums(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().by_album.keys().cloned().collect();
        names.sort_by_key(|n| n.to_lowercase());
        names
    }

    /// Case-insensitive substring match over title, artist and album.
    pub fn search(&self, query: &str) -> Vec<Track> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.tracks();
        }

        let matches = |field: Option<&str>| {
            field
                .map(|f| f.to_lowercase().contains(&query))
                .unwrap_or(false)
        };

        let mut out: Vec<Track> = self
            .read()
            .tracks
            .values()
            .filter(|t| {
                matches(Some(&t.title)) || matches(t.artist.as_deref()) || matches(t.album.as_deref())
            })
            .cloned()
            .collect();
        sort_tracks(&mut out);
        out
    }
}
