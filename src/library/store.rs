use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StoreError;

use super::catalog::Library;
use super::model::{Track, TrackId};

/// JSON persistence for the library: one object mapping fingerprint to track.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
}

impl LibraryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted library. A missing file is an empty library.
    pub fn load(&self) -> Result<Library, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("no library at {}, starting empty", self.path.display());
                return Ok(Library::new());
            }
            Err(e) => return Err(e.into()),
        };

        let doc: BTreeMap<TrackId, Track> = serde_json::from_slice(&raw)?;
        log::info!("loaded {} tracks from {}", doc.len(), self.path.display());
        Ok(Library::from_tracks(doc.into_values()))
    }

    pub fn save(&self, library: &Library) -> Result<(), StoreError> {
        let doc: BTreeMap<TrackId, Track> = library
            .tracks()
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        write_json_atomic(&self.path, &doc)?;
        log::info!("saved {} tracks to {}", doc.len(), self.path.display());
        Ok(())
    }
}

/// Whole-file overwrite: write a sibling temp file, then rename over the target.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let data = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
