//! Tag reading behind a trait so the scanner can be driven by test doubles.

use std::path::Path;
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;

use crate::error::MetadataError;

/// Fields read from one file's tags and container properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Duration,
}

pub trait MetadataExtractor: Send + Sync {
    fn read(&self, path: &Path) -> Result<TrackMetadata, MetadataError>;
}

/// Reads tags with `lofty`. Files without tags still succeed as long as the
/// container itself parses; a corrupt container is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyExtractor;

impl MetadataExtractor for LoftyExtractor {
    fn read(&self, path: &Path) -> Result<TrackMetadata, MetadataError> {
        let tagged = lofty::read_from_path(path)?;

        let mut meta = TrackMetadata {
            duration: tagged.properties().duration(),
            ..TrackMetadata::default()
        };

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            meta.title = non_empty(tag.title().as_deref());
            meta.artist = non_empty(tag.artist().as_deref());
            meta.album = non_empty(tag.album().as_deref());
        }

        Ok(meta)
    }
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_drops_blank_values() {
        assert_eq!(non_empty(Some("  Artist ")), Some("Artist".to_string()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn lofty_extractor_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"definitely not a riff container").unwrap();

        assert!(LoftyExtractor.read(&path).is_err());
    }
}
