//! Library: track model, content fingerprints, tag reading, the worker-pool
//! scanner and JSON persistence for the library and playlists.

mod catalog;
mod fingerprint;
mod metadata;
mod model;
mod playlist;
mod scan;
mod store;

pub use catalog::Library;
pub use fingerprint::fingerprint;
pub use metadata::{LoftyExtractor, MetadataExtractor, TrackMetadata};
pub use model::{Track, TrackId};
pub use playlist::{Playlist, PlaylistStore};
pub use scan::{CancelToken, ScanReport, Scanner};
pub use store::LibraryStore;
