use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use walkdir::WalkDir;

use crate::audio::AudioFormat;
use crate::config::LibrarySettings;
use crate::error::ScanError;

use super::catalog::Library;
use super::fingerprint::fingerprint;
use super::metadata::{LoftyExtractor, MetadataExtractor};
use super::model::Track;

/// Cooperative cancellation flag, checked between units of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a scan produced. Tracks are listed in completion order.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub tracks: Vec<Track>,
    pub errors: Vec<ScanError>,
    pub cancelled: bool,
}

enum Outcome {
    Indexed(Track),
    Failed(ScanError),
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

pub struct Scanner {
    settings: LibrarySettings,
    extractor: Arc<dyn MetadataExtractor>,
}

impl Scanner {
    pub fn new(settings: LibrarySettings) -> Self {
        Self::with_extractor(settings, Arc::new(LoftyExtractor))
    }

    pub fn with_extractor(settings: LibrarySettings, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self {
            settings,
            extractor,
        }
    }

    /// Fingerprint and read one file. Shared by full scans and single adds.
    pub fn scan_file(&self, path: &Path) -> Result<Track, ScanError> {
        let id = fingerprint(path).map_err(|e| ScanError::new(path, e))?;
        let meta = self
            .extractor
            .read(path)
            .map_err(|e| ScanError::new(path, e))?;

        let title = meta.title.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("UNKNOWN")
                .to_string()
        });

        Ok(Track {
            id,
            path: path.to_path_buf(),
            title,
            artist: meta.artist,
            album: meta.album,
            duration: meta.duration,
        })
    }

    /// Index a single file outside a full scan.
    pub fn add_file(&self, path: &Path, library: &Library) -> Result<Track, ScanError> {
        AudioFormat::from_path(path).map_err(|e| ScanError::new(path, e))?;
        let track = self.scan_file(path)?;
        if let Some(prev) = library.insert(track.clone()) {
            log::debug!("replaced {} ({})", prev.id.short(), prev.path.display());
        }
        Ok(track)
    }

    /// Walk `roots`, extract every audio file on the worker pool and insert
    /// the results into `library`. Per-file failures are collected; the scan
    /// always runs to completion or cancellation.
    pub fn scan(&self, roots: &[PathBuf], library: &Library, cancel: &CancelToken) -> ScanReport {
        let workers = self.settings.workers.max(1);
        let (path_tx, path_rx) = bounded::<PathBuf>(self.settings.queue_capacity.max(1));
        let (result_tx, result_rx) = unbounded::<Outcome>();
        let mut report = ScanReport::default();

        log::info!("scanning {} root(s) with {workers} workers", roots.len());

        thread::scope(|s| {
            let failures = result_tx.clone();
            s.spawn(move || self.discover(roots, path_tx, failures, cancel));

            for n in 0..workers {
                let rx = path_rx.clone();
                let tx = result_tx.clone();
                s.spawn(move || self.work(n, rx, tx, cancel));
            }
            // Only the threads hold channel ends now, so `iter` ends with them.
            drop(path_rx);
            drop(result_tx);

            for outcome in result_rx.iter() {
                match outcome {
                    Outcome::Indexed(track) => {
                        if let Some(prev) = library.insert(track.clone()) {
                            if prev.path != track.path {
                                log::info!(
                                    "{} moved: {} -> {}",
                                    track.id.short(),
                                    prev.path.display(),
                                    track.path.display()
                                );
                            }
                        }
                        report.tracks.push(track);
                    }
                    Outcome::Failed(err) => {
                        log::warn!("scan: {err}");
                        report.errors.push(err);
                    }
                }
            }
        });

        report.cancelled = cancel.is_cancelled();
        log::info!(
            "scan {}: {} tracks, {} errors",
            if report.cancelled { "cancelled" } else { "finished" },
            report.tracks.len(),
            report.errors.len()
        );
        report
    }

    fn discover(
        &self,
        roots: &[PathBuf],
        paths: Sender<PathBuf>,
        failures: Sender<Outcome>,
        cancel: &CancelToken,
    ) {
        for root in roots {
            if !root.is_dir() {
                let _ = failures.send(Outcome::Failed(ScanError::new(root, "not a directory")));
                continue;
            }

            let mut walker = WalkDir::new(root).follow_links(self.settings.follow_links);
            if let Some(d) = self.settings.max_depth {
                walker = walker.max_depth(d);
            }

            let include_hidden = self.settings.include_hidden;
            for entry in walker
                .into_iter()
                .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e.path()))
            {
                if cancel.is_cancelled() {
                    log::debug!("discovery cancelled");
                    return;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                        let _ = failures.send(Outcome::Failed(ScanError::new(path, e)));
                        continue;
                    }
                };

                let path = entry.path();
                if path.is_file() && AudioFormat::is_supported(path) {
                    // Every worker is gone: nothing left to feed.
                    if paths.send(path.to_path_buf()).is_err() {
                        return;
                    }
                }
            }
        }
    }

    fn work(&self, n: usize, paths: Receiver<PathBuf>, results: Sender<Outcome>, cancel: &CancelToken) {
        loop {
            if cancel.is_cancelled() {
                log::debug!("worker {n} cancelled");
                return;
            }
            let Ok(path) = paths.recv() else {
                return;
            };

            let outcome = match self.scan_file(&path) {
                Ok(track) => Outcome::Indexed(track),
                Err(e) => Outcome::Failed(e),
            };
            if results.send(outcome).is_err() {
                return;
            }
        }
    }
}
