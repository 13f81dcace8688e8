use std::env;
use std::path::PathBuf;

use crate::audio::{Engine, Player};
use crate::library::{CancelToken, LibraryStore, PlaylistStore, Scanner};

mod autoplay;
mod controls;
mod settings;
mod startup;

pub use autoplay::drive;
pub use controls::ControlCmd;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    startup::init_logging();
    let settings = settings::load_settings();

    let data_dir = startup::prepare_data_dir(&settings).inspect_err(|e| {
        log::error!("cannot prepare data directory: {e}");
    })?;
    log::info!("data directory: {}", data_dir.display());

    let store = LibraryStore::new(data_dir.join("library.json"));
    let library = store.load().inspect_err(|e| {
        log::error!("cannot load {}: {e}", store.path().display());
    })?;
    let playlists = PlaylistStore::open(data_dir.join("playlists"))?;
    log::info!(
        "loaded {} tracks and {} playlists",
        library.len(),
        playlists.names().len()
    );

    let mut roots = settings.library.roots.clone();
    if let Some(dir) = env::args_os().nth(1) {
        roots.push(PathBuf::from(dir));
    }
    if !roots.is_empty() {
        let scanner = Scanner::new(settings.library.clone());
        let report = scanner.scan(&roots, &library, &CancelToken::new());
        log::info!(
            "indexed {} files ({} failed); library holds {} tracks",
            report.tracks.len(),
            report.errors.len(),
            library.len()
        );
        store.save(&library)?;
    }

    let tracks = startup::initial_tracks(&settings, &library, &playlists);
    let mut queue = startup::build_queue(&settings, tracks);
    log::info!(
        "queued {} tracks (repeat {:?}, shuffle {})",
        queue.len(),
        queue.repeat_mode(),
        queue.is_shuffled()
    );

    if !settings.playback.autoplay {
        log::info!("autoplay disabled, exiting");
        store.save(&library)?;
        return Ok(());
    }

    let mut engine = Engine::spawn(&settings.audio);
    let events = engine.subscribe();
    engine.set_volume(settings.audio.volume)?;

    log::info!("commands: q quit, p pause, l next, h prev");
    let controls = controls::spawn_stdin_reader();
    let result = drive(&engine, &events, &controls, &mut queue);
    engine.shutdown();
    store.save(&library)?;
    let started = result?;
    log::info!("played {started} tracks");
    Ok(())
}
