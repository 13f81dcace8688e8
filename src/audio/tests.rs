use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::Receiver;

use super::*;
use crate::config::AudioSettings;
use crate::error::{PlaybackError, QueueError};
use crate::library::{Track, TrackId};

fn track(n: usize) -> Track {
    Track {
        id: TrackId::new(format!("{n:064x}")),
        path: PathBuf::from(format!("/music/{n}.flac")),
        title: format!("t{n}"),
        artist: None,
        album: None,
        duration: Duration::from_secs(60),
    }
}

fn abc(mode: RepeatMode) -> PlayQueue {
    let mut q = PlayQueue::new();
    q.set(vec![track(0), track(1), track(2)]);
    q.set_repeat_mode(mode);
    q
}

fn title(t: Option<&Track>) -> Option<String> {
    t.map(|t| t.title.clone())
}

#[test]
fn next_at_end_without_repeat_stays_put() {
    let mut q = abc(RepeatMode::Off);
    q.jump_to(2).unwrap();
    assert_eq!(title(q.next().unwrap()), None);
    assert_eq!(q.cursor(), Some(2));
    assert_eq!(title(q.current()), Some("t2".into()));
}

#[test]
fn next_at_end_with_repeat_all_wraps() {
    let mut q = abc(RepeatMode::All);
    q.jump_to(2).unwrap();
    assert_eq!(title(q.next().unwrap()), Some("t0".into()));
    assert_eq!(q.cursor(), Some(0));
}

#[test]
fn previous_mirrors_next() {
    let mut q = abc(RepeatMode::Off);
    assert_eq!(title(q.previous().unwrap()), None);
    assert_eq!(q.cursor(), Some(0));

    q.set_repeat_mode(RepeatMode::All);
    assert_eq!(title(q.previous().unwrap()), Some("t2".into()));
    assert_eq!(title(q.previous().unwrap()), Some("t1".into()));
}

// Deliberate: manual skips always move, repeat-one only applies when a track
// ends by itself.
#[test]
fn repeat_one_only_affects_natural_end() {
    let mut q = abc(RepeatMode::One);
    assert_eq!(title(q.advance_on_end().unwrap()), Some("t0".into()));
    assert_eq!(q.cursor(), Some(0));
    assert_eq!(title(q.next().unwrap()), Some("t1".into()));
    assert_eq!(title(q.advance_on_end().unwrap()), Some("t1".into()));
}

#[test]
fn advance_on_end_follows_next_otherwise() {
    let mut q = abc(RepeatMode::Off);
    assert_eq!(title(q.advance_on_end().unwrap()), Some("t1".into()));
    assert_eq!(title(q.advance_on_end().unwrap()), Some("t2".into()));
    assert_eq!(title(q.advance_on_end().unwrap()), None);
}

#[test]
fn empty_queue_reports_empty() {
    let mut q = PlayQueue::new();
    assert!(q.current().is_none());
    assert_eq!(q.next().unwrap_err(), QueueError::Empty);
    assert_eq!(q.previous().unwrap_err(), QueueError::Empty);
    assert_eq!(q.advance_on_end().unwrap_err(), QueueError::Empty);
    assert_eq!(q.jump_to(0).unwrap_err(), QueueError::Empty);
}

#[test]
fn jump_to_rejects_out_of_range() {
    let mut q = abc(RepeatMode::Off);
    assert_eq!(
        q.jump_to(3).unwrap_err(),
        QueueError::IndexOutOfRange { index: 3, len: 3 }
    );
    assert_eq!(q.cursor(), Some(0));
}

#[test]
fn shuffle_keeps_current_track_and_all_entries() {
    let mut q = abc(RepeatMode::Off);
    q.jump_to(1).unwrap();
    q.shuffle();

    assert!(q.is_shuffled());
    assert_eq!(title(q.current()), Some("t1".into()));
    let mut titles: Vec<String> = q.iter().map(|t| t.title.clone()).collect();
    titles.sort();
    assert_eq!(titles, vec!["t0", "t1", "t2"]);

    q.unshuffle();
    assert!(!q.is_shuffled());
    assert_eq!(q.cursor(), Some(1));
    assert_eq!(title(q.current()), Some("t1".into()));
}

#[test]
fn append_extends_both_orders() {
    let mut q = PlayQueue::new();
    q.append(track(0));
    assert_eq!(q.cursor(), Some(0));
    q.shuffle();
    q.append(track(1));
    assert_eq!(q.len(), 2);
    assert_eq!(title(q.iter().last()), Some("t1".into()));
}

#[test]
fn repeat_mode_cycles() {
    let mut q = PlayQueue::new();
    assert_eq!(q.cycle_repeat_mode(), RepeatMode::One);
    assert_eq!(q.cycle_repeat_mode(), RepeatMode::All);
    assert_eq!(q.cycle_repeat_mode(), RepeatMode::Off);
}

#[test]
fn format_is_picked_by_extension() {
    assert_eq!(AudioFormat::from_path(Path::new("a.MP3")).unwrap(), AudioFormat::Mp3);
    assert_eq!(AudioFormat::from_path(Path::new("a.wav")).unwrap(), AudioFormat::Wav);
    assert_eq!(AudioFormat::from_path(Path::new("a.flac")).unwrap(), AudioFormat::Flac);
    assert!(matches!(
        AudioFormat::from_path(Path::new("a.ogg")),
        Err(PlaybackError::UnsupportedFormat(_))
    ));
    assert!(!AudioFormat::is_supported(Path::new("README")));
}

const RATE: u32 = 8000;

fn write_wav(path: &Path, millis: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..RATE * millis / 1000 {
        let t = i as f32 / RATE as f32;
        let s = (t * 440.0 * std::f32::consts::TAU).sin() * 8000.0;
        w.write_sample(s as i16).unwrap();
    }
    w.finalize().unwrap();
}

fn wav_track(dir: &Path, name: &str, millis: u32) -> Track {
    let path = dir.join(name);
    write_wav(&path, millis);
    Track {
        id: TrackId::new(name),
        path,
        title: name.to_string(),
        artist: None,
        album: None,
        duration: Duration::from_millis(millis as u64),
    }
}

fn silent_engine() -> Engine {
    let settings = AudioSettings {
        position_interval_ms: 20,
        ..AudioSettings::default()
    };
    Engine::with_output(&settings, || Box::new(NullOutput::new()))
}

fn wait_for(events: &Receiver<Event>, pred: impl Fn(&Event) -> bool) -> Event {
    loop {
        let ev = events
            .recv_timeout(Duration::from_secs(5))
            .expect("timed out waiting for engine event");
        if pred(&ev) {
            return ev;
        }
    }
}

#[test]
fn volume_is_echoed_and_clamped() {
    let engine = silent_engine();

    engine.set_volume(0.25).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().volume, 0.25);

    engine.set_volume(3.0).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().volume, 1.0);

    engine.set_volume(-1.0).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().volume, 0.0);

    assert!(matches!(
        engine.set_volume(f32::NAN),
        Err(PlaybackError::InvalidVolume(_))
    ));
}

#[test]
fn stop_twice_and_pause_while_stopped_are_noops() {
    let engine = silent_engine();
    engine.stop().unwrap();
    engine.stop().unwrap();
    engine.pause().unwrap();
    engine.resume().unwrap();
    engine.flush().unwrap();

    let state = engine.state();
    assert_eq!(state.status, PlaybackStatus::Stopped);
    assert!(state.track.is_none());
    assert_eq!(state.position, Duration::ZERO);
}

#[test]
fn play_pause_resume_stop() {
    let dir = tempfile::tempdir().unwrap();
    let t = wav_track(dir.path(), "long.wav", 3000);
    let engine = silent_engine();
    let events = engine.subscribe();

    engine.play(t.clone()).unwrap();
    engine.flush().unwrap();
    let state = engine.state();
    assert_eq!(state.status, PlaybackStatus::Playing);
    assert_eq!(state.track.as_ref().map(|t| &t.id), Some(&t.id));
    assert!((state.duration.as_secs_f64() - 3.0).abs() < 0.05);
    wait_for(&events, |e| *e == Event::StateChanged(PlaybackStatus::Playing));

    engine.pause().unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().status, PlaybackStatus::Paused);

    engine.resume().unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().status, PlaybackStatus::Playing);

    engine.stop().unwrap();
    engine.flush().unwrap();
    let state = engine.state();
    assert_eq!(state.status, PlaybackStatus::Stopped);
    assert!(state.track.is_none());
    wait_for(&events, |e| *e == Event::StateChanged(PlaybackStatus::Stopped));
}

#[test]
fn seek_clamps_to_track_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let t = wav_track(dir.path(), "seek.wav", 2000);
    let engine = silent_engine();

    engine.play(t).unwrap();
    engine.pause().unwrap();

    engine.seek(Duration::from_secs(600)).unwrap();
    engine.flush().unwrap();
    let state = engine.state();
    assert_eq!(state.status, PlaybackStatus::Paused);
    assert!(state.duration.saturating_sub(state.position) < Duration::from_millis(5));

    engine.seek_by(-30).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().position, Duration::ZERO);

    engine.seek(Duration::from_millis(500)).unwrap();
    engine.flush().unwrap();
    let pos = engine.state().position.as_secs_f64();
    assert!((pos - 0.5).abs() < 0.01, "position {pos}");
}

#[test]
fn seek_while_stopped_is_ignored() {
    let engine = silent_engine();
    engine.seek(Duration::from_secs(1)).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().status, PlaybackStatus::Stopped);
}

#[test]
fn short_track_plays_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let t = wav_track(dir.path(), "blip.wav", 150);
    let engine = silent_engine();
    let events = engine.subscribe();

    engine.play(t.clone()).unwrap();
    let ended = wait_for(&events, |e| matches!(e, Event::TrackEnded(_)));
    assert_eq!(ended, Event::TrackEnded(t.id));
    wait_for(&events, |e| *e == Event::StateChanged(PlaybackStatus::Stopped));
    assert_eq!(engine.state().status, PlaybackStatus::Stopped);
}

#[test]
fn unsupported_or_corrupt_files_fail_without_killing_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let engine = silent_engine();
    let events = engine.subscribe();

    let ogg = dir.path().join("song.ogg");
    std::fs::write(&ogg, b"OggS").unwrap();
    let mut bad = wav_track(dir.path(), "bad.wav", 10);
    bad.path = ogg;
    engine.play(bad).unwrap();
    wait_for(&events, |e| matches!(e, Event::PlaybackFailed(_)));
    engine.flush().unwrap();
    assert_eq!(engine.state().status, PlaybackStatus::Stopped);

    let garbage = dir.path().join("garbage.wav");
    std::fs::write(&garbage, b"definitely not a riff header").unwrap();
    let mut corrupt = wav_track(dir.path(), "corrupt.wav", 10);
    corrupt.path = garbage;
    engine.play(corrupt).unwrap();
    wait_for(&events, |e| matches!(e, Event::PlaybackFailed(_)));

    let good = wav_track(dir.path(), "good.wav", 1000);
    engine.play(good).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.state().status, PlaybackStatus::Playing);
}

#[test]
fn engine_shutdown_is_idempotent() {
    let mut engine = silent_engine();
    engine.shutdown();
    engine.shutdown();
    assert!(matches!(engine.stop(), Err(PlaybackError::EngineClosed)));
}

#[test]
fn play_replaces_current_track_without_ending_it() {
    let dir = tempfile::tempdir().unwrap();
    let a = wav_track(dir.path(), "a.wav", 3000);
    let b = wav_track(dir.path(), "b.wav", 3000);
    let engine = silent_engine();
    let events = engine.subscribe();

    engine.play(a.clone()).unwrap();
    wait_for(&events, |e| matches!(e, Event::PositionUpdate(_)));
    engine.play(b.clone()).unwrap();
    engine.flush().unwrap();

    let state = engine.state();
    assert_eq!(state.status, PlaybackStatus::Playing);
    assert_eq!(state.track.map(|t| t.id), Some(b.id));

    std::thread::sleep(Duration::from_millis(100));
    let ended: Vec<Event> = events
        .try_iter()
        .filter(|e| matches!(e, Event::TrackEnded(_)))
        .collect();
    assert!(ended.is_empty(), "unexpected {ended:?}");
}

#[test]
fn no_position_updates_while_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let t = wav_track(dir.path(), "tick.wav", 3000);
    let engine = silent_engine();
    let events = engine.subscribe();

    engine.play(t).unwrap();
    wait_for(&events, |e| matches!(e, Event::PositionUpdate(_)));
    engine.stop().unwrap();
    engine.flush().unwrap();

    // Let an in-flight tick land, then expect silence.
    std::thread::sleep(Duration::from_millis(50));
    events.try_iter().for_each(drop);
    std::thread::sleep(Duration::from_millis(150));
    assert!(
        !events
            .try_iter()
            .any(|e| matches!(e, Event::PositionUpdate(_)))
    );
}

#[test]
fn stale_finish_notice_is_ignored() {
    use std::sync::{Arc, Mutex};

    use crossbeam_channel::{bounded, unbounded};

    use super::thread::{Control, Subscribers, Transport, lock, spawn_command_loop};

    let dir = tempfile::tempdir().unwrap();
    let a = wav_track(dir.path(), "a.wav", 2000);
    let b = wav_track(dir.path(), "b.wav", 2000);

    let (closed_tx, closed_rx) = bounded::<()>(1);
    let subscribers = Subscribers::new(closed_rx);
    let (event_tx, events) = unbounded();
    subscribers.add(event_tx);
    let transport = Arc::new(Mutex::new(Transport::new(1.0)));
    let (control, rx) = unbounded();
    let handle = spawn_command_loop(
        || Box::new(NullOutput::new()),
        rx,
        transport.clone(),
        subscribers,
        Gain::new(1.0),
    );
    let flush = || {
        let (ack_tx, ack_rx) = bounded(1);
        control.send(Control::Flush(ack_tx)).unwrap();
        ack_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    };

    control.send(Control::Command(Command::Play(a))).unwrap();
    flush();
    let stale = lock(&transport).generation;

    control.send(Control::Command(Command::Play(b.clone()))).unwrap();
    flush();
    control.send(Control::Finished(stale)).unwrap();
    flush();
    {
        let t = lock(&transport);
        assert_eq!(t.state.status, PlaybackStatus::Playing);
        assert_eq!(t.state.track.as_ref().map(|t| &t.id), Some(&b.id));
    }
    assert!(!events.try_iter().any(|e| matches!(e, Event::TrackEnded(_))));

    let current = lock(&transport).generation;
    control.send(Control::Finished(current)).unwrap();
    flush();
    let ended: Vec<Event> = events
        .try_iter()
        .filter(|e| matches!(e, Event::TrackEnded(_)))
        .collect();
    assert_eq!(ended, vec![Event::TrackEnded(b.id)]);

    drop(closed_tx);
    control.send(Control::Shutdown).unwrap();
    handle.join().unwrap();
}

#[test]
fn engine_drop_is_not_blocked_by_an_idle_subscriber() {
    let dir = tempfile::tempdir().unwrap();
    let t = wav_track(dir.path(), "blip.wav", 100);
    let settings = AudioSettings {
        position_interval_ms: 20,
        event_capacity: 1,
        ..AudioSettings::default()
    };
    let engine = Engine::with_output(&settings, || Box::new(NullOutput::new()));
    let events = engine.subscribe();

    engine.play(t).unwrap();
    // The track ends while the full buffer holds an older event.
    std::thread::sleep(Duration::from_millis(400));

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        drop(engine);
        let _ = done_tx.send(());
    });
    assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    drop(events);
}

#[test]
fn unknown_length_does_not_end_a_stream_early() {
    use super::thread::reached_end;

    let zero = Duration::ZERO;
    let second = Duration::from_secs(1);
    assert!(!reached_end(false, zero, zero));
    assert!(!reached_end(false, Duration::from_millis(300), zero));
    assert!(reached_end(true, zero, zero));
    assert!(!reached_end(false, Duration::from_millis(999), second));
    assert!(reached_end(false, second, second));
}
