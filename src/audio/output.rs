//! Where decoded audio goes.
//!
//! `RodioOutput` plays through the default device with one `rodio::Sink` per
//! loaded stream. `NullOutput` pulls samples at real-time pace without a
//! device, which keeps the stream clock moving on headless hosts and in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::PlaybackError;

use super::decoder::AudioStream;
use super::volume::Scaled;

/// A decoded stream behind the volume layer, ready for an output.
pub type Playable = Scaled<AudioStream>;

/// Sink abstraction driven by the engine's command loop.
pub trait Output {
    /// Replace whatever is playing with `source`, optionally starting paused.
    fn start(&mut self, source: Playable, paused: bool);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Drop the current source, releasing its file handle.
    fn stop(&mut self);
}

pub struct RodioOutput {
    stream: OutputStream,
    sink: Option<Sink>,
}

impl RodioOutput {
    pub fn open_default() -> Result<Self, PlaybackError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::Output(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped.
        stream.log_on_drop(false);
        Ok(Self { stream, sink: None })
    }
}

impl Output for RodioOutput {
    fn start(&mut self, source: Playable, paused: bool) {
        self.stop();
        let sink = Sink::connect_new(self.stream.mixer());
        if paused {
            sink.pause();
        }
        sink.append(source);
        self.sink = Some(sink);
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

const NULL_TICK: Duration = Duration::from_millis(10);

struct Drain {
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Deviceless output that consumes samples in real time.
#[derive(Default)]
pub struct NullOutput {
    current: Option<Drain>,
}

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Output for NullOutput {
    fn start(&mut self, mut source: Playable, paused: bool) {
        self.stop();

        let paused = Arc::new(AtomicBool::new(paused));
        let stopped = Arc::new(AtomicBool::new(false));
        let per_tick = (source.sample_rate() as usize * source.channels() as usize / 100).max(1);

        let (p, s) = (paused.clone(), stopped.clone());
        let handle = thread::spawn(move || {
            while !s.load(Ordering::Relaxed) {
                if !p.load(Ordering::Relaxed) {
                    for _ in 0..per_tick {
                        if source.next().is_none() {
                            return;
                        }
                    }
                }
                thread::sleep(NULL_TICK);
            }
        });

        self.current = Some(Drain {
            paused,
            stopped,
            handle,
        });
    }

    fn pause(&mut self) {
        if let Some(d) = &self.current {
            d.paused.store(true, Ordering::Relaxed);
        }
    }

    fn resume(&mut self) {
        if let Some(d) = &self.current {
            d.paused.store(false, Ordering::Relaxed);
        }
    }

    fn stop(&mut self) {
        if let Some(d) = self.current.take() {
            d.stopped.store(true, Ordering::Relaxed);
            let _ = d.handle.join();
        }
    }
}

impl Drop for NullOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
