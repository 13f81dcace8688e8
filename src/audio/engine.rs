use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::config::AudioSettings;
use crate::error::PlaybackError;
use crate::library::Track;

use super::output::{NullOutput, Output, RodioOutput};
use super::thread::{
    Control, Subscribers, Transport, TransportHandle, lock, spawn_command_loop,
    spawn_position_loop,
};
use super::types::{Command, Event, PlaybackState};
use super::volume::Gain;

/// Anything that can be driven like a player: the real engine or a test double.
pub trait Player {
    fn play(&self, track: Track) -> Result<(), PlaybackError>;
    fn pause(&self) -> Result<(), PlaybackError>;
    fn resume(&self) -> Result<(), PlaybackError>;
    fn stop(&self) -> Result<(), PlaybackError>;
    fn seek(&self, position: Duration) -> Result<(), PlaybackError>;
    fn seek_by(&self, secs: i64) -> Result<(), PlaybackError>;
    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError>;
    fn state(&self) -> PlaybackState;
}

/// Handle to the playback engine's command and position loops.
///
/// Commands are queued and applied in order by a single thread; the methods
/// return as soon as the command is queued. Dropping the handle shuts both
/// loops down.
pub struct Engine {
    control: Sender<Control>,
    transport: TransportHandle,
    subscribers: Subscribers,
    event_capacity: usize,
    shutdown: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Start the engine on the default audio device, or on a silent output
    /// when no device can be opened.
    pub fn spawn(settings: &AudioSettings) -> Self {
        Self::with_output(settings, || match RodioOutput::open_default() {
            Ok(output) => Box::new(output) as Box<dyn Output>,
            Err(e) => {
                log::warn!("{e}; continuing with silent output");
                Box::new(NullOutput::new())
            }
        })
    }

    pub fn with_output<F>(settings: &AudioSettings, make_output: F) -> Self
    where
        F: FnOnce() -> Box<dyn Output> + Send + 'static,
    {
        let volume = settings.volume.clamp(0.0, 1.0);
        let (control_tx, control_rx) = bounded::<Control>(settings.command_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let transport: TransportHandle = Arc::new(Mutex::new(Transport::new(volume)));
        let subscribers = Subscribers::new(shutdown_rx.clone());

        let command = spawn_command_loop(
            make_output,
            control_rx,
            transport.clone(),
            subscribers.clone(),
            Gain::new(volume),
        );
        let position = spawn_position_loop(
            transport.clone(),
            subscribers.clone(),
            control_tx.clone(),
            shutdown_rx,
            Duration::from_millis(settings.position_interval_ms.max(1)),
        );

        Self {
            control: control_tx,
            transport,
            subscribers,
            event_capacity: settings.event_capacity.max(1),
            shutdown: Some(shutdown_tx),
            threads: vec![command, position],
        }
    }

    /// New event subscription. Each receiver gets every event from now on.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = bounded(self.event_capacity);
        self.subscribers.add(tx);
        rx
    }

    pub fn send(&self, cmd: Command) -> Result<(), PlaybackError> {
        self.control
            .send(Control::Command(cmd))
            .map_err(|_| PlaybackError::EngineClosed)
    }

    /// Block until every command queued before this call has been applied.
    pub fn flush(&self) -> Result<(), PlaybackError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.control
            .send(Control::Flush(ack_tx))
            .map_err(|_| PlaybackError::EngineClosed)?;
        ack_rx.recv().map_err(|_| PlaybackError::EngineClosed)
    }

    pub fn shutdown(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        drop(shutdown);
        let _ = self.control.send(Control::Shutdown);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        log::info!("playback engine stopped");
    }
}

impl Player for Engine {
    fn play(&self, track: Track) -> Result<(), PlaybackError> {
        self.send(Command::Play(track))
    }

    fn pause(&self) -> Result<(), PlaybackError> {
        self.send(Command::Pause)
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        self.send(Command::Resume)
    }

    fn stop(&self) -> Result<(), PlaybackError> {
        self.send(Command::Stop)
    }

    fn seek(&self, position: Duration) -> Result<(), PlaybackError> {
        self.send(Command::Seek(position))
    }

    fn seek_by(&self, secs: i64) -> Result<(), PlaybackError> {
        self.send(Command::SeekBy(secs))
    }

    /// Out-of-range values are clamped; only NaN is rejected.
    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        if volume.is_nan() {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.send(Command::SetVolume(volume.clamp(0.0, 1.0)))
    }

    fn state(&self) -> PlaybackState {
        lock(&self.transport).snapshot()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
