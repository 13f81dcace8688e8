use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, select, tick};

use crate::error::PlaybackError;
use crate::library::Track;

use super::decoder::{StreamClock, decode};
use super::output::Output;
use super::types::{Command, Event, PlaybackState, PlaybackStatus};
use super::volume::{Gain, Scaled, volume_to_db};

/// Engine state shared with readers. Only the command loop writes it.
#[derive(Debug)]
pub(super) struct Transport {
    pub state: PlaybackState,
    pub clock: Option<StreamClock>,
    /// Bumped whenever a stream is loaded or released; tags finish notices.
    pub generation: u64,
}

impl Transport {
    pub fn new(volume: f32) -> Self {
        Self {
            state: PlaybackState {
                volume,
                ..PlaybackState::default()
            },
            clock: None,
            generation: 0,
        }
    }

    pub fn snapshot(&self) -> PlaybackState {
        let mut state = self.state.clone();
        state.position = self.position();
        state
    }

    fn position(&self) -> Duration {
        self.clock
            .as_ref()
            .map(|c| c.position().min(self.state.duration))
            .unwrap_or(Duration::ZERO)
    }
}

pub(super) type TransportHandle = Arc<Mutex<Transport>>;

pub(super) fn lock(transport: &TransportHandle) -> MutexGuard<'_, Transport> {
    transport.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(super) enum Control {
    Command(Command),
    /// Sent by the position loop when the stream of `generation` ran out.
    Finished(u64),
    /// Acknowledged once every earlier message has been applied.
    Flush(Sender<()>),
    Shutdown,
}

/// Event fan-out. Critical events wait for room in each subscriber's buffer
/// until the engine shuts down; position ticks are dropped for subscribers
/// whose buffer is full.
#[derive(Clone)]
pub(super) struct Subscribers {
    senders: Arc<Mutex<Vec<Sender<Event>>>>,
    /// Never sent on; disconnects when the engine shuts down.
    closed: Receiver<()>,
}

impl Subscribers {
    pub fn new(closed: Receiver<()>) -> Self {
        Self {
            senders: Arc::default(),
            closed,
        }
    }

    pub fn add(&self, tx: Sender<Event>) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
    }

    pub fn publish(&self, event: Event) {
        // Deliver outside the lock.
        let senders = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut gone = Vec::new();
        for tx in &senders {
            let delivered = if event.is_critical() {
                select! {
                    send(tx, event.clone()) -> res => res.is_ok(),
                    recv(self.closed) -> _ => {
                        log::debug!("engine closing, dropped {event:?}");
                        true
                    }
                }
            } else {
                !matches!(
                    tx.try_send(event.clone()),
                    Err(TrySendError::Disconnected(_))
                )
            };
            if !delivered {
                gone.push(tx);
            }
        }

        if !gone.is_empty() {
            self.senders
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|tx| !gone.iter().any(|g| g.same_channel(tx)));
        }
    }
}

struct CommandLoop {
    output: Box<dyn Output>,
    transport: TransportHandle,
    subscribers: Subscribers,
    gain: Gain,
}

pub(super) fn spawn_command_loop<F>(
    make_output: F,
    rx: Receiver<Control>,
    transport: TransportHandle,
    subscribers: Subscribers,
    gain: Gain,
) -> JoinHandle<()>
where
    F: FnOnce() -> Box<dyn Output> + Send + 'static,
{
    thread::spawn(move || {
        // Device handles are created on the thread that owns them.
        let mut engine = CommandLoop {
            output: make_output(),
            transport,
            subscribers,
            gain,
        };

        for msg in rx.iter() {
            match msg {
                Control::Command(cmd) => engine.handle(cmd),
                Control::Finished(generation) => engine.finish(generation),
                Control::Flush(ack) => {
                    let _ = ack.send(());
                }
                Control::Shutdown => break,
            }
        }

        engine.output.stop();
        engine.release();
        log::debug!("engine command loop exited");
    })
}

impl CommandLoop {
    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Play(track) => self.play(track),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Stop => self.stop(),
            Command::Seek(target) => self.seek(target),
            Command::SeekBy(secs) => {
                let current = lock(&self.transport).position();
                let target = (current.as_secs_f64() + secs as f64).max(0.0);
                self.seek(Duration::from_secs_f64(target));
            }
            Command::SetVolume(v) => self.set_volume(v),
        }
    }

    fn status(&self) -> PlaybackStatus {
        lock(&self.transport).state.status
    }

    fn play(&mut self, track: Track) {
        // Release the previous stream before opening the next file.
        self.output.stop();

        let stream = match decode(&track.path) {
            Ok(stream) => stream,
            Err(e) => return self.fail(e),
        };

        let total = stream.total();
        let clock = stream.clock();
        self.output
            .start(Scaled::new(stream, self.gain.clone()), false);

        log::info!("playing {} [{}]", track.display(), track.id.short());
        {
            let mut t = lock(&self.transport);
            t.generation += 1;
            t.clock = Some(clock);
            t.state.status = PlaybackStatus::Playing;
            t.state.track = Some(track);
            t.state.duration = total;
        }
        self.subscribers
            .publish(Event::StateChanged(PlaybackStatus::Playing));
    }

    fn pause(&mut self) {
        if self.status() != PlaybackStatus::Playing {
            log::debug!("pause ignored: not playing");
            return;
        }
        self.output.pause();
        lock(&self.transport).state.status = PlaybackStatus::Paused;
        self.subscribers
            .publish(Event::StateChanged(PlaybackStatus::Paused));
    }

    fn resume(&mut self) {
        if self.status() != PlaybackStatus::Paused {
            log::debug!("resume ignored: not paused");
            return;
        }
        self.output.resume();
        lock(&self.transport).state.status = PlaybackStatus::Playing;
        self.subscribers
            .publish(Event::StateChanged(PlaybackStatus::Playing));
    }

    fn stop(&mut self) {
        if self.status() == PlaybackStatus::Stopped {
            return;
        }
        self.output.stop();
        self.release();
        self.subscribers
            .publish(Event::StateChanged(PlaybackStatus::Stopped));
    }

    /// Rebuild the stream at the target frame and swap it into the output.
    fn seek(&mut self, target: Duration) {
        let (track, paused) = {
            let t = lock(&self.transport);
            match (&t.state.track, t.state.status) {
                (Some(track), status) if status != PlaybackStatus::Stopped => {
                    (track.clone(), status == PlaybackStatus::Paused)
                }
                _ => {
                    log::debug!("seek ignored: nothing loaded");
                    return;
                }
            }
        };

        let mut stream = match decode(&track.path) {
            Ok(stream) => stream,
            Err(e) => return self.fail(e),
        };

        let total = stream.total();
        let clamped = target.min(total);
        if clamped != target {
            log::debug!("seek target {target:?} clamped to {total:?}");
        }
        if let Err(e) = stream.seek_to_frame(stream.frame_for(clamped)) {
            return self.fail(e);
        }

        let clock = stream.clock();
        self.output
            .start(Scaled::new(stream, self.gain.clone()), paused);
        {
            let mut t = lock(&self.transport);
            t.generation += 1;
            t.clock = Some(clock);
            t.state.duration = total;
        }
        self.subscribers.publish(Event::PositionUpdate(clamped));
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.gain.set_db(volume_to_db(volume));
        lock(&self.transport).state.volume = volume;
        log::debug!("volume {volume:.2} ({:.1} dB)", self.gain.db());
    }

    fn finish(&mut self, generation: u64) {
        let ended = {
            let t = lock(&self.transport);
            if t.generation != generation || t.state.status != PlaybackStatus::Playing {
                return;
            }
            t.state.track.as_ref().map(|track| track.id.clone())
        };

        self.output.stop();
        self.release();
        if let Some(id) = ended {
            log::info!("track {} ended", id.short());
            self.subscribers.publish(Event::TrackEnded(id));
        }
        self.subscribers
            .publish(Event::StateChanged(PlaybackStatus::Stopped));
    }

    /// Back to `Stopped` after a failed load or seek. Never fatal.
    fn fail(&mut self, err: PlaybackError) {
        log::warn!("playback failed: {err}");
        let was_stopped = self.status() == PlaybackStatus::Stopped;
        self.output.stop();
        self.release();
        self.subscribers.publish(Event::PlaybackFailed(err.to_string()));
        if !was_stopped {
            self.subscribers
                .publish(Event::StateChanged(PlaybackStatus::Stopped));
        }
    }

    fn release(&mut self) {
        let mut t = lock(&self.transport);
        t.generation += 1;
        t.clock = None;
        t.state.status = PlaybackStatus::Stopped;
        t.state.track = None;
        t.state.duration = Duration::ZERO;
    }
}

/// Sample the active stream every `interval`. Exits when `shutdown` is dropped.
pub(super) fn spawn_position_loop(
    transport: TransportHandle,
    subscribers: Subscribers,
    control: Sender<Control>,
    shutdown: Receiver<()>,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let ticker = tick(interval);
        loop {
            let stop = select! {
                recv(ticker) -> _ => false,
                recv(shutdown) -> _ => true,
            };
            if stop {
                break;
            }

            let sample = {
                let t = lock(&transport);
                t.clock.as_ref().map(|clock| {
                    (
                        t.position(),
                        clock.is_finished(),
                        t.state.duration,
                        t.state.status,
                        t.generation,
                    )
                })
            };
            // Nothing loaded: keep ticking, say nothing.
            let Some((position, finished, total, status, generation)) = sample else {
                continue;
            };

            subscribers.publish(Event::PositionUpdate(position));

            if status == PlaybackStatus::Playing && reached_end(finished, position, total) {
                if let Err(TrySendError::Disconnected(_)) =
                    control.try_send(Control::Finished(generation))
                {
                    break;
                }
            }
        }
        log::debug!("engine position loop exited");
    })
}

/// A stream has ended once its source is drained, or once the clock passes a
/// known length. A zero length means the length is unknown.
pub(super) fn reached_end(drained: bool, position: Duration, total: Duration) -> bool {
    drained || (total > Duration::ZERO && position >= total)
}
