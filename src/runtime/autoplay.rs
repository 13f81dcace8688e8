use crossbeam_channel::{Receiver, never, select};

use crate::audio::{Event, PlayQueue, PlaybackStatus, Player};
use crate::error::PlaybackError;

use super::controls::ControlCmd;

enum Wake {
    Event(Event),
    EngineGone,
    Control(ControlCmd),
    ControlsClosed,
}

/// Play the queue from its cursor until it runs out or a quit is requested.
///
/// A natural end advances with `advance_on_end` (so repeat modes apply); a
/// failed track is skipped with `next`. Once as many tracks in a row have
/// failed as the queue holds, the driver gives up. `controls` may close at
/// any time; playback then continues on events alone. Returns how many
/// tracks were started.
pub fn drive<P: Player>(
    player: &P,
    events: &Receiver<Event>,
    controls: &Receiver<ControlCmd>,
    queue: &mut PlayQueue,
) -> Result<usize, PlaybackError> {
    let Some(first) = queue.current().cloned() else {
        log::info!("nothing queued");
        return Ok(0);
    };

    log::info!("playing {}", first.display());
    player.play(first)?;
    let mut started = 1;
    let mut failures = 0;
    let mut controls = controls.clone();

    loop {
        let wake = select! {
            recv(events) -> ev => ev.map_or(Wake::EngineGone, Wake::Event),
            recv(controls) -> cmd => cmd.map_or(Wake::ControlsClosed, Wake::Control),
        };

        let next = match wake {
            Wake::EngineGone => return Err(PlaybackError::EngineClosed),
            Wake::ControlsClosed => {
                log::debug!("control input closed");
                controls = never();
                continue;
            }
            Wake::Control(ControlCmd::Quit) => {
                log::info!("quit requested");
                player.stop()?;
                return Ok(started);
            }
            Wake::Control(ControlCmd::PlayPause) => {
                match player.state().status {
                    PlaybackStatus::Playing => player.pause()?,
                    PlaybackStatus::Paused => player.resume()?,
                    PlaybackStatus::Stopped => log::debug!("nothing to pause"),
                }
                continue;
            }
            Wake::Control(cmd @ (ControlCmd::Next | ControlCmd::Prev)) => {
                let moved = if cmd == ControlCmd::Next {
                    queue.next()
                } else {
                    queue.previous()
                };
                match moved {
                    Ok(Some(track)) => {
                        let track = track.clone();
                        log::info!("playing {}", track.display());
                        player.play(track)?;
                        started += 1;
                        failures = 0;
                    }
                    Ok(None) | Err(_) => log::info!("no track that way"),
                }
                continue;
            }
            Wake::Event(Event::TrackEnded(id)) => {
                if queue.current().map(|t| &t.id) != Some(&id) {
                    log::debug!("ignoring end of {}", id.short());
                    continue;
                }
                failures = 0;
                queue.advance_on_end()
            }
            Wake::Event(Event::PlaybackFailed(reason)) => {
                failures += 1;
                log::warn!("skipping track: {reason}");
                if failures >= queue.len() {
                    log::warn!("{failures} tracks failed in a row, giving up");
                    return Ok(started);
                }
                queue.next()
            }
            Wake::Event(Event::StateChanged(status)) => {
                log::debug!("engine {status:?}");
                continue;
            }
            Wake::Event(Event::PositionUpdate(_)) => continue,
        };

        match next {
            Ok(Some(track)) => {
                let track = track.clone();
                log::info!("playing {}", track.display());
                player.play(track)?;
                started += 1;
            }
            Ok(None) | Err(_) => {
                log::info!("end of queue");
                return Ok(started);
            }
        }
    }
}
