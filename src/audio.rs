//! Playback: format dispatch, volume scaling, outputs, the engine loops and
//! the play queue.

mod decoder;
mod engine;
mod output;
mod queue;
mod thread;
mod types;
mod volume;

pub use decoder::{AudioFormat, AudioStream, StreamClock, decode};
pub use engine::{Engine, Player};
pub use output::{NullOutput, Output, Playable, RodioOutput};
pub use queue::{PlayQueue, RepeatMode};
pub use types::{Command, Event, PlaybackState, PlaybackStatus};
pub use volume::{GAIN_FLOOR_DB, Gain, db_to_amplitude, volume_to_db};

#[cfg(test)]
mod tests;
