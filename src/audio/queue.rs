//! Play queue: original order, optional shuffle order, cursor and repeat mode.
//!
//! The cursor always indexes the active order (shuffled or not) and is `None`
//! only when the queue is empty. The queue is owned by a single caller and is
//! not synchronized.

use rand::seq::SliceRandom;

use crate::error::QueueError;
use crate::library::Track;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Stop after the last track.
    #[default]
    Off,
    /// Replay the current track when it ends.
    One,
    /// Wrap around to the first track.
    All,
}

impl RepeatMode {
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::One,
            Self::One => Self::All,
            Self::All => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: Vec<Track>,
    /// Permutation of indices into `tracks`; `Some` while shuffled.
    shuffled: Option<Vec<usize>>,
    cursor: Option<usize>,
    repeat: RepeatMode,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents and rewind to the first entry.
    pub fn set(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        if self.shuffled.is_some() {
            let mut order: Vec<usize> = (0..self.tracks.len()).collect();
            order.shuffle(&mut rand::rng());
            self.shuffled = Some(order);
        }
        self.cursor = if self.tracks.is_empty() { None } else { Some(0) };
    }

    /// Add a track after the last entry of both orders.
    pub fn append(&mut self, track: Track) {
        self.tracks.push(track);
        let idx = self.tracks.len() - 1;
        if let Some(order) = self.shuffled.as_mut() {
            order.push(idx);
        }
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycle();
        self.repeat
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled.is_some()
    }

    /// Index into `tracks` for a position in the active order.
    fn track_index(&self, pos: usize) -> usize {
        match &self.shuffled {
            Some(order) => order[pos],
            None => pos,
        }
    }

    fn at(&self, pos: usize) -> &Track {
        &self.tracks[self.track_index(pos)]
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.map(|pos| self.at(pos))
    }

    /// Tracks in the active order.
    pub fn iter(&self) -> impl Iterator<Item = &Track> + '_ {
        (0..self.tracks.len()).map(|pos| self.at(pos))
    }

    pub fn jump_to(&mut self, pos: usize) -> Result<&Track, QueueError> {
        if self.tracks.is_empty() {
            return Err(QueueError::Empty);
        }
        if pos >= self.tracks.len() {
            return Err(QueueError::IndexOutOfRange {
                index: pos,
                len: self.tracks.len(),
            });
        }
        self.cursor = Some(pos);
        Ok(self.at(pos))
    }

    /// Manual skip forward. Moves one entry regardless of `RepeatMode::One`;
    /// past the end it wraps under `All` and otherwise returns `None`, leaving
    /// the cursor on the last entry.
    pub fn next(&mut self) -> Result<Option<&Track>, QueueError> {
        let pos = self.cursor.ok_or(QueueError::Empty)?;
        let next = if pos + 1 < self.tracks.len() {
            pos + 1
        } else if self.repeat == RepeatMode::All {
            0
        } else {
            return Ok(None);
        };
        self.cursor = Some(next);
        Ok(Some(self.at(next)))
    }

    /// Manual skip backward, mirroring `next`: wraps under `All`, otherwise
    /// stays on the first entry and returns `None`.
    pub fn previous(&mut self) -> Result<Option<&Track>, QueueError> {
        let pos = self.cursor.ok_or(QueueError::Empty)?;
        let prev = if pos > 0 {
            pos - 1
        } else if self.repeat == RepeatMode::All {
            self.tracks.len() - 1
        } else {
            return Ok(None);
        };
        self.cursor = Some(prev);
        Ok(Some(self.at(prev)))
    }

    /// What to play after the current track ended on its own. `One` replays
    /// the current track; the other modes behave like `next`.
    pub fn advance_on_end(&mut self) -> Result<Option<&Track>, QueueError> {
        if self.repeat == RepeatMode::One {
            return self.current().map(Some).ok_or(QueueError::Empty);
        }
        self.next()
    }

    /// Shuffle everything, moving the current track to the front so playback
    /// is not interrupted.
    pub fn shuffle(&mut self) {
        let current = self.cursor.map(|pos| self.track_index(pos));
        let mut order: Vec<usize> = (0..self.tracks.len()).collect();
        order.shuffle(&mut rand::rng());

        if let Some(cur) = current {
            if let Some(at) = order.iter().position(|&i| i == cur) {
                order.swap(0, at);
            }
            self.cursor = Some(0);
        }
        self.shuffled = Some(order);
    }

    /// Back to the original order, keeping the cursor on the current track.
    pub fn unshuffle(&mut self) {
        let current = self.cursor.map(|pos| self.track_index(pos));
        self.shuffled = None;
        self.cursor = current;
    }
}
