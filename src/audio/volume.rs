//! Volume scaling layer.
//!
//! Volume is exposed to callers as a linear fraction in `[0, 1]`, stored as a
//! gain in decibels and turned back into an amplitude factor per sample.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rodio::Source;

/// Gain applied for a volume of exactly zero. Anything at or below it is silence.
pub const GAIN_FLOOR_DB: f32 = -96.0;

/// Linear amplitude to decibels, floored at `GAIN_FLOOR_DB`.
pub fn volume_to_db(volume: f32) -> f32 {
    let v = volume.clamp(0.0, 1.0);
    if v <= 0.0 {
        return GAIN_FLOOR_DB;
    }
    (20.0 * v.log10()).max(GAIN_FLOOR_DB)
}

pub fn db_to_amplitude(db: f32) -> f32 {
    if db <= GAIN_FLOOR_DB {
        0.0
    } else {
        10f32.powf(db / 20.0)
    }
}

/// Shared gain knob. Cloned into every stream so a change applies immediately.
#[derive(Debug, Clone)]
pub struct Gain {
    db_bits: Arc<AtomicU32>,
}

impl Gain {
    pub fn new(volume: f32) -> Self {
        Self {
            db_bits: Arc::new(AtomicU32::new(volume_to_db(volume).to_bits())),
        }
    }

    pub fn set_db(&self, db: f32) {
        self.db_bits.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn db(&self) -> f32 {
        f32::from_bits(self.db_bits.load(Ordering::Relaxed))
    }

    pub fn amplitude(&self) -> f32 {
        db_to_amplitude(self.db())
    }
}

/// Wraps a source and multiplies every sample by the current gain.
pub struct Scaled<S> {
    inner: S,
    gain: Gain,
}

impl<S> Scaled<S> {
    pub fn new(inner: S, gain: Gain) -> Self {
        Self { inner, gain }
    }
}

impl<S: Source> Iterator for Scaled<S> {
    type Item = rodio::Sample;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|s| s * self.gain.amplitude())
    }
}

impl<S: Source> Source for Scaled<S> {
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> rodio::ChannelCount {
        self.inner.channels()
    }

    fn sample_rate(&self) -> rodio::SampleRate {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
