//! Format dispatch and the seekable stream handed to the output.
//!
//! `decode` picks a decoder strictly from the lowercase file extension. The
//! returned `AudioStream` counts the samples it yields into a `StreamClock`,
//! so the position loop can follow playback without touching the stream.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use lofty::file::AudioFile;
use rodio::{Decoder, Source};

use crate::error::PlaybackError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Result<Self, PlaybackError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "flac" => Ok(Self::Flac),
            _ => Err(PlaybackError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                ext
            })),
        }
    }

    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

/// Playback position of one stream, shared between the output and the
/// position loop.
#[derive(Debug, Clone)]
pub struct StreamClock {
    samples: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
}

impl StreamClock {
    fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    pub fn position(&self) -> Duration {
        let frames = self.samples.load(Ordering::Relaxed) / self.channels as u64;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    /// Set once the decoder has no more samples.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    fn set_frame(&self, frame: u64) {
        self.samples
            .store(frame * self.channels as u64, Ordering::Relaxed);
    }
}

/// A decoded file: a forward iterator of interleaved samples that can be
/// repositioned by frame offset.
pub struct AudioStream {
    inner: Decoder<BufReader<File>>,
    format: AudioFormat,
    sample_rate: u32,
    channels: u16,
    total: Duration,
    clock: StreamClock,
}

impl AudioStream {
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn clock(&self) -> StreamClock {
        self.clock.clone()
    }

    /// Frame offset for `target`, rounded to the nearest frame.
    pub fn frame_for(&self, target: Duration) -> u64 {
        (target.as_secs_f64() * self.sample_rate as f64).round() as u64
    }

    /// Reposition to `frame`. Falls back to decoding forward when the
    /// underlying decoder cannot seek.
    pub fn seek_to_frame(&mut self, frame: u64) -> Result<(), PlaybackError> {
        let target = Duration::from_secs_f64(frame as f64 / self.sample_rate as f64);
        if let Err(e) = self.inner.try_seek(target) {
            log::debug!("decoder seek failed ({e}), skipping forward instead");
            let wanted = frame * self.channels as u64;
            let mut consumed = 0u64;
            while consumed < wanted {
                if self.inner.next().is_none() {
                    break;
                }
                consumed += 1;
            }
        }
        self.clock.set_frame(frame);
        Ok(())
    }
}

impl Iterator for AudioStream {
    type Item = rodio::Sample;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some(sample) => {
                self.clock.samples.fetch_add(1, Ordering::Relaxed);
                Some(sample)
            }
            None => {
                self.clock.finished.store(true, Ordering::Relaxed);
                None
            }
        }
    }
}

impl Source for AudioStream {
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> rodio::ChannelCount {
        self.channels
    }

    fn sample_rate(&self) -> rodio::SampleRate {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.total)
    }
}

/// Open `path` and build the decoder matching its extension.
pub fn decode(path: &Path) -> Result<AudioStream, PlaybackError> {
    let format = AudioFormat::from_path(path)?;
    let file = File::open(path).map_err(|e| PlaybackError::decode(path, e))?;
    let reader = BufReader::new(file);

    let inner = match format {
        AudioFormat::Mp3 => Decoder::new_mp3(reader),
        AudioFormat::Wav => Decoder::new_wav(reader),
        AudioFormat::Flac => Decoder::new_flac(reader),
    }
    .map_err(|e| PlaybackError::decode(path, e))?;

    let sample_rate = inner.sample_rate();
    let channels = inner.channels();
    if sample_rate == 0 || channels == 0 {
        return Err(PlaybackError::decode(path, "stream reports no audio channels"));
    }

    let total = match inner.total_duration() {
        Some(total) => total,
        None => container_duration(path)?,
    };

    Ok(AudioStream {
        inner,
        format,
        sample_rate,
        channels,
        total,
        clock: StreamClock::new(sample_rate, channels),
    })
}

// Some mp3 streams carry no frame count; ask the container instead.
fn container_duration(path: &Path) -> Result<Duration, PlaybackError> {
    lofty::read_from_path(path)
        .map(|tagged| tagged.properties().duration())
        .map_err(|e| PlaybackError::decode(path, format!("unknown stream length: {e}")))
}
