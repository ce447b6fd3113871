//! Output audio: gapless speech scheduling and spatial warning cues.
//!
//! All sources are placed on a single output clock owned by an
//! [`AudioSink`]. The [`scheduler::PlaybackScheduler`] queues speech
//! back-to-back on the centre channel; [`cue::SpatialCues`] fires short
//! warning tones on the left or right channel independently of speech.

pub mod cue;
pub mod mixer;
pub mod scheduler;

#[cfg(feature = "playback")]
pub mod cpal_output;

use crate::pcm::PcmError;
use std::sync::Arc;

pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

pub type SourceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialChannel {
    Left,
    Center,
    Right,
}

impl SpatialChannel {
    /// Stereo pan position in [-1, 1].
    pub fn pan(self) -> f32 {
        match self {
            SpatialChannel::Left => -1.0,
            SpatialChannel::Center => 0.0,
            SpatialChannel::Right => 1.0,
        }
    }
}

/// Mono audio to be started at an absolute time on the output clock.
#[derive(Debug, Clone)]
pub struct PlaybackSource {
    pub start_time: f64,
    pub channel: SpatialChannel,
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

impl PlaybackSource {
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// An output device with a monotonic clock in seconds.
pub trait AudioSink: Send + Sync {
    fn current_time(&self) -> f64;

    /// Schedules `source`. Start times in the past play immediately.
    fn start(&self, source: PlaybackSource) -> SourceId;

    /// Silences a source. Unknown or finished ids are ignored.
    fn stop(&self, id: SourceId);

    fn stop_all(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("undecodable audio chunk: {0}")]
    Decode(#[from] PcmError),

    #[error("output device error: {0}")]
    Device(String),
}
