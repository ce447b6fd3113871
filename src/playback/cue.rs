//! Spatial warning tones for obstacle alerts.

use super::{AudioSink, PlaybackSource, SpatialChannel};
use std::sync::Arc;
use tracing::debug;

const CUE_START_HZ: f64 = 400.0;
const CUE_END_HZ: f64 = 200.0;
const CUE_START_GAIN: f64 = 0.3;
const CUE_END_GAIN: f64 = 0.01;
/// Length of the frequency and gain ramps.
const CUE_RAMP_SECS: f64 = 0.2;
const CUE_LENGTH_SECS: f64 = 0.25;

/// Renders the warning tone: a sawtooth sweeping down an octave with an
/// exponential decay, both ramps lasting 200 ms, cut off at 250 ms.
pub fn warning_tone(sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f64;
    let len = (CUE_LENGTH_SECS * sr).round() as usize;
    let mut out = Vec::with_capacity(len);
    let mut phase = 0.0f64;

    for n in 0..len {
        let t = n as f64 / sr;
        let ramp = (t / CUE_RAMP_SECS).min(1.0);
        let freq = CUE_START_HZ * (CUE_END_HZ / CUE_START_HZ).powf(ramp);
        let gain = CUE_START_GAIN * (CUE_END_GAIN / CUE_START_GAIN).powf(ramp);

        let saw = 2.0 * phase - 1.0;
        out.push((saw * gain) as f32);

        phase += freq / sr;
        phase -= phase.floor();
    }
    out
}

/// Plays directional cues. Implemented by [`SpatialCues`] and by test fakes.
pub trait CuePlayer: Send + Sync {
    fn play_cue(&self, channel: SpatialChannel);
}

/// Fires warning tones straight onto the sink, outside the speech schedule,
/// so interruptions never cut them off.
pub struct SpatialCues {
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
    tone: Arc<[f32]>,
}

impl SpatialCues {
    pub fn new(sink: Arc<dyn AudioSink>, sample_rate: u32) -> Self {
        Self {
            sink,
            sample_rate,
            tone: warning_tone(sample_rate).into(),
        }
    }
}

impl CuePlayer for SpatialCues {
    fn play_cue(&self, channel: SpatialChannel) {
        let id = self.sink.start(PlaybackSource {
            start_time: self.sink.current_time(),
            channel,
            sample_rate: self.sample_rate,
            samples: self.tone.clone(),
        });
        debug!("Playing {:?} warning cue as source {}", channel, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClockSink;

    #[test]
    fn test_tone_length_and_envelope() {
        let tone = warning_tone(24_000);
        assert_eq!(tone.len(), 6_000);

        let peak = |range: std::ops::Range<usize>| {
            tone[range].iter().fold(0.0f32, |m, s| m.max(s.abs()))
        };
        assert!(peak(0..240) > 0.25);
        assert!(peak(0..240) <= 0.3 + 1e-6);
        assert!(peak(5_000..6_000) < 0.011);
    }

    #[test]
    fn test_cue_lands_on_requested_channel_now() {
        let sink = Arc::new(ManualClockSink::default());
        sink.set_time(3.5);
        let cues = SpatialCues::new(sink.clone(), 24_000);
        cues.play_cue(SpatialChannel::Left);

        let started = sink.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].channel, SpatialChannel::Left);
        assert_eq!(started[0].start_time, 3.5);
        assert!((started[0].duration() - 0.25).abs() < 1e-9);
    }
}
