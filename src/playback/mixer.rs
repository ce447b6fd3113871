//! Software stereo mixer implementing [`AudioSink`].
//!
//! The mixer's clock is the number of frames it has rendered, so it only
//! advances when an output device (or the headless driver) pulls audio.

use super::{AudioSink, PlaybackSource, SourceId, SpatialChannel};
use std::f32::consts::FRAC_PI_4;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DRIVER_TICK: Duration = Duration::from_millis(20);

struct Voice {
    id: SourceId,
    start_frame: u64,
    channel: SpatialChannel,
    /// Source samples per output frame.
    step: f64,
    samples: Arc<[f32]>,
}

impl Voice {
    fn end_frame(&self) -> u64 {
        self.start_frame + (self.samples.len() as f64 / self.step).ceil() as u64
    }

    fn sample_at(&self, frame: u64) -> Option<f32> {
        if frame < self.start_frame {
            return None;
        }
        let pos = (frame - self.start_frame) as f64 * self.step;
        let i = pos.floor() as usize;
        let a = *self.samples.get(i)?;
        let b = self.samples.get(i + 1).copied().unwrap_or(a);
        let frac = (pos - i as f64) as f32;
        Some(a + (b - a) * frac)
    }
}

#[derive(Default)]
struct MixerState {
    frames_rendered: u64,
    next_id: SourceId,
    voices: Vec<Voice>,
}

/// Equal-power gains for a pan position in [-1, 1].
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

pub struct Mixer {
    sample_rate: u32,
    state: Mutex<MixerState>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: Mutex::new(MixerState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn voice_count(&self) -> usize {
        self.state().voices.len()
    }

    fn state(&self) -> MutexGuard<'_, MixerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mixes the next `out.len() / 2` frames into `out` as interleaved stereo
    /// and advances the clock by that many frames.
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);
        let frames = (out.len() / 2) as u64;
        let mut state = self.state();
        let first = state.frames_rendered;

        for voice in &state.voices {
            let (gl, gr) = pan_gains(voice.channel.pan());
            let from = voice.start_frame.max(first);
            let to = voice.end_frame().min(first + frames);
            for frame in from..to {
                if let Some(s) = voice.sample_at(frame) {
                    let i = ((frame - first) * 2) as usize;
                    out[i] += s * gl;
                    out[i + 1] += s * gr;
                }
            }
        }
        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }

        state.frames_rendered += frames;
        let now = state.frames_rendered;
        state.voices.retain(|v| v.end_frame() > now);
    }

    /// Advances the clock without producing output.
    pub fn advance(&self, frames: u64) {
        let mut state = self.state();
        state.frames_rendered += frames;
        let now = state.frames_rendered;
        state.voices.retain(|v| v.end_frame() > now);
    }
}

impl AudioSink for Mixer {
    fn current_time(&self) -> f64 {
        self.state().frames_rendered as f64 / self.sample_rate as f64
    }

    fn start(&self, source: PlaybackSource) -> SourceId {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;

        let requested = (source.start_time * self.sample_rate as f64).round().max(0.0) as u64;
        let start_frame = requested.max(state.frames_rendered);
        state.voices.push(Voice {
            id,
            start_frame,
            channel: source.channel,
            step: source.sample_rate as f64 / self.sample_rate as f64,
            samples: source.samples,
        });
        id
    }

    fn stop(&self, id: SourceId) {
        self.state().voices.retain(|v| v.id != id);
    }

    fn stop_all(&self) {
        let mut state = self.state();
        if !state.voices.is_empty() {
            debug!("Stopping {} voices", state.voices.len());
        }
        state.voices.clear();
    }
}

/// Advances `mixer` in realtime when no output device pulls from it.
pub fn spawn_realtime_driver(mixer: Arc<Mixer>, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Headless playback clock started at {} Hz", mixer.sample_rate());
        let mut ticker = tokio::time::interval(DRIVER_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let origin = Instant::now();
        let mut rendered: u64 = 0;
        let mut scratch = Vec::new();
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let due = (origin.elapsed().as_secs_f64() * mixer.sample_rate() as f64) as u64;
                    let frames = due.saturating_sub(rendered);
                    if frames == 0 {
                        continue;
                    }
                    scratch.resize(frames as usize * 2, 0.0);
                    mixer.render(&mut scratch);
                    rendered = due;
                }
            }
        }
        info!("Headless playback clock stopped");
    })
}
