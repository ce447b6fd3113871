//! Microphone capture loop and vocal biomarker analysis.

use super::{AudioSource, DeviceError, MediaToggles, CAPTURE_CHUNK_SAMPLES};
use crate::events::AudioChunk;
use crate::model::VocalMetrics;
use crate::outbox::Outbox;
use crate::pcm;
use crate::ui::{UiEvent, UiPublisher};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Chunks per analysis window, roughly one second of audio.
const ANALYSIS_WINDOW: usize = 4;
/// Mean RMS below which the speaker is treated as silent.
const SPEECH_FLOOR: f32 = 0.02;
/// RMS variance above which voiced audio is flagged as tremulous.
const TREMOR_VARIANCE: f32 = 0.0015;
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Rolling loudness statistics over the last few capture chunks.
#[derive(Debug, Default)]
pub struct VocalAnalyzer {
    window: VecDeque<f32>,
    pending: usize,
}

impl VocalAnalyzer {
    /// Feeds one chunk's RMS. Returns metrics once per full window.
    pub fn push(&mut self, rms: f32) -> Option<VocalMetrics> {
        if self.window.len() == ANALYSIS_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(rms);
        self.pending += 1;
        if self.pending < ANALYSIS_WINDOW {
            return None;
        }
        self.pending = 0;

        let n = self.window.len() as f32;
        let energy = self.window.iter().sum::<f32>() / n;
        let stability = self.window.iter().map(|v| (v - energy).powi(2)).sum::<f32>() / n;
        Some(VocalMetrics {
            energy,
            stability,
            tremor_detected: energy > SPEECH_FLOOR && stability > TREMOR_VARIANCE,
        })
    }
}

/// One session's microphone pipeline.
pub struct AudioCapture {
    source: Box<dyn AudioSource>,
    toggles: MediaToggles,
    outbox: Outbox<AudioChunk>,
    ui: UiPublisher,
    analyzer: VocalAnalyzer,
    buf: Vec<f32>,
}

impl AudioCapture {
    pub fn new(
        source: Box<dyn AudioSource>,
        toggles: MediaToggles,
        outbox: Outbox<AudioChunk>,
        ui: UiPublisher,
    ) -> Self {
        Self {
            source,
            toggles,
            outbox,
            ui,
            analyzer: VocalAnalyzer::default(),
            buf: vec![0.0; CAPTURE_CHUNK_SAMPLES],
        }
    }

    /// Reads one buffer and hands it to the send queue.
    ///
    /// The device is read even while muted so the cadence never changes; a
    /// muted track contributes silence instead of its samples.
    pub fn tick(&mut self) -> Result<(), DeviceError> {
        self.source.read(&mut self.buf)?;

        if self.toggles.audio_enabled() {
            if let Some(metrics) = self.analyzer.push(pcm::rms(&self.buf)) {
                self.ui.publish(UiEvent::VocalMetricsUpdate(metrics));
            }
        } else {
            self.buf.fill(0.0);
        }

        self.outbox.offer(AudioChunk {
            pcm: pcm::f32_to_pcm16le(&self.buf),
        });
        Ok(())
    }

    /// Runs on a blocking thread until `token` is cancelled.
    pub fn spawn(mut self, token: CancellationToken) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            info!("Audio capture started");
            while !token.is_cancelled() {
                if let Err(e) = self.tick() {
                    warn!("Audio read error: {}", e);
                    std::thread::sleep(READ_ERROR_BACKOFF);
                }
            }
            info!(
                "Audio capture stopped ({} chunks dropped)",
                self.outbox.dropped()
            );
        })
    }
}
