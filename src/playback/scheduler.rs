use super::{AudioSink, PlaybackError, PlaybackSource, SourceId, SpatialChannel, OUTPUT_SAMPLE_RATE};
use crate::pcm;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a speech chunk landed on the output clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChunk {
    pub id: SourceId,
    pub start: f64,
    pub duration: f64,
}

/// Queues model speech gaplessly and flushes it on interruption.
///
/// Owned by the inbound dispatcher, so the output clock is only ever
/// touched from one task.
pub struct PlaybackScheduler {
    sink: Arc<dyn AudioSink>,
    output_clock: f64,
    /// Speech sources not yet known to be finished, with their end times.
    active: Vec<(SourceId, f64)>,
}

impl PlaybackScheduler {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        let output_clock = sink.current_time();
        Self {
            sink,
            output_clock,
            active: Vec::new(),
        }
    }

    pub fn output_clock(&self) -> f64 {
        self.output_clock
    }

    /// Speech sources still playing or waiting to play.
    pub fn active_count(&self) -> usize {
        let now = self.sink.current_time();
        self.active.iter().filter(|(_, end)| *end > now).count()
    }

    /// Decodes a 24 kHz PCM16LE chunk and schedules it right after the
    /// previous one, or now if the queue has drained.
    ///
    /// A chunk that fails to decode is dropped and leaves the clock as it was.
    pub fn schedule_chunk(&mut self, pcm16le: &[u8]) -> Result<ScheduledChunk, PlaybackError> {
        let samples = pcm::pcm16le_to_f32(pcm16le)?;

        let now = self.sink.current_time();
        self.active.retain(|(_, end)| *end > now);

        let source = PlaybackSource {
            start_time: self.output_clock.max(now),
            channel: SpatialChannel::Center,
            sample_rate: OUTPUT_SAMPLE_RATE,
            samples: samples.into(),
        };
        let start = source.start_time;
        let duration = source.duration();
        let id = self.sink.start(source);

        self.output_clock = start + duration;
        self.active.push((id, self.output_clock));
        debug!("Scheduled speech {} at {:.3}s for {:.3}s", id, start, duration);

        Ok(ScheduledChunk { id, start, duration })
    }

    /// Stops every queued speech source and rewinds the clock to now.
    pub fn interrupt(&mut self) {
        let stopped = self.active.len();
        for (id, _) in self.active.drain(..) {
            self.sink.stop(id);
        }
        self.output_clock = self.sink.current_time();
        debug!("Interrupted playback, {} sources stopped", stopped);
    }

    /// Releases everything on the sink, cues included. Used on teardown.
    pub fn stop_all(&mut self) {
        self.active.clear();
        self.sink.stop_all();
        self.output_clock = self.sink.current_time();
    }

    pub fn handle_chunk(&mut self, pcm16le: &[u8]) {
        if let Err(e) = self.schedule_chunk(pcm16le) {
            warn!("Dropping output audio chunk: {}", e);
        }
    }
}
