//! Periodic camera frame sampling.

use super::{MediaToggles, VideoSource};
use crate::events::VideoFrame;
use crate::outbox::Outbox;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageError, RgbImage};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(250);
pub const JPEG_QUALITY: u8 = 60;

/// Downsamples `frame` to half its size and encodes it as JPEG.
pub fn encode_frame(frame: &RgbImage) -> Result<VideoFrame, ImageError> {
    let width = (frame.width() / 2).max(1);
    let height = (frame.height() / 2).max(1);
    let small = imageops::resize(frame, width, height, FilterType::Triangle);

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    encoder.encode(small.as_raw(), width, height, ExtendedColorType::Rgb8)?;

    Ok(VideoFrame { jpeg, width, height })
}

/// One session's frame sampler.
pub struct VideoSampler {
    source: Arc<dyn VideoSource>,
    toggles: MediaToggles,
    outbox: Outbox<VideoFrame>,
}

impl VideoSampler {
    pub fn new(source: Arc<dyn VideoSource>, toggles: MediaToggles, outbox: Outbox<VideoFrame>) -> Self {
        Self {
            source,
            toggles,
            outbox,
        }
    }

    /// Samples once. Returns true if a frame was queued.
    pub fn sample(&self) -> bool {
        if !self.toggles.video_enabled() {
            return false;
        }
        let Some(frame) = self.source.current_frame() else {
            return false;
        };
        if frame.width() == 0 || frame.height() == 0 {
            return false;
        }
        match encode_frame(&frame) {
            Ok(encoded) => self.outbox.offer(encoded),
            Err(e) => {
                warn!("Failed to encode frame: {}", e);
                false
            }
        }
    }

    /// Samples every [`FRAME_INTERVAL`] until `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Video sampler started");
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut queued: u64 = 0;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if self.sample() {
                            queued += 1;
                        }
                    }
                }
            }
            debug!("Video sampler queued {} frames", queued);
            info!("Video sampler stopped");
        })
    }
}
