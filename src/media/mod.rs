//! Local capture devices and the pipelines that stream them.
//!
//! Devices are reached through [`MediaDevices`], which grants a microphone
//! and a camera together. The grant outlives mute and video toggles: those
//! only flip the shared [`MediaToggles`] flags the pipelines consult on every
//! tick.

pub mod audio;
pub mod video;

#[cfg(feature = "pulse")]
pub mod pulse;
#[cfg(feature = "capture")]
pub mod screen;

use async_trait::async_trait;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;
/// Samples per capture tick, about 256 ms at 16 kHz.
pub const CAPTURE_CHUNK_SAMPLES: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no such device: {0}")]
    NotFound(String),

    #[error("device backend error: {0}")]
    Backend(String),

    #[error("no capture backend available: {0}")]
    Unavailable(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear camera, facing away from the user.
    #[default]
    Environment,
    User,
}

/// What the pipelines ask of the capture devices.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaConstraints {
    /// Backend-specific microphone name, `None` for the system default.
    pub audio_device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio_device: None,
            sample_rate: CAPTURE_SAMPLE_RATE,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            facing: FacingMode::Environment,
            ideal_width: 640,
            ideal_height: 480,
        }
    }
}

/// Blocking microphone reader, driven from a dedicated thread.
pub trait AudioSource: Send {
    /// Fills `buf` with mono samples in [-1, 1] at the capture rate.
    fn read(&mut self, buf: &mut [f32]) -> Result<(), DeviceError>;
}

/// Camera or screen frames, sampled on demand.
pub trait VideoSource: Send + Sync {
    /// The most recent frame, or `None` if the source has nothing yet.
    fn current_frame(&self) -> Option<RgbImage>;

    /// Releases the underlying device. Idempotent.
    fn stop(&self) {}
}

pub struct MediaTracks {
    pub audio: Box<dyn AudioSource>,
    pub video: Arc<dyn VideoSource>,
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaTracks, DeviceError>;
}

/// Per-track enabled flags shared by the caller and the capture pipelines.
#[derive(Debug, Clone)]
pub struct MediaToggles {
    audio: Arc<AtomicBool>,
    video: Arc<AtomicBool>,
}

impl MediaToggles {
    pub fn new(audio_enabled: bool, video_enabled: bool) -> Self {
        Self {
            audio: Arc::new(AtomicBool::new(audio_enabled)),
            video: Arc::new(AtomicBool::new(video_enabled)),
        }
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio.load(Ordering::Relaxed)
    }

    pub fn video_enabled(&self) -> bool {
        self.video.load(Ordering::Relaxed)
    }

    pub fn set_audio_enabled(&self, enabled: bool) {
        self.audio.store(enabled, Ordering::Relaxed);
    }

    pub fn set_video_enabled(&self, enabled: bool) {
        self.video.store(enabled, Ordering::Relaxed);
    }
}

/// Ownership of the granted tracks for one session.
pub struct MediaTrackHandle {
    toggles: MediaToggles,
    video: Arc<dyn VideoSource>,
    stopped: AtomicBool,
}

impl MediaTrackHandle {
    pub fn new(toggles: MediaToggles, video: Arc<dyn VideoSource>) -> Self {
        Self {
            toggles,
            video,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn audio_enabled(&self) -> bool {
        self.toggles.audio_enabled()
    }

    pub fn video_enabled(&self) -> bool {
        self.toggles.video_enabled()
    }

    /// Stops every track. The audio thread exits on its own once the
    /// session token is cancelled.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.video.stop();
        info!("Media tracks stopped");
    }
}

/// Video source for builds without a frame backend. Never yields a frame.
#[derive(Debug, Default)]
pub struct NoVideo;

impl VideoSource for NoVideo {
    fn current_frame(&self) -> Option<RgbImage> {
        None
    }
}

/// The devices compiled into this build.
///
/// The microphone comes from PulseAudio (`pulse` feature) and frames from
/// the desktop (`capture` feature). Without a microphone backend every
/// acquisition fails; without a frame backend the video pipeline idles.
#[derive(Debug, Clone)]
pub struct SystemDevices {
    app_name: String,
}

impl SystemDevices {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    #[cfg(feature = "pulse")]
    fn open_audio(&self, constraints: &MediaConstraints) -> Result<Box<dyn AudioSource>, DeviceError> {
        Ok(Box::new(pulse::PulseMicrophone::open(&self.app_name, constraints)?))
    }

    #[cfg(not(feature = "pulse"))]
    fn open_audio(&self, _constraints: &MediaConstraints) -> Result<Box<dyn AudioSource>, DeviceError> {
        let _ = &self.app_name;
        Err(DeviceError::Unavailable("built without the `pulse` feature"))
    }

    #[cfg(feature = "capture")]
    fn open_video(&self, constraints: &MediaConstraints) -> Result<Arc<dyn VideoSource>, DeviceError> {
        Ok(Arc::new(screen::ScreenFrames::start(constraints)?))
    }

    #[cfg(not(feature = "capture"))]
    fn open_video(&self, _constraints: &MediaConstraints) -> Result<Arc<dyn VideoSource>, DeviceError> {
        info!("Built without the `capture` feature, video disabled");
        Ok(Arc::new(NoVideo))
    }
}

#[async_trait]
impl MediaDevices for SystemDevices {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaTracks, DeviceError> {
        let devices = self.clone();
        let constraints = constraints.clone();
        tokio::task::spawn_blocking(move || -> Result<MediaTracks, DeviceError> {
            let audio = devices.open_audio(&constraints)?;
            let video = devices.open_video(&constraints)?;
            Ok(MediaTracks { audio, video })
        })
        .await
        .map_err(|e| DeviceError::Backend(format!("device open task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingVideo(std::sync::atomic::AtomicUsize);

    impl VideoSource for CountingVideo {
        fn current_frame(&self) -> Option<RgbImage> {
            None
        }

        fn stop(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_track_handle_stop_is_idempotent() {
        let video = Arc::new(CountingVideo(Default::default()));
        let handle = MediaTrackHandle::new(MediaToggles::new(true, true), video.clone());
        handle.stop();
        handle.stop();
        assert_eq!(video.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_toggles_are_shared() {
        let toggles = MediaToggles::new(true, true);
        let handle = MediaTrackHandle::new(toggles.clone(), Arc::new(NoVideo));
        toggles.set_audio_enabled(false);
        toggles.set_video_enabled(false);
        assert!(!handle.audio_enabled());
        assert!(!handle.video_enabled());
    }

    #[test]
    fn test_default_constraints() {
        let c = MediaConstraints::default();
        assert_eq!((c.sample_rate, c.channels), (16_000, 1));
        assert_eq!((c.ideal_width, c.ideal_height), (640, 480));
        assert_eq!(c.facing, FacingMode::Environment);
    }
}
