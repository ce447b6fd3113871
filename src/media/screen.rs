//! Desktop frame source built on `xcap`.
//!
//! The recorder delivers frames on a std channel; a dedicated thread keeps
//! only the newest one so the video sampler always sees a fresh frame.

use super::{DeviceError, MediaConstraints, VideoSource};
use image::{DynamicImage, RgbImage, RgbaImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};
use xcap::Monitor;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct MonitorInfo {
    name: String,
    width: u32,
    height: u32,
    is_primary: bool,
}

pub struct ScreenFrames {
    latest: Arc<Mutex<Option<RgbImage>>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ScreenFrames {
    /// Starts recording the primary monitor.
    pub fn start(_constraints: &MediaConstraints) -> Result<Self, DeviceError> {
        let monitors = Monitor::all().map_err(|e| DeviceError::Backend(e.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .cloned()
            .ok_or_else(|| DeviceError::NotFound("no monitors found".to_string()))?;

        let info = MonitorInfo {
            name: monitor.name().unwrap_or_else(|_| "Unknown".to_string()),
            width: monitor.width().unwrap_or(0),
            height: monitor.height().unwrap_or(0),
            is_primary: monitor.is_primary().unwrap_or(false),
        };
        info!(
            "Using monitor: {} ({}x{}, primary: {})",
            info.name, info.width, info.height, info.is_primary
        );

        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let worker = {
            let latest = latest.clone();
            let running = running.clone();
            std::thread::Builder::new()
                .name("screen-frames".to_string())
                .spawn(move || {
                    // The recorder stays on this thread for its whole life.
                    let (recorder, frames) = match monitor.video_recorder() {
                        Ok(pair) => pair,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    if let Err(e) = recorder.start() {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));

                    while running.load(Ordering::Acquire) {
                        match frames.recv_timeout(POLL_INTERVAL) {
                            Ok(frame) => {
                                let Some(rgba) = RgbaImage::from_raw(frame.width, frame.height, frame.raw)
                                else {
                                    warn!("Dropping malformed screen frame");
                                    continue;
                                };
                                let rgb = DynamicImage::ImageRgba8(rgba).into_rgb8();
                                if let Ok(mut slot) = latest.lock() {
                                    *slot = Some(rgb);
                                }
                            }
                            Err(RecvTimeoutError::Timeout) => {}
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    if let Err(e) = recorder.stop() {
                        warn!("Failed to stop screen recorder: {}", e);
                    }
                    info!("Screen capture thread stopped");
                })
                .map_err(|e| DeviceError::Backend(e.to_string()))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(DeviceError::PermissionDenied(e)),
            Err(_) => return Err(DeviceError::Backend("screen thread exited".to_string())),
        }

        Ok(Self {
            latest,
            running,
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl VideoSource for ScreenFrames {
    fn current_frame(&self) -> Option<RgbImage> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

impl Drop for ScreenFrames {
    fn drop(&mut self) {
        self.stop();
    }
}
