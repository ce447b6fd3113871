//! Speaker output via cpal.
//!
//! The cpal stream is not `Send`, so it is built and kept alive on its own
//! thread. The device callback pulls stereo frames from a shared [`Mixer`],
//! which also makes the device the master clock for playback scheduling.

use super::mixer::Mixer;
use super::PlaybackError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info};

/// Handle to the output thread. Dropping it stops playback.
pub struct CpalOutput {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Opens the default output device and returns the mixer feeding it.
    pub fn open() -> Result<(Arc<Mixer>, Self), PlaybackError> {
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Arc<Mixer>, PlaybackError>>();

        let thread = {
            let running = running.clone();
            std::thread::Builder::new()
                .name("audio-output".to_string())
                .spawn(move || {
                    let stream = match build_stream() {
                        Ok((mixer, stream)) => {
                            let _ = ready_tx.send(Ok(mixer));
                            stream
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    while running.load(Ordering::Acquire) {
                        std::thread::park_timeout(Duration::from_millis(200));
                    }
                    drop(stream);
                    info!("Audio output stopped");
                })
                .map_err(|e| PlaybackError::Device(e.to_string()))?
        };

        let mixer = ready_rx
            .recv()
            .map_err(|_| PlaybackError::Device("output thread exited".to_string()))??;

        Ok((
            mixer,
            Self {
                running,
                thread: Some(thread),
            },
        ))
    }
}

fn build_stream() -> Result<(Arc<Mixer>, cpal::Stream), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::Device("no default output device".into()))?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());

    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError::Device(format!("no output config: {e}")))?;
    if supported.sample_format() != SampleFormat::F32 {
        return Err(PlaybackError::Device(format!(
            "unsupported sample format {:?}",
            supported.sample_format()
        )));
    }

    let config: StreamConfig = supported.into();
    let channels = config.channels as usize;
    let mixer = Arc::new(Mixer::new(config.sample_rate.0));
    info!(
        "using output device: {device_name} ({} Hz, {} channels)",
        config.sample_rate.0, channels
    );

    let feed = mixer.clone();
    let mut stereo = Vec::new();
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                stereo.resize(frames * 2, 0.0);
                feed.render(&mut stereo);
                for (out, lr) in data.chunks_mut(channels.max(1)).zip(stereo.chunks(2)) {
                    match out.len() {
                        1 => out[0] = 0.5 * (lr[0] + lr[1]),
                        _ => {
                            out[0] = lr[0];
                            out[1] = lr[1];
                            for extra in &mut out[2..] {
                                *extra = 0.0;
                            }
                        }
                    }
                }
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| PlaybackError::Device(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| PlaybackError::Device(format!("failed to start output stream: {e}")))?;

    Ok((mixer, stream))
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}
