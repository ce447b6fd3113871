//! PulseAudio microphone source
//!
//! Records 16-bit little-endian PCM through PulseAudio's simple API and
//! hands it to the capture loop as float samples.

use super::{AudioSource, DeviceError, MediaConstraints};
use libpulse_binding::sample::{Format, Spec};
use libpulse_binding::stream::Direction;
use libpulse_simple_binding::Simple;
use tracing::info;

pub struct PulseMicrophone {
    simple: Simple,
    bytes: Vec<u8>,
}

impl PulseMicrophone {
    /// Opens the configured input device, or the default one.
    pub fn open(app_name: &str, constraints: &MediaConstraints) -> Result<Self, DeviceError> {
        let spec = Spec {
            format: Format::S16le,
            channels: constraints.channels.clamp(1, 2) as u8,
            rate: constraints.sample_rate,
        };
        if !spec.is_valid() {
            return Err(DeviceError::Backend(format!("invalid sample spec {:?}", spec)));
        }

        let device = constraints.audio_device.as_deref();
        info!(
            "Opening PulseAudio source {} at {} Hz",
            device.unwrap_or("(default)"),
            spec.rate
        );

        let simple = Simple::new(
            None, // default server
            app_name,
            Direction::Record,
            device,
            "microphone",
            &spec,
            None, // default channel map
            None, // default buffering
        )
        .map_err(|e| match device {
            Some(name) => DeviceError::NotFound(format!("{}: {}", name, e)),
            None => DeviceError::Backend(e.to_string()),
        })?;

        Ok(Self {
            simple,
            bytes: Vec::new(),
        })
    }
}

impl AudioSource for PulseMicrophone {
    fn read(&mut self, buf: &mut [f32]) -> Result<(), DeviceError> {
        self.bytes.resize(buf.len() * 2, 0);
        self.simple
            .read(&mut self.bytes)
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        for (sample, raw) in buf.iter_mut().zip(self.bytes.chunks_exact(2)) {
            *sample = i16::from_le_bytes([raw[0], raw[1]]) as f32 / 32768.0;
        }
        Ok(())
    }
}
