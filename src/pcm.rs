//! Linear PCM conversions shared by the capture and playback paths.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PcmError {
    #[error("empty audio payload")]
    Empty,

    #[error("odd payload length {0}, expected whole 16-bit samples")]
    OddLength(usize),
}

/// Clamp float samples to [-1, 1] and pack them as signed 16-bit little endian.
pub fn f32_to_pcm16le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let s = if s.is_nan() { 0.0 } else { s.clamp(-1.0, 1.0) };
        let v = if s < 0.0 {
            (s * 32768.0) as i16
        } else {
            (s * 32767.0) as i16
        };
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn pcm16le_to_f32(bytes: &[u8]) -> Result<Vec<f32>, PcmError> {
    if bytes.is_empty() {
        return Err(PcmError::Empty);
    }
    if bytes.len() % 2 != 0 {
        return Err(PcmError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect())
}

/// Root mean square of a buffer, 0 for an empty one.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}
