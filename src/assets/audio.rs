use std::io::Cursor;
use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate of speech payloads produced by the narration generator.
pub const NARRATION_SAMPLE_RATE: u32 = 24_000;

/// Uniform in-memory audio buffer used for narration clips and music beds.
#[derive(Clone, Debug)]
pub struct AudioClip {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 for narration, usually 2 for music).
    pub channels: u16,
    /// Interleaved samples in `[-1, 1]`.
    pub interleaved_f32: Arc<Vec<f32>>,
}

impl AudioClip {
    /// Create a validated clip. `samples` must hold whole frames.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> ReelResult<Self> {
        if sample_rate == 0 {
            return Err(ReelError::asset_decode("audio sample_rate must be non-zero"));
        }
        if channels == 0 {
            return Err(ReelError::asset_decode("audio channel count must be non-zero"));
        }
        if !samples.len().is_multiple_of(usize::from(channels)) {
            return Err(ReelError::asset_decode(
                "audio sample count is not a multiple of the channel count",
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
            interleaved_f32: Arc::new(samples),
        })
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Return `true` when the clip holds no sample frames.
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Decode raw little-endian signed 16-bit PCM.
///
/// Empty payloads and payloads with a dangling byte are rejected.
pub fn decode_pcm16_le(bytes: &[u8], sample_rate: u32, channels: u16) -> ReelResult<AudioClip> {
    if bytes.is_empty() {
        return Err(ReelError::asset_decode("pcm16 payload is empty"));
    }
    if !bytes.len().is_multiple_of(2) {
        return Err(ReelError::asset_decode(
            "pcm16 payload length is not aligned to 16-bit samples",
        ));
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
        .collect::<Vec<_>>();
    AudioClip::new(sample_rate, channels, samples)
}

/// Decode a RIFF/WAVE payload (integer or 32-bit float samples).
pub fn decode_wav(bytes: &[u8]) -> ReelResult<AudioClip> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| ReelError::asset_decode(format!("invalid wav payload: {e}")))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ReelError::asset_decode(format!("wav sample read failed: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ReelError::asset_decode(format!("wav sample read failed: {e}")))?
        }
    };
    if samples.is_empty() {
        return Err(ReelError::asset_decode("wav payload holds no samples"));
    }
    AudioClip::new(spec.sample_rate, spec.channels, samples)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/audio.rs"]
mod tests;
