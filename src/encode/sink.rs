use crate::encode::format::OutputFormat;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;

/// Configuration provided to a [`MediaSink`] when recording starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Negotiated container and codecs.
    pub format: OutputFormat,
    /// Layout of the interleaved f32 samples passed to `push_audio`.
    pub audio: AudioStreamConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// The finished, encoded video. Only produced by a successful capture.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderArtifact {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub mime: String,
    pub duration_secs: f64,
    pub byte_len: usize,
    pub frames: u64,
}

/// Encoder contract for the capture loop.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, and
/// `push_audio` receives contiguous interleaved samples. Exactly one of `finish` or `abort` ends a
/// started recording.
pub trait MediaSink: Send {
    /// Whether this sink can produce `format`.
    fn supports(&self, format: &OutputFormat) -> bool;
    /// Called once before any media is pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame in strictly increasing order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Push interleaved program audio.
    fn push_audio(&mut self, samples: &[f32]) -> ReelResult<()>;
    /// Finalize encoding and return the artifact bytes.
    fn finish(&mut self) -> ReelResult<Vec<u8>>;
    /// Stop encoding and discard everything buffered so far.
    fn abort(&mut self);
}

/// In-memory sink for tests and previews.
#[derive(Debug)]
pub struct InMemorySink {
    supported: Vec<OutputFormat>,
    retain_frames: bool,
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    frame_count: u64,
    audio: Vec<f32>,
    finished: bool,
    aborted: bool,
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySink {
    /// Sink accepting every muxable format and keeping every frame.
    pub fn new() -> Self {
        Self {
            supported: OutputFormat::default_preference(),
            retain_frames: true,
            cfg: None,
            frames: Vec::new(),
            frame_count: 0,
            audio: Vec::new(),
            finished: false,
            aborted: false,
        }
    }

    /// Restrict the formats reported by `supports`.
    pub fn with_supported(mut self, formats: Vec<OutputFormat>) -> Self {
        self.supported = formats;
        self
    }

    /// Count frames without keeping their pixels.
    pub fn counting_only(mut self) -> Self {
        self.retain_frames = false;
        self
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Interleaved audio samples received so far.
    pub fn audio(&self) -> &[f32] {
        &self.audio
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl MediaSink for InMemorySink {
    fn supports(&self, format: &OutputFormat) -> bool {
        self.supported.contains(format)
    }

    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.frame_count = 0;
        self.audio.clear();
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::capture("in-memory sink not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::capture(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if idx.0 != self.frame_count {
            return Err(ReelError::capture(format!(
                "out-of-order frame {} (expected {})",
                idx.0, self.frame_count
            )));
        }
        self.frame_count += 1;
        if self.retain_frames {
            self.frames.push((idx, frame.clone()));
        }
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> ReelResult<()> {
        if self.cfg.is_none() {
            return Err(ReelError::capture("in-memory sink not started"));
        }
        self.audio.extend_from_slice(samples);
        Ok(())
    }

    fn finish(&mut self) -> ReelResult<Vec<u8>> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::capture("in-memory sink not started"))?;
        self.finished = true;
        let summary = serde_json::json!({
            "format": cfg.format,
            "width": cfg.width,
            "height": cfg.height,
            "frames": self.frame_count,
            "audio_samples": self.audio.len(),
        });
        serde_json::to_vec(&summary).map_err(|e| ReelError::capture(e.to_string()))
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.frames.clear();
        self.audio.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
