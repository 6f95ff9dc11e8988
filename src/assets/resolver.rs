use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::assets::audio::{AudioClip, NARRATION_SAMPLE_RATE, decode_pcm16_le, decode_wav};
use crate::assets::clip::{ClipDecodeOpts, ClipFrames};
use crate::assets::decode::{PreparedImage, decode_image, parse_data_uri, read_source_bytes, solid_image};
use crate::assets::media::{
    MIX_SAMPLE_RATE, decode_audio_f32, decode_clip_frames, probe_video, remaining_until,
};
use crate::foundation::core::{Canvas, Rgba8Premul};
use crate::foundation::error::{ReelError, ReelResult};

/// Fill color of the stand-in visual used when a scene asset cannot be loaded.
pub const PLACEHOLDER_COLOR: Rgba8Premul = Rgba8Premul {
    r: 0x11,
    g: 0x11,
    b: 0x11,
    a: 0xff,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    Image,
    Clip,
}

/// Caller-owned handle to a scene visual.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisualAsset {
    pub kind: VisualKind,
    /// Filesystem path, `data:` URI, or (clips only) any URL ffmpeg can open.
    pub source: String,
}

impl VisualAsset {
    pub fn image(source: impl Into<String>) -> Self {
        Self {
            kind: VisualKind::Image,
            source: source.into(),
        }
    }

    pub fn clip(source: impl Into<String>) -> Self {
        Self {
            kind: VisualKind::Clip,
            source: source.into(),
        }
    }
}

/// A visual ready for the compositor.
#[derive(Clone, Debug)]
pub enum ResolvedVisual {
    Image(PreparedImage),
    Clip(Arc<ClipFrames>),
    /// Stand-in for an asset that failed to load.
    Placeholder(PreparedImage),
}

impl ResolvedVisual {
    /// Opaque dark 9:16 still.
    pub fn placeholder() -> Self {
        Self::Placeholder(solid_image(9, 16, PLACEHOLDER_COLOR))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, Self::Clip(_))
    }
}

/// Encoded narration or music payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioPayload {
    /// Raw little-endian signed 16-bit PCM.
    Pcm16 {
        bytes: Vec<u8>,
        sample_rate: u32,
        channels: u16,
    },
    /// Raw 16-bit PCM stored in a file, read at resolve time.
    Pcm16File {
        path: PathBuf,
        sample_rate: u32,
        channels: u16,
    },
    /// RIFF/WAVE bytes.
    Wav(Vec<u8>),
    /// File path, URL or `data:` URI. WAV files and `audio/pcm` / `audio/wav` data URIs are
    /// decoded in-process; everything else goes through ffmpeg.
    Encoded(String),
}

impl AudioPayload {
    /// Speech as produced by the narration generator: mono PCM16 at 24 kHz.
    pub fn narration_pcm16(bytes: Vec<u8>) -> Self {
        Self::Pcm16 {
            bytes,
            sample_rate: NARRATION_SAMPLE_RATE,
            channels: 1,
        }
    }
}

/// One scene as supplied by the caller.
#[derive(Clone, Debug)]
pub struct SceneInput {
    pub visual: VisualAsset,
    pub narration: Option<AudioPayload>,
}

/// One scene after asset resolution.
#[derive(Clone, Debug)]
pub struct ResolvedScene {
    pub visual: ResolvedVisual,
    pub narration: Option<AudioClip>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolverOpts {
    /// Clips are pre-scaled to cover this canvas.
    pub canvas: Canvas,
    pub clip: ClipDecodeOpts,
    /// Bounded wait for ffmpeg-decoded audio (streamed music URLs can stall).
    pub audio_timeout: Duration,
}

impl Default for ResolverOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas::PORTRAIT_720,
            clip: ClipDecodeOpts::default(),
            audio_timeout: Duration::from_secs(30),
        }
    }
}

/// Loads scene visuals and audio payloads. Failures never propagate: visuals degrade to a
/// placeholder and audio to `None`, with a warning logged.
#[derive(Clone, Debug, Default)]
pub struct AssetResolver {
    opts: ResolverOpts,
}

impl AssetResolver {
    pub fn new(opts: ResolverOpts) -> Self {
        Self { opts }
    }

    pub fn opts(&self) -> &ResolverOpts {
        &self.opts
    }

    pub fn resolve_visual(&self, asset: &VisualAsset) -> ResolvedVisual {
        self.resolve_visual_with(asset, &self.opts.clip)
    }

    #[tracing::instrument(skip(self, asset, clip), fields(kind = ?asset.kind, source = %describe_source(&asset.source)))]
    fn resolve_visual_with(&self, asset: &VisualAsset, clip: &ClipDecodeOpts) -> ResolvedVisual {
        match self.try_resolve_visual(asset, clip) {
            Ok(visual) => visual,
            Err(err) => {
                tracing::warn!(error = %err, "visual asset unavailable, using placeholder");
                ResolvedVisual::placeholder()
            }
        }
    }

    fn try_resolve_visual(
        &self,
        asset: &VisualAsset,
        clip: &ClipDecodeOpts,
    ) -> ReelResult<ResolvedVisual> {
        match asset.kind {
            VisualKind::Image => {
                let bytes = read_source_bytes(&asset.source)?;
                Ok(ResolvedVisual::Image(decode_image(&bytes)?))
            }
            VisualKind::Clip => {
                // Probe and decode share one deadline.
                let deadline = Instant::now() + clip.timeout;
                let info = probe_video(&asset.source, clip.timeout)?;
                let left = remaining_until(deadline, "clip decode")?;
                let frames = decode_clip_frames(&info, self.opts.canvas, clip, left)?;
                tracing::debug!(
                    frames = frames.len(),
                    fps = frames.decode_fps(),
                    width = info.width,
                    height = info.height,
                    duration = info.duration_sec,
                    "clip pre-decoded"
                );
                Ok(ResolvedVisual::Clip(Arc::new(frames)))
            }
        }
    }

    /// Decode a narration payload; `None` means the scene renders without speech.
    pub fn decode_narration(&self, payload: &AudioPayload) -> Option<AudioClip> {
        self.decode_or_warn(payload, 1, "narration")
    }

    /// Decode a music bed; `None` means the render has no music.
    pub fn decode_music(&self, payload: &AudioPayload) -> Option<AudioClip> {
        self.decode_or_warn(payload, 2, "music")
    }

    fn decode_or_warn(&self, payload: &AudioPayload, channels: u16, what: &str) -> Option<AudioClip> {
        match self.decode_audio(payload, channels) {
            Ok(clip) => Some(clip),
            Err(err) => {
                tracing::warn!(error = %err, "{what} payload could not be decoded, skipping");
                None
            }
        }
    }

    fn decode_audio(&self, payload: &AudioPayload, channels: u16) -> ReelResult<AudioClip> {
        match payload {
            AudioPayload::Pcm16 {
                bytes,
                sample_rate,
                channels,
            } => decode_pcm16_le(bytes, *sample_rate, *channels),
            AudioPayload::Pcm16File {
                path,
                sample_rate,
                channels,
            } => {
                let bytes = std::fs::read(path).map_err(|e| {
                    ReelError::asset_decode(format!("failed to read '{}': {e}", path.display()))
                })?;
                decode_pcm16_le(&bytes, *sample_rate, *channels)
            }
            AudioPayload::Wav(bytes) => decode_wav(bytes),
            AudioPayload::Encoded(source) => self.decode_encoded(source, channels),
        }
    }

    fn decode_encoded(&self, source: &str, channels: u16) -> ReelResult<AudioClip> {
        if let Some(parsed) = parse_data_uri(source) {
            let (mime, bytes) = parsed?;
            return match mime.as_str() {
                "audio/pcm" | "audio/l16" => decode_pcm16_le(&bytes, NARRATION_SAMPLE_RATE, 1),
                "audio/wav" | "audio/wave" | "audio/x-wav" => decode_wav(&bytes),
                _ => decode_audio_f32(source, MIX_SAMPLE_RATE, channels, self.opts.audio_timeout),
            };
        }
        let is_wav = Path::new(source)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav && Path::new(source).is_file() {
            let bytes = read_source_bytes(source)?;
            return decode_wav(&bytes);
        }
        decode_audio_f32(source, MIX_SAMPLE_RATE, channels, self.opts.audio_timeout)
    }

    /// Resolve every scene in parallel, preserving input order.
    #[tracing::instrument(skip(self, scenes), fields(scenes = scenes.len()))]
    pub fn resolve_scenes(&self, scenes: &[SceneInput]) -> Vec<ResolvedScene> {
        let clips = scenes
            .iter()
            .filter(|scene| scene.visual.kind == VisualKind::Clip)
            .count();
        let clip = self.opts.clip.shared_by(clips);
        scenes
            .par_iter()
            .map(|scene| ResolvedScene {
                visual: self.resolve_visual_with(&scene.visual, &clip),
                narration: scene
                    .narration
                    .as_ref()
                    .and_then(|payload| self.decode_narration(payload)),
            })
            .collect()
    }
}

/// Short form of a source for logs; inline payloads are summarized.
pub(crate) fn describe_source(source: &str) -> String {
    match source.strip_prefix("data:") {
        Some(rest) => {
            let header = rest.split(',').next().unwrap_or_default();
            format!("data:{header},<{} bytes>", source.len())
        }
        None => source.to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolver.rs"]
mod tests;
