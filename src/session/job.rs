use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assets::audio::NARRATION_SAMPLE_RATE;
use crate::assets::clip::ClipDecodeOpts;
use crate::assets::decode::decode_base64;
use crate::assets::resolver::{AudioPayload, ResolverOpts, SceneInput, VisualAsset};
use crate::audio::graph::{DuckingPolicy, LEAD_IN, MixOpts};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Render settings carried by a job manifest. Every field has a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Output frames per second (integer rate).
    pub fps: u32,
    /// Music bed level in `[0, 0.5]`.
    pub music_volume: f32,
    pub ducking: DuckingPolicy,
    /// Delay between "now" and the clock origin, in milliseconds.
    pub lead_in_ms: u64,
    pub clip: ClipDecodeOpts,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: Canvas::PORTRAIT_720.width,
            height: Canvas::PORTRAIT_720.height,
            fps: 60,
            music_volume: 0.25,
            ducking: DuckingPolicy::Sequential,
            lead_in_ms: LEAD_IN.as_millis() as u64,
            clip: ClipDecodeOpts::default(),
        }
    }
}

impl RenderSettings {
    pub fn canvas(&self) -> ReelResult<Canvas> {
        let canvas = Canvas {
            width: self.width,
            height: self.height,
        };
        canvas.validate()?;
        Ok(canvas)
    }

    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::new(self.fps, 1)
    }

    pub fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }

    pub fn mix_opts(&self) -> MixOpts {
        MixOpts {
            ducking: self.ducking,
            ..MixOpts::default()
        }
    }

    pub fn resolver_opts(&self) -> ReelResult<ResolverOpts> {
        Ok(ResolverOpts {
            canvas: self.canvas()?,
            clip: self.clip.clone(),
            ..ResolverOpts::default()
        })
    }
}

/// Visual of one manifest scene: `{"image": "..."}` or `{"clip": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualSource {
    Image(String),
    Clip(String),
}

/// Audio payload reference. Exactly one source key must be set.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudioSource {
    /// Raw little-endian PCM16, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcm16_base64: Option<String>,
    /// Raw little-endian PCM16 file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcm16_file: Option<PathBuf>,
    /// RIFF/WAVE bytes, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wav_base64: Option<String>,
    /// WAV or any ffmpeg-decodable file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// URL or `data:` URI, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Rate of the raw PCM16 forms.
    #[serde(default = "default_pcm_rate")]
    pub sample_rate: u32,
    /// Channel count of the raw PCM16 forms.
    #[serde(default = "default_pcm_channels")]
    pub channels: u16,
}

fn default_pcm_rate() -> u32 {
    NARRATION_SAMPLE_RATE
}

fn default_pcm_channels() -> u16 {
    1
}

impl AudioSource {
    fn source_count(&self) -> usize {
        [
            self.pcm16_base64.is_some(),
            self.pcm16_file.is_some(),
            self.wav_base64.is_some(),
            self.file.is_some(),
            self.url.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Turn the reference into a payload, resolving relative paths against `base_dir`.
    ///
    /// Malformed base64 is an asset failure, not a manifest error.
    pub fn to_payload(&self, base_dir: &Path) -> ReelResult<AudioPayload> {
        match self.source_count() {
            1 => {}
            0 => return Err(ReelError::validation("audio reference names no source")),
            n => {
                return Err(ReelError::validation(format!(
                    "audio reference names {n} sources, expected exactly one"
                )));
            }
        }
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(ReelError::validation(
                "audio sample_rate and channels must be non-zero",
            ));
        }
        if let Some(b64) = &self.pcm16_base64 {
            return Ok(AudioPayload::Pcm16 {
                bytes: decode_base64(b64)?,
                sample_rate: self.sample_rate,
                channels: self.channels,
            });
        }
        if let Some(path) = &self.pcm16_file {
            return Ok(AudioPayload::Pcm16File {
                path: rebase(base_dir, path),
                sample_rate: self.sample_rate,
                channels: self.channels,
            });
        }
        if let Some(b64) = &self.wav_base64 {
            return Ok(AudioPayload::Wav(decode_base64(b64)?));
        }
        if let Some(path) = &self.file {
            return Ok(AudioPayload::Encoded(
                rebase(base_dir, path).to_string_lossy().into_owned(),
            ));
        }
        match &self.url {
            Some(url) => Ok(AudioPayload::Encoded(url.clone())),
            None => Err(ReelError::validation("audio reference names no source")),
        }
    }
}

/// One scene of a job manifest.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobScene {
    pub visual: VisualSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<AudioSource>,
}

/// JSON job manifest: scenes, optional music bed and render settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdJob {
    pub scenes: Vec<JobScene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<AudioSource>,
    #[serde(default)]
    pub settings: RenderSettings,
    /// Directory relative asset paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl AdJob {
    /// Parse a manifest from a JSON reader. Relative paths resolve against the working directory.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let job: AdJob = serde_json::from_reader(r)
            .map_err(|e| ReelError::validation(format!("parse job manifest JSON: {e}")))?;
        if job.scenes.is_empty() {
            return Err(ReelError::validation("job manifest has no scenes"));
        }
        Ok(job)
    }

    /// Parse a manifest from disk; relative paths resolve against its directory.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open job manifest '{}': {e}", path.display()))
        })?;
        let mut job = Self::from_reader(BufReader::new(f))?;
        job.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(job)
    }

    /// Scenes as resolver input. A narration whose inline payload cannot be decoded is dropped
    /// with a warning; structural mistakes are validation errors.
    pub fn scene_inputs(&self) -> ReelResult<Vec<SceneInput>> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| {
                let visual = match &scene.visual {
                    VisualSource::Image(source) => VisualAsset::image(self.rebase_source(source)),
                    VisualSource::Clip(source) => VisualAsset::clip(self.rebase_source(source)),
                };
                let narration = match &scene.narration {
                    Some(audio) => self.payload_or_warn(audio, "narration", Some(index))?,
                    None => None,
                };
                Ok(SceneInput { visual, narration })
            })
            .collect()
    }

    pub fn music_payload(&self) -> ReelResult<Option<AudioPayload>> {
        match &self.music {
            Some(audio) => self.payload_or_warn(audio, "music", None),
            None => Ok(None),
        }
    }

    fn payload_or_warn(
        &self,
        audio: &AudioSource,
        what: &str,
        scene: Option<usize>,
    ) -> ReelResult<Option<AudioPayload>> {
        match audio.to_payload(&self.base_dir) {
            Ok(payload) => Ok(Some(payload)),
            Err(ReelError::AssetDecode(msg)) => {
                tracing::warn!(scene, error = %msg, "{what} payload unreadable, skipping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn rebase_source(&self, source: &str) -> String {
        if source.starts_with("data:") || source.contains("://") {
            return source.to_owned();
        }
        rebase(&self.base_dir, Path::new(source))
            .to_string_lossy()
            .into_owned()
    }
}

fn rebase(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/job.rs"]
mod tests;
