use std::fmt;

use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    Mp4,
    #[serde(rename = "webm")]
    WebM,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    H264,
    Vp9,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    Aac,
    Opus,
}

/// A (container, video codec, audio codec) combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OutputFormat {
    pub container: Container,
    pub video: VideoCodec,
    pub audio: AudioCodec,
}

impl OutputFormat {
    pub const MP4_H264_AAC: OutputFormat = OutputFormat {
        container: Container::Mp4,
        video: VideoCodec::H264,
        audio: AudioCodec::Aac,
    };

    pub const WEBM_VP9_OPUS: OutputFormat = OutputFormat {
        container: Container::WebM,
        video: VideoCodec::Vp9,
        audio: AudioCodec::Opus,
    };

    /// Preference order used when the caller does not supply one.
    pub fn default_preference() -> Vec<OutputFormat> {
        vec![Self::MP4_H264_AAC, Self::WEBM_VP9_OPUS]
    }

    /// Whether the container can carry both codecs.
    pub fn is_muxable(&self) -> bool {
        match self.container {
            Container::Mp4 => true,
            Container::WebM => {
                self.video == VideoCodec::Vp9 && self.audio == AudioCodec::Opus
            }
        }
    }

    pub fn mime(&self) -> &'static str {
        match self.container {
            Container::Mp4 => "video/mp4",
            Container::WebM => "video/webm",
        }
    }

    /// MIME type with a `codecs` parameter, e.g. `video/webm;codecs=vp9,opus`.
    pub fn mime_with_codecs(&self) -> String {
        let v = match self.video {
            VideoCodec::H264 => "avc1",
            VideoCodec::Vp9 => "vp9",
        };
        let a = match self.audio {
            AudioCodec::Aac => "mp4a",
            AudioCodec::Opus => "opus",
        };
        format!("{};codecs={v},{a}", self.mime())
    }

    pub fn extension(&self) -> &'static str {
        match self.container {
            Container::Mp4 => "mp4",
            Container::WebM => "webm",
        }
    }

    /// Formats from `prefs` whose container matches the file extension of `path`, falling back to
    /// `prefs` itself when nothing matches.
    pub fn prefer_for_extension(prefs: &[OutputFormat], path: &std::path::Path) -> Vec<OutputFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let matching = prefs
            .iter()
            .copied()
            .filter(|f| ext.as_deref() == Some(f.extension()))
            .collect::<Vec<_>>();
        if matching.is_empty() {
            prefs.to_vec()
        } else {
            matching
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:?}/{:?}", self.extension(), self.video, self.audio)
    }
}

/// First format in `prefs` that `supported` accepts.
pub fn negotiate(
    prefs: &[OutputFormat],
    supported: impl Fn(&OutputFormat) -> bool,
) -> ReelResult<OutputFormat> {
    prefs
        .iter()
        .find(|f| f.is_muxable() && supported(f))
        .copied()
        .ok_or_else(|| {
            let tried = prefs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            ReelError::unsupported_format(format!("none of [{tried}] can be encoded"))
        })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/format.rs"]
mod tests;
