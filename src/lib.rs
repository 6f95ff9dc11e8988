//! adreel composes short vertical (9:16) ad videos from a list of scenes.
//!
//! Each scene is a still image or a short clip with optional pre-rendered narration. The engine
//! sizes every scene to its narration, ducks a music bed under speech, animates each scene with
//! fast-cut motion, and records the result in real time into an encoder sink:
//!
//! - Describe the ad as [`SceneInput`]s (or load an [`AdJob`] manifest)
//! - Build an [`AdSession`], which resolves assets and schedules the [`Timeline`]
//! - Call [`AdSession::render`] with a [`MediaSink`] ([`FfmpegSink`] or [`InMemorySink`])
#![forbid(unsafe_code)]

mod assets;
mod foundation;

pub(crate) mod audio;
pub(crate) mod capture;
/// Encoding sinks and output format selection.
pub mod encode;
pub(crate) mod render;
pub(crate) mod session;
pub(crate) mod timeline;

pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Rect, Rgba8Premul, Vec2};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assets::audio::{AudioClip, NARRATION_SAMPLE_RATE, decode_pcm16_le, decode_wav};
pub use crate::assets::clip::{CLIP_TIMEOUT, ClipDecodeOpts, ClipFrames, ClipPlayer};
pub use crate::assets::decode::PreparedImage;
pub use crate::assets::media::MIX_SAMPLE_RATE;
pub use crate::assets::resolver::{
    AssetResolver, AudioPayload, ResolvedScene, ResolvedVisual, ResolverOpts, SceneInput,
    VisualAsset, VisualKind,
};
pub use crate::audio::graph::{
    Bus, DUCK_FLOOR, DUCK_LEAD, DuckingPolicy, LEAD_IN, MixGraph, MixOpts, NARRATION_BOOST,
    RECOVERY, ScheduledGraph, ScheduledSource,
};
pub use crate::audio::mix::frame_to_sample;
pub use crate::audio::param::AudioParam;
pub use crate::capture::cancel::CancelToken;
pub use crate::capture::clock::{Clock, ManualClock, SystemClock};
pub use crate::capture::recorder::{CaptureOpts, CaptureState, Recorder, capture};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::format::{AudioCodec, Container, OutputFormat, VideoCodec, negotiate};
pub use crate::encode::sink::{
    AudioStreamConfig, InMemorySink, MediaSink, RenderArtifact, SinkConfig,
};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::compositor::FrameCompositor;
pub use crate::render::motion::{MotionState, motion_at};
pub use crate::session::job::{AdJob, AudioSource, JobScene, RenderSettings, VisualSource};
pub use crate::session::pipeline::{AdSession, render_ad};
pub use crate::timeline::scene::{FLOOR_DURATION, MOTION_SET, MotionProfile, Scene};
pub use crate::timeline::schedule::{ScenePlan, Timeline, TimelinePlan};
