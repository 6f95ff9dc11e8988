use std::time::Duration;

use crate::assets::audio::AudioClip;
use crate::assets::resolver::{AssetResolver, AudioPayload, ResolvedScene, SceneInput};
use crate::audio::graph::MixGraph;
use crate::capture::cancel::CancelToken;
use crate::capture::clock::{Clock, SystemClock};
use crate::capture::recorder::{CaptureOpts, capture};
use crate::encode::format::OutputFormat;
use crate::encode::sink::{MediaSink, RenderArtifact};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;
use crate::render::compositor::FrameCompositor;
use crate::session::job::{AdJob, RenderSettings};
use crate::timeline::schedule::{Timeline, TimelinePlan};

/// A resolved ad, ready to render.
///
/// Construction front-loads asset resolution and timeline scheduling; each [`AdSession::render`]
/// call builds a fresh mix graph against its own clock origin.
#[derive(Clone, Debug)]
pub struct AdSession {
    timeline: Timeline,
    music: Option<AudioClip>,
    settings: RenderSettings,
}

impl AdSession {
    /// Resolve scenes and music, then build the timeline.
    #[tracing::instrument(skip_all, fields(scenes = scenes.len(), music = music.is_some()))]
    pub fn new(
        scenes: &[SceneInput],
        music: Option<&AudioPayload>,
        settings: RenderSettings,
    ) -> ReelResult<Self> {
        if scenes.is_empty() {
            return Err(ReelError::validation("ad has no scenes"));
        }
        let resolver = AssetResolver::new(settings.resolver_opts()?);
        let resolved = resolver.resolve_scenes(scenes);
        let music = music.and_then(|payload| resolver.decode_music(payload));
        Self::from_resolved(resolved, music, settings)
    }

    /// Build a session from an already-resolved scene list.
    pub fn from_resolved(
        resolved: Vec<ResolvedScene>,
        music: Option<AudioClip>,
        settings: RenderSettings,
    ) -> ReelResult<Self> {
        settings.canvas()?;
        settings.fps()?;
        let timeline = Timeline::build(resolved)?;
        Ok(Self {
            timeline,
            music,
            settings,
        })
    }

    pub fn from_job(job: &AdJob) -> ReelResult<Self> {
        let scenes = job.scene_inputs()?;
        let music = job.music_payload()?;
        Self::new(&scenes, music.as_ref(), job.settings.clone())
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn has_music(&self) -> bool {
        self.music.is_some()
    }

    pub fn plan(&self) -> TimelinePlan {
        self.timeline.summary()
    }

    /// Compose the single frame shown `secs` into the ad. Clip scenes show their first frame.
    pub fn render_frame_at(&self, secs: f64) -> ReelResult<FrameRGBA> {
        let mut compositor = FrameCompositor::new(self.settings.canvas()?)?;
        let (idx, progress) = self.timeline.scene_at(secs);
        let wall = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_default();
        compositor.render(&self.timeline.scenes()[idx], progress, wall)
    }

    /// Schedule the audio graph against `clock` and record the ad into `sink`.
    #[tracing::instrument(skip_all, fields(total = self.timeline.total_duration()))]
    pub fn render(
        &self,
        sink: &mut dyn MediaSink,
        clock: &dyn Clock,
        cancel: &CancelToken,
        preferences: &[OutputFormat],
        on_progress: &mut dyn FnMut(f64),
    ) -> ReelResult<RenderArtifact> {
        let opts = CaptureOpts {
            fps: self.settings.fps()?,
            preferences: preferences.to_vec(),
        };
        let mut compositor = FrameCompositor::new(self.settings.canvas()?)?;
        let origin = clock.now() + self.settings.lead_in();
        let mut graph = MixGraph::schedule(
            &self.timeline,
            self.music.as_ref(),
            self.settings.music_volume,
            origin,
            &self.settings.mix_opts(),
        )?;
        capture(
            &self.timeline,
            &mut graph,
            &mut compositor,
            sink,
            clock,
            cancel,
            on_progress,
            &opts,
        )
    }
}

/// Render one ad in real time against the system clock, using the default format preferences.
pub fn render_ad(
    scenes: &[SceneInput],
    music: Option<&AudioPayload>,
    settings: RenderSettings,
    sink: &mut dyn MediaSink,
    on_progress: &mut dyn FnMut(f64),
) -> ReelResult<RenderArtifact> {
    let session = AdSession::new(scenes, music, settings)?;
    session.render(
        sink,
        &SystemClock::new(),
        &CancelToken::new(),
        &OutputFormat::default_preference(),
        on_progress,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/session/pipeline.rs"]
mod tests;
