use std::time::Duration;

use crate::audio::graph::ScheduledGraph;
use crate::audio::mix::frame_to_sample;
use crate::capture::cancel::CancelToken;
use crate::capture::clock::Clock;
use crate::encode::format::{OutputFormat, negotiate};
use crate::encode::sink::{AudioStreamConfig, MediaSink, RenderArtifact, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::compositor::FrameCompositor;
use crate::timeline::schedule::Timeline;

/// Lifecycle of one capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Finalizing,
    Done,
    Failed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaptureOpts {
    pub fps: Fps,
    /// Tried in order; the first format the sink supports is used.
    pub preferences: Vec<OutputFormat>,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self {
            fps: Fps { num: 60, den: 1 },
            preferences: OutputFormat::default_preference(),
        }
    }
}

/// Drives a clock-paced render loop into a [`MediaSink`].
pub struct Recorder<'a> {
    timeline: &'a Timeline,
    graph: &'a mut ScheduledGraph,
    compositor: &'a mut FrameCompositor,
    sink: &'a mut dyn MediaSink,
    clock: &'a dyn Clock,
    cancel: &'a CancelToken,
    opts: &'a CaptureOpts,
    state: CaptureState,
    frames_pushed: u64,
    samples_pushed: u64,
    last_progress: f64,
    audio_buf: Vec<f32>,
}

impl<'a> Recorder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timeline: &'a Timeline,
        graph: &'a mut ScheduledGraph,
        compositor: &'a mut FrameCompositor,
        sink: &'a mut dyn MediaSink,
        clock: &'a dyn Clock,
        cancel: &'a CancelToken,
        opts: &'a CaptureOpts,
    ) -> Self {
        Self {
            timeline,
            graph,
            compositor,
            sink,
            clock,
            cancel,
            opts,
            state: CaptureState::Idle,
            frames_pushed: 0,
            samples_pushed: 0,
            last_progress: 0.0,
            audio_buf: Vec::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    pub fn samples_pushed(&self) -> u64 {
        self.samples_pushed
    }

    fn transition(&mut self, to: CaptureState) {
        tracing::debug!(from = ?self.state, to = ?to, "capture state");
        self.state = to;
    }

    /// Run the capture to completion. Progress is reported through `on_progress`, ending at
    /// exactly `1.0` on success and going silent after failure or cancellation.
    #[tracing::instrument(skip_all, fields(total = self.timeline.total_duration(), fps = self.opts.fps.as_f64()))]
    pub fn run(&mut self, on_progress: &mut dyn FnMut(f64)) -> ReelResult<RenderArtifact> {
        if self.state != CaptureState::Idle {
            return Err(ReelError::validation("recorder has already run"));
        }
        let fps = self.opts.fps;
        Fps::new(fps.num, fps.den)?;
        let format = negotiate(&self.opts.preferences, |f| self.sink.supports(f))?;
        if self.cancel.is_cancelled() {
            self.transition(CaptureState::Cancelled);
            self.graph.release_pending(self.clock.now());
            return Err(ReelError::Cancelled);
        }

        let canvas = self.compositor.canvas();
        let cfg = SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps,
            format,
            audio: AudioStreamConfig {
                sample_rate: self.graph.sample_rate(),
                channels: self.graph.channels(),
            },
        };
        tracing::info!(format = %format, "capture starting");
        if let Err(e) = self.sink.begin(cfg) {
            self.transition(CaptureState::Failed);
            self.sink.abort();
            return Err(into_capture(e));
        }
        self.transition(CaptureState::Recording);

        match self.record(on_progress) {
            Ok(bytes) => {
                let artifact = RenderArtifact {
                    byte_len: bytes.len(),
                    bytes,
                    format,
                    mime: format.mime_with_codecs(),
                    duration_secs: self.timeline.total_duration(),
                    frames: self.frames_pushed,
                };
                self.transition(CaptureState::Done);
                on_progress(1.0);
                tracing::info!(
                    frames = artifact.frames,
                    bytes = artifact.byte_len,
                    "capture finished"
                );
                Ok(artifact)
            }
            Err(ReelError::Cancelled) => {
                self.sink.abort();
                let released = self.graph.release_pending(self.clock.now());
                self.transition(CaptureState::Cancelled);
                tracing::info!(released, frames = self.frames_pushed, "capture cancelled");
                Err(ReelError::Cancelled)
            }
            Err(e) => {
                self.sink.abort();
                self.transition(CaptureState::Failed);
                tracing::warn!(error = %e, "capture failed");
                Err(into_capture(e))
            }
        }
    }

    fn record(&mut self, on_progress: &mut dyn FnMut(f64)) -> ReelResult<Vec<u8>> {
        let fps = self.opts.fps;
        let origin = self.graph.origin();
        let total = self.timeline.total_duration();
        let end = end_of(total);
        let total_frames = fps.frames_covering(total);

        self.clock.sleep_until(origin);
        loop {
            if self.cancel.is_cancelled() {
                return Err(ReelError::Cancelled);
            }
            let now = self.clock.now();
            let elapsed = now.saturating_sub(origin);
            if elapsed >= end {
                break;
            }

            let due = fps.slots_due(elapsed).min(total_frames);
            if due > self.frames_pushed {
                let (idx, progress) = self.timeline.scene_at(elapsed.as_secs_f64());
                let frame =
                    self.compositor
                        .render(&self.timeline.scenes()[idx], progress, now)?;
                for n in self.frames_pushed..due {
                    self.sink.push_frame(FrameIndex(n), &frame)?;
                }
                self.frames_pushed = due;
            }
            self.pull_audio(frame_to_sample(
                self.frames_pushed,
                fps,
                self.graph.sample_rate(),
            ))?;
            self.report(on_progress, elapsed.as_secs_f64() / total);

            let next_slot = fps.slot_time(FrameIndex(self.frames_pushed)).min(end);
            self.clock.sleep_until(origin + next_slot);
        }

        self.transition(CaptureState::Finalizing);
        for n in self.frames_pushed..total_frames {
            if self.cancel.is_cancelled() {
                return Err(ReelError::Cancelled);
            }
            let t = fps.slot_time(FrameIndex(n));
            let (idx, progress) = self.timeline.scene_at(t.as_secs_f64());
            let frame = self
                .compositor
                .render(&self.timeline.scenes()[idx], progress, origin + t)?;
            self.sink.push_frame(FrameIndex(n), &frame)?;
            self.frames_pushed = n + 1;
        }
        self.pull_audio(frame_to_sample(total_frames, fps, self.graph.sample_rate()))?;
        self.sink.finish()
    }

    fn pull_audio(&mut self, to_sample: u64) -> ReelResult<()> {
        if to_sample <= self.samples_pushed {
            return Ok(());
        }
        self.audio_buf.clear();
        self.graph
            .render_into(self.samples_pushed, to_sample, &mut self.audio_buf);
        self.sink.push_audio(&self.audio_buf)?;
        self.samples_pushed = to_sample;
        Ok(())
    }

    fn report(&mut self, on_progress: &mut dyn FnMut(f64), raw: f64) {
        let p = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
        let p = p.max(self.last_progress);
        self.last_progress = p;
        on_progress(p);
    }
}

/// Capture `timeline` into `sink`, pacing frames against `clock`.
#[allow(clippy::too_many_arguments)]
pub fn capture(
    timeline: &Timeline,
    graph: &mut ScheduledGraph,
    compositor: &mut FrameCompositor,
    sink: &mut dyn MediaSink,
    clock: &dyn Clock,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(f64),
    opts: &CaptureOpts,
) -> ReelResult<RenderArtifact> {
    Recorder::new(timeline, graph, compositor, sink, clock, cancel, opts).run(on_progress)
}

/// First whole nanosecond at or after `secs`.
fn end_of(secs: f64) -> Duration {
    let d = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
    if d.as_secs_f64() < secs {
        d + Duration::from_nanos(1)
    } else {
        d
    }
}

fn into_capture(e: ReelError) -> ReelError {
    match e {
        ReelError::Capture(_) | ReelError::Cancelled => e,
        other => ReelError::capture(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/recorder.rs"]
mod tests;
