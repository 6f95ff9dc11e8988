use crate::assets::resolver::{ResolvedScene, ResolvedVisual};
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::scene::{MotionProfile, Scene};

/// Ordered scenes with their cumulative start offsets. Immutable once built.
#[derive(Clone, Debug)]
pub struct Timeline {
    scenes: Vec<Scene>,
    /// `n + 1` entries; the last one is the total duration.
    offsets: Vec<f64>,
}

impl Timeline {
    /// Assign durations and motions and accumulate start offsets.
    pub fn build(resolved: Vec<ResolvedScene>) -> ReelResult<Self> {
        if resolved.is_empty() {
            return Err(ReelError::validation("timeline needs at least one scene"));
        }
        let scenes = resolved
            .into_iter()
            .enumerate()
            .map(|(i, r)| Scene::new(i, r))
            .collect::<Vec<_>>();

        let mut offsets = Vec::with_capacity(scenes.len() + 1);
        let mut acc = 0.0f64;
        offsets.push(acc);
        for s in &scenes {
            acc += s.duration;
            offsets.push(acc);
        }
        tracing::debug!(scenes = scenes.len(), total = acc, "timeline built");
        Ok(Self { scenes, offsets })
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Start offset of every scene, followed by the total duration.
    pub fn start_offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn start_offset(&self, index: usize) -> Option<f64> {
        (index < self.scenes.len()).then(|| self.offsets[index])
    }

    pub fn total_duration(&self) -> f64 {
        self.offsets[self.scenes.len()]
    }

    /// Scene index and intra-scene progress at `elapsed` seconds.
    ///
    /// Progress is in `[0, 1)` inside the timeline; at or past the end it is the last scene at
    /// `1.0`, and negative or NaN input maps to the first scene at `0.0`.
    pub fn scene_at(&self, elapsed: f64) -> (usize, f64) {
        let last = self.scenes.len() - 1;
        if elapsed.is_nan() || elapsed <= 0.0 {
            return (0, 0.0);
        }
        if elapsed >= self.total_duration() {
            return (last, 1.0);
        }
        let idx = self.offsets[1..]
            .partition_point(|&end| end <= elapsed)
            .min(last);
        let start = self.offsets[idx];
        let duration = self.scenes[idx].duration;
        let progress = ((elapsed - start) / duration).clamp(0.0, 1.0);
        (idx, if progress >= 1.0 { 1.0 - f64::EPSILON } else { progress })
    }

    /// Serializable description of the schedule.
    pub fn summary(&self) -> TimelinePlan {
        TimelinePlan {
            total_duration: self.total_duration(),
            scenes: self
                .scenes
                .iter()
                .map(|s| ScenePlan {
                    index: s.index,
                    start: self.offsets[s.index],
                    duration: s.duration,
                    motion: s.motion,
                    visual: match &s.visual {
                        ResolvedVisual::Image(_) => "image",
                        ResolvedVisual::Clip(_) => "clip",
                        ResolvedVisual::Placeholder(_) => "placeholder",
                    }
                    .to_string(),
                    narration_secs: s.narration.as_ref().map(|n| n.duration_secs()),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelinePlan {
    pub total_duration: f64,
    pub scenes: Vec<ScenePlan>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScenePlan {
    pub index: usize,
    pub start: f64,
    pub duration: f64,
    pub motion: MotionProfile,
    pub visual: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_secs: Option<f64>,
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/schedule.rs"]
mod tests;
