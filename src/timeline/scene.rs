use crate::assets::audio::AudioClip;
use crate::assets::resolver::{ResolvedScene, ResolvedVisual};

/// Minimum on-screen time of a scene, used when it has no (or very short) narration.
pub const FLOOR_DURATION: f64 = 1.5;

/// Camera motion applied after the opening burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionProfile {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
}

/// Motions assigned round-robin by scene index.
pub const MOTION_SET: [MotionProfile; 4] = [
    MotionProfile::ZoomIn,
    MotionProfile::ZoomOut,
    MotionProfile::PanLeft,
    MotionProfile::PanRight,
];

impl MotionProfile {
    pub fn for_index(index: usize) -> Self {
        MOTION_SET[index % MOTION_SET.len()]
    }
}

/// One scene of the timeline.
#[derive(Clone, Debug)]
pub struct Scene {
    pub index: usize,
    pub visual: ResolvedVisual,
    pub narration: Option<AudioClip>,
    pub motion: MotionProfile,
    /// Seconds on screen: `max(narration length, FLOOR_DURATION)`.
    pub duration: f64,
}

impl Scene {
    pub fn new(index: usize, resolved: ResolvedScene) -> Self {
        let duration = scene_duration(resolved.narration.as_ref());
        Self {
            index,
            visual: resolved.visual,
            narration: resolved.narration,
            motion: MotionProfile::for_index(index),
            duration,
        }
    }

    /// Length of the narration in seconds, or 0 without narration.
    pub fn narration_secs(&self) -> f64 {
        self.narration.as_ref().map_or(0.0, AudioClip::duration_secs)
    }
}

pub fn scene_duration(narration: Option<&AudioClip>) -> f64 {
    let spoken = narration.map_or(0.0, AudioClip::duration_secs);
    if spoken.is_finite() {
        spoken.max(FLOOR_DURATION)
    } else {
        FLOOR_DURATION
    }
}
