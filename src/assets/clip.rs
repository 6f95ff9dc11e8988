use std::sync::Arc;
use std::time::Duration;

use crate::assets::decode::PreparedImage;
use crate::foundation::error::{ReelError, ReelResult};

/// Bounded wait for probing and pre-decoding one clip.
pub const CLIP_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for clip pre-decoding.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClipDecodeOpts {
    /// Rate at which frames are sampled from the source.
    pub decode_fps: u32,
    /// Memory cap shared by every clip ring of one render. A clip longer than its share loops
    /// over the frames that fit.
    pub ring_budget_bytes: u64,
    /// The ffmpeg child is killed once this elapses.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for ClipDecodeOpts {
    fn default() -> Self {
        Self {
            decode_fps: 24,
            ring_budget_bytes: 512 << 20,
            timeout: CLIP_TIMEOUT,
        }
    }
}

impl ClipDecodeOpts {
    /// Options for one of `clips` rings decoded together: each gets an equal slice of the budget.
    pub fn shared_by(&self, clips: usize) -> Self {
        let clips = u64::try_from(clips.max(1)).unwrap_or(u64::MAX);
        Self {
            ring_budget_bytes: self.ring_budget_bytes / clips,
            ..self.clone()
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = <f64 as serde::Deserialize>::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// A decoded ring of clip frames, looped on playback.
#[derive(Clone, Debug)]
pub struct ClipFrames {
    decode_fps: u32,
    frames: Vec<PreparedImage>,
}

impl ClipFrames {
    pub fn new(decode_fps: u32, frames: Vec<PreparedImage>) -> ReelResult<Self> {
        if decode_fps == 0 {
            return Err(ReelError::validation("clip decode_fps must be non-zero"));
        }
        let Some(first) = frames.first() else {
            return Err(ReelError::asset_decode("clip decoded to zero frames"));
        };
        if frames
            .iter()
            .any(|f| f.width != first.width || f.height != first.height)
        {
            return Err(ReelError::asset_decode("clip frames differ in size"));
        }
        Ok(Self { decode_fps, frames })
    }

    pub fn decode_fps(&self) -> u32 {
        self.decode_fps
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Length of one pass through the ring.
    pub fn loop_secs(&self) -> f64 {
        self.frames.len() as f64 / f64::from(self.decode_fps)
    }

    /// Width over height of the decoded frames.
    pub fn aspect(&self) -> f64 {
        self.frames[0].aspect()
    }

    /// Frame shown at `position_secs` into playback, wrapping around the ring.
    pub fn frame_at_position(&self, position_secs: f64) -> &PreparedImage {
        let pos = if position_secs.is_finite() {
            position_secs.max(0.0)
        } else {
            0.0
        };
        let idx = (pos * f64::from(self.decode_fps)).floor() as u64;
        &self.frames[(idx % self.frames.len() as u64) as usize]
    }
}

/// Playback handle over [`ClipFrames`]: muted, looped, advanced by wall time.
#[derive(Clone, Debug)]
pub struct ClipPlayer {
    frames: Arc<ClipFrames>,
    anchor_pos: f64,
    anchor_wall: Option<Duration>,
    last_wall: Duration,
}

impl ClipPlayer {
    pub fn new(frames: Arc<ClipFrames>) -> Self {
        Self {
            frames,
            anchor_pos: 0.0,
            anchor_wall: None,
            last_wall: Duration::ZERO,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.anchor_wall.is_some()
    }

    /// Start advancing from the current position. No-op while already playing.
    pub fn play(&mut self, at: Duration) {
        self.last_wall = at;
        if self.anchor_wall.is_none() {
            self.anchor_wall = Some(at);
        }
    }

    /// Freeze the position reached at wall time `at`.
    pub fn pause(&mut self, at: Duration) {
        self.anchor_pos = self.position_at(at);
        self.anchor_wall = None;
        self.last_wall = at;
    }

    /// Jump to `secs` into the clip (wrapped to the ring length).
    pub fn seek(&mut self, secs: f64) {
        let len = self.frames.loop_secs();
        self.anchor_pos = if secs.is_finite() && len > 0.0 {
            secs.rem_euclid(len)
        } else {
            0.0
        };
        if self.anchor_wall.is_some() {
            self.anchor_wall = Some(self.last_wall);
        }
    }

    /// Playback position in seconds at wall time `at`.
    pub fn position_at(&self, at: Duration) -> f64 {
        match self.anchor_wall {
            Some(anchor) => self.anchor_pos + at.saturating_sub(anchor).as_secs_f64(),
            None => self.anchor_pos,
        }
    }

    /// Frame visible at wall time `at`.
    pub fn frame_at(&mut self, at: Duration) -> &PreparedImage {
        self.last_wall = at;
        let pos = self.position_at(at);
        self.frames.frame_at_position(pos)
    }

    pub fn frames(&self) -> &Arc<ClipFrames> {
        &self.frames
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/clip.rs"]
mod tests;
