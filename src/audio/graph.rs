use std::time::Duration;

use crate::assets::audio::AudioClip;
use crate::assets::media::MIX_SAMPLE_RATE;
use crate::audio::mix::{MIX_CHANNELS, clamp_unit, mix_clip_into};
use crate::audio::param::AudioParam;
use crate::foundation::error::ReelResult;
use crate::timeline::schedule::Timeline;

/// Music starts dipping this long before a narration onset.
pub const DUCK_LEAD: f64 = 0.2;
/// Ducked music level as a fraction of the bed volume.
pub const DUCK_FLOOR: f32 = 0.15;
/// Time for the music to climb back after narration ends.
pub const RECOVERY: f64 = 0.5;
/// Gain of the narration bus.
pub const NARRATION_BOOST: f32 = 1.2;
/// Gap between "now" and the clock origin all sources are scheduled against.
pub const LEAD_IN: Duration = Duration::from_millis(300);
/// Upper end of the recognized music volume range.
pub const MUSIC_VOLUME_MAX: f32 = 0.5;

/// How overlapping duck windows are written to the music gain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuckingPolicy {
    /// One down/up envelope per narrated scene, written in scene order. Closely spaced scenes can
    /// let an earlier recovery ramp interleave with the next duck.
    #[default]
    Sequential,
    /// Windows closer than `DUCK_LEAD + RECOVERY` are coalesced into one continuous duck.
    Merged,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MixOpts {
    pub ducking: DuckingPolicy,
    pub narration_gain: f32,
    pub master_gain: f32,
    pub sample_rate: u32,
}

impl Default for MixOpts {
    fn default() -> Self {
        Self {
            ducking: DuckingPolicy::Sequential,
            narration_gain: NARRATION_BOOST,
            master_gain: 1.0,
            sample_rate: MIX_SAMPLE_RATE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bus {
    Music,
    Narration,
}

/// A single-use source connected to one bus.
#[derive(Clone, Debug)]
pub struct ScheduledSource {
    pub clip: AudioClip,
    pub bus: Bus,
    /// Absolute clock time at which the source starts sounding.
    pub onset: Duration,
    /// Output sample (relative to the clock origin) matching `onset`.
    pub onset_sample: u64,
    pub looped: bool,
    /// Scene that owns a narration source.
    pub scene: Option<usize>,
    released: bool,
}

impl ScheduledSource {
    pub fn is_released(&self) -> bool {
        self.released
    }
}

/// Gain stages of the fixed mix graph: `master <- music_gain`, `master <- narration_gain`.
#[derive(Clone, Debug)]
pub struct MixGraph {
    pub master_gain: AudioParam,
    pub music_gain: AudioParam,
    pub narration_gain: AudioParam,
}

impl MixGraph {
    pub fn new(music_volume: f32, opts: &MixOpts) -> Self {
        Self {
            master_gain: AudioParam::new(opts.master_gain),
            music_gain: AudioParam::new(music_volume),
            narration_gain: AudioParam::new(opts.narration_gain),
        }
    }

    /// Build the graph and schedule every source and the ducking envelope against `clock_origin`.
    #[tracing::instrument(skip(timeline, music, opts), fields(scenes = timeline.len(), music = music.is_some()))]
    pub fn schedule(
        timeline: &Timeline,
        music: Option<&AudioClip>,
        music_volume: f32,
        clock_origin: Duration,
        opts: &MixOpts,
    ) -> ReelResult<ScheduledGraph> {
        let music_volume = clamp_music_volume(music_volume);
        let mut graph = Self::new(music_volume, opts);
        let origin_secs = clock_origin.as_secs_f64();
        let sample_rate = opts.sample_rate;
        let mut sources = Vec::new();

        if let Some(bed) = music {
            sources.push(ScheduledSource {
                clip: bed.clone(),
                bus: Bus::Music,
                onset: clock_origin,
                onset_sample: 0,
                looped: true,
                scene: None,
                released: false,
            });
        }

        let mut windows = Vec::new();
        for scene in timeline.scenes() {
            let Some(clip) = &scene.narration else {
                continue;
            };
            let offset = timeline.start_offsets()[scene.index];
            let start = origin_secs + offset;
            sources.push(ScheduledSource {
                clip: clip.clone(),
                bus: Bus::Narration,
                onset: clock_origin + Duration::from_secs_f64(offset),
                onset_sample: (offset * f64::from(sample_rate)).round() as u64,
                looped: false,
                scene: Some(scene.index),
                released: false,
            });
            windows.push((start, start + clip.duration_secs()));
        }

        if music_volume > 0.0 {
            if opts.ducking == DuckingPolicy::Merged {
                windows = merge_windows(&windows, DUCK_LEAD + RECOVERY);
            }
            for (start, end) in windows {
                graph.duck(music_volume, start, end)?;
            }
        }

        tracing::debug!(
            sources = sources.len(),
            music_events = graph.music_gain.event_count(),
            "mix graph scheduled"
        );
        Ok(ScheduledGraph {
            graph,
            sources,
            origin: clock_origin,
            sample_rate,
        })
    }

    fn duck(&mut self, volume: f32, start: f64, end: f64) -> ReelResult<()> {
        let floor = volume * DUCK_FLOOR;
        self.music_gain.set_value_at_time(volume, start - DUCK_LEAD)?;
        self.music_gain.exponential_ramp_to_value_at_time(floor, start)?;
        self.music_gain.set_value_at_time(floor, end)?;
        self.music_gain
            .exponential_ramp_to_value_at_time(volume, end + RECOVERY)
    }
}

fn clamp_music_volume(v: f32) -> f32 {
    if v.is_finite() && (0.0..=MUSIC_VOLUME_MAX).contains(&v) {
        return v;
    }
    let clamped = if v.is_finite() {
        v.clamp(0.0, MUSIC_VOLUME_MAX)
    } else {
        0.0
    };
    tracing::warn!(requested = v, used = clamped, "music volume out of range, clamped");
    clamped
}

/// Coalesce `(start, end)` windows whose gap is shorter than `min_gap`. Input is in start order.
pub(crate) fn merge_windows(windows: &[(f64, f64)], min_gap: f64) -> Vec<(f64, f64)> {
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(windows.len());
    for &(start, end) in windows {
        match merged.last_mut() {
            Some(last) if start - last.1 < min_gap => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// A mix graph with all sources scheduled; renders program audio on demand.
#[derive(Clone, Debug)]
pub struct ScheduledGraph {
    graph: MixGraph,
    sources: Vec<ScheduledSource>,
    origin: Duration,
    sample_rate: u32,
}

impl ScheduledGraph {
    pub fn gains(&self) -> &MixGraph {
        &self.graph
    }

    pub fn music_gain(&self) -> &AudioParam {
        &self.graph.music_gain
    }

    pub fn sources(&self) -> &[ScheduledSource] {
        &self.sources
    }

    pub fn origin(&self) -> Duration {
        self.origin
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        MIX_CHANNELS
    }

    /// Release every source whose onset is after `at`; released sources never sound.
    pub fn release_pending(&mut self, at: Duration) -> usize {
        let mut released = 0;
        for src in self.sources.iter_mut().filter(|s| !s.released && s.onset > at) {
            src.released = true;
            released += 1;
        }
        if released > 0 {
            tracing::debug!(released, "pending sources released");
        }
        released
    }

    /// Append interleaved stereo samples `[from_sample, to_sample)` (relative to the clock
    /// origin) to `out`.
    pub fn render_into(&self, from_sample: u64, to_sample: u64, out: &mut Vec<f32>) {
        if to_sample <= from_sample {
            return;
        }
        let frames = (to_sample - from_sample) as usize;
        let base = out.len();
        out.resize(base + frames * usize::from(MIX_CHANNELS), 0.0);
        let window = &mut out[base..];

        let step = 1.0 / f64::from(self.sample_rate);
        let t0 = self.origin.as_secs_f64() + (from_sample as f64) * step;
        let mut master = vec![0.0f32; frames];
        self.graph.master_gain.fill_values(t0, step, &mut master);
        let mut bus = vec![0.0f32; frames];

        for b in [Bus::Music, Bus::Narration] {
            let param = match b {
                Bus::Music => &self.graph.music_gain,
                Bus::Narration => &self.graph.narration_gain,
            };
            let mut live = self
                .sources
                .iter()
                .filter(|s| s.bus == b && !s.released && s.onset_sample < to_sample)
                .peekable();
            if live.peek().is_none() {
                continue;
            }
            param.fill_values(t0, step, &mut bus);
            for (g, m) in bus.iter_mut().zip(&master) {
                *g *= *m;
            }
            for src in live {
                mix_clip_into(
                    window,
                    from_sample,
                    &bus,
                    &src.clip,
                    src.onset_sample,
                    self.sample_rate,
                    src.looped,
                );
            }
        }
        clamp_unit(window);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/graph.rs"]
mod tests;
