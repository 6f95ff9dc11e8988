use crate::assets::audio::AudioClip;
use crate::foundation::core::Fps;

/// Output channel count of the program mix.
pub const MIX_CHANNELS: u16 = 2;

/// Add `clip` into the interleaved stereo window `out`, which covers output samples
/// `[window_start, window_start + out.len() / 2)`.
///
/// The clip starts sounding at output sample `onset_sample`. `gains[i]` scales output sample
/// `window_start + i`. Sources are resampled with linear interpolation and mono is copied to both
/// channels.
pub(crate) fn mix_clip_into(
    out: &mut [f32],
    window_start: u64,
    gains: &[f32],
    clip: &AudioClip,
    onset_sample: u64,
    out_rate: u32,
    looped: bool,
) {
    let channels = usize::from(clip.channels);
    let src = clip.interleaved_f32.as_slice();
    let src_frames = clip.frames();
    if src_frames == 0 {
        return;
    }
    let window_len = out.len() / usize::from(MIX_CHANNELS);
    let first = onset_sample.saturating_sub(window_start) as usize;
    let step = f64::from(clip.sample_rate) / f64::from(out_rate);

    for i in first..window_len {
        let rel = (window_start + i as u64 - onset_sample) as f64;
        let mut src_pos = rel * step;
        if looped {
            src_pos = src_pos.rem_euclid(src_frames as f64);
        }
        let frame0 = src_pos.floor() as usize;
        if frame0 >= src_frames {
            break;
        }
        let frame1 = if frame0 + 1 < src_frames {
            frame0 + 1
        } else if looped {
            0
        } else {
            frame0
        };
        let frac = (src_pos - frame0 as f64) as f32;

        let (l, r) = if channels == 1 {
            let v0 = src[frame0];
            let v1 = src[frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = frame0 * channels;
            let i1 = frame1 * channels;
            let (l0, l1) = (src[i0], src[i1]);
            let (r0, r1) = (src[i0 + 1], src[i1 + 1]);
            (l0 + ((l1 - l0) * frac), r0 + ((r1 - r0) * frac))
        };

        let gain = gains[i];
        out[i * 2] += l * gain;
        out[i * 2 + 1] += r * gain;
    }
}

pub(crate) fn clamp_unit(samples: &mut [f32]) {
    for s in samples {
        *s = s.clamp(-1.0, 1.0);
    }
}

/// Interleaved `f32` PCM as raw little-endian bytes.
pub(crate) fn f32le_bytes(samples_interleaved: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Convert a frame count to the nearest sample index at `sample_rate`.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
