use super::*;

#[test]
fn frame_to_sample_uses_rational_fps() {
    let fps = Fps {
        num: 30_000,
        den: 1001,
    };
    assert_eq!(frame_to_sample(0, fps, 48_000), 0);
    assert_eq!(frame_to_sample(1, fps, 48_000), 1602);
    assert_eq!(frame_to_sample(390, Fps { num: 60, den: 1 }, 48_000), 312_000);
}

#[test]
fn mono_is_duplicated_and_resampled() {
    // 24 kHz ramp into a 48 kHz window: every other output sample is interpolated.
    let clip = AudioClip::new(24_000, 1, vec![0.0, 0.5, 1.0]).unwrap();
    let mut out = vec![0.0f32; 8];
    mix_clip_into(&mut out, 0, &[1.0; 4], &clip, 0, 48_000, false);
    assert_eq!(out, vec![0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75]);
}

#[test]
fn onset_inside_window_and_gain() {
    let clip = AudioClip::new(48_000, 2, vec![1.0, -1.0, 1.0, -1.0]).unwrap();
    let mut out = vec![0.0f32; 8];
    mix_clip_into(&mut out, 10, &[0.5; 4], &clip, 12, 48_000, false);
    assert_eq!(out, vec![0.0, 0.0, 0.0, 0.0, 0.5, -0.5, 0.5, -0.5]);
}

#[test]
fn onset_before_window_is_offset() {
    let clip = AudioClip::new(48_000, 1, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
    let mut out = vec![0.0f32; 4];
    mix_clip_into(&mut out, 102, &[1.0; 2], &clip, 100, 48_000, false);
    assert_eq!(out, vec![0.3, 0.3, 0.4, 0.4]);
}

#[test]
fn one_shot_stops_and_loop_wraps() {
    let clip = AudioClip::new(48_000, 1, vec![0.25, 0.5]).unwrap();
    let mut once = vec![0.0f32; 8];
    mix_clip_into(&mut once, 0, &[1.0; 4], &clip, 0, 48_000, false);
    assert_eq!(&once[4..], &[0.0; 4]);

    let mut looped = vec![0.0f32; 8];
    mix_clip_into(&mut looped, 0, &[1.0; 4], &clip, 0, 48_000, true);
    assert_eq!(looped, vec![0.25, 0.25, 0.5, 0.5, 0.25, 0.25, 0.5, 0.5]);
}

#[test]
fn clamp_and_bytes() {
    let mut s = vec![1.5, -2.0, 0.25];
    clamp_unit(&mut s);
    assert_eq!(s, vec![1.0, -1.0, 0.25]);
    let b = f32le_bytes(&[1.0]);
    assert_eq!(b, 1.0f32.to_le_bytes().to_vec());
}
