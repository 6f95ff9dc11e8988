use super::*;

use crate::assets::decode::solid_image;
use crate::foundation::core::Rgba8Premul;

fn ring(n: u8) -> Arc<ClipFrames> {
    let frames = (0..n)
        .map(|i| solid_image(2, 2, Rgba8Premul::from_straight_rgba(i, 0, 0, 255)))
        .collect();
    Arc::new(ClipFrames::new(4, frames).unwrap())
}

fn red_of(img: &PreparedImage) -> u8 {
    img.rgba8_premul[0]
}

#[test]
fn clip_frames_reject_empty_and_mismatched() {
    assert!(ClipFrames::new(24, Vec::new()).is_err());
    let a = solid_image(2, 2, Rgba8Premul::transparent());
    let b = solid_image(4, 2, Rgba8Premul::transparent());
    assert!(ClipFrames::new(24, vec![a.clone(), b]).is_err());
    assert!(ClipFrames::new(0, vec![a]).is_err());
}

#[test]
fn ring_wraps_around() {
    let clip = ring(4);
    assert_eq!(clip.loop_secs(), 1.0);
    assert_eq!(red_of(clip.frame_at_position(0.0)), 0);
    assert_eq!(red_of(clip.frame_at_position(0.5)), 2);
    assert_eq!(red_of(clip.frame_at_position(1.25)), 1);
    assert_eq!(red_of(clip.frame_at_position(-3.0)), 0);
    assert_eq!(red_of(clip.frame_at_position(f64::NAN)), 0);
}

#[test]
fn player_advances_only_while_playing() {
    let mut p = ClipPlayer::new(ring(4));
    assert_eq!(red_of(p.frame_at(Duration::from_secs(3))), 0);

    p.play(Duration::from_millis(1000));
    assert!(p.is_playing());
    assert_eq!(red_of(p.frame_at(Duration::from_millis(1500))), 2);

    p.pause(Duration::from_millis(1750));
    assert!(!p.is_playing());
    assert_eq!(red_of(p.frame_at(Duration::from_secs(60))), 3);

    p.play(Duration::from_secs(60));
    assert_eq!(red_of(p.frame_at(Duration::from_millis(60_250))), 0);
}

#[test]
fn repeated_play_keeps_anchor() {
    let mut p = ClipPlayer::new(ring(4));
    p.play(Duration::ZERO);
    p.play(Duration::from_millis(500));
    assert!((p.position_at(Duration::from_millis(750)) - 0.75).abs() < 1e-9);
}

#[test]
fn seek_wraps_and_reanchors_while_playing() {
    let mut p = ClipPlayer::new(ring(4));
    p.seek(2.5);
    assert!((p.position_at(Duration::ZERO) - 0.5).abs() < 1e-9);

    p.play(Duration::from_secs(1));
    let _ = p.frame_at(Duration::from_secs(2));
    p.seek(0.25);
    assert!((p.position_at(Duration::from_secs(2)) - 0.25).abs() < 1e-9);
    assert!((p.position_at(Duration::from_millis(2500)) - 0.75).abs() < 1e-9);
}

#[test]
fn budget_is_split_between_clips() {
    let opts = ClipDecodeOpts::default();
    assert_eq!(opts.shared_by(0), opts);
    assert_eq!(opts.shared_by(1), opts);
    let quarter = opts.shared_by(4);
    assert_eq!(quarter.ring_budget_bytes, opts.ring_budget_bytes / 4);
    assert_eq!(quarter.decode_fps, opts.decode_fps);
    assert_eq!(quarter.timeout, opts.timeout);
}
