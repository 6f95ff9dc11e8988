use std::sync::Arc;

use super::*;

use crate::assets::clip::ClipFrames;
use crate::assets::decode::solid_image;
use crate::foundation::core::Rgba8Premul;
use crate::timeline::scene::MotionProfile;

const SMALL: Canvas = Canvas {
    width: 36,
    height: 64,
};

fn gray_scene(motion: MotionProfile) -> Scene {
    Scene {
        index: 0,
        visual: ResolvedVisual::Image(solid_image(
            9,
            16,
            Rgba8Premul::from_straight_rgba(100, 100, 100, 255),
        )),
        narration: None,
        motion,
        duration: 1.5,
    }
}

fn luma(frame: &FrameRGBA, x: u32, y: u32) -> u8 {
    frame.pixel(x, y).unwrap()[1]
}

#[test]
fn rejects_invalid_canvas() {
    assert!(FrameCompositor::new(Canvas {
        width: 35,
        height: 64
    })
    .is_err());
}

#[test]
fn frame_has_canvas_size_and_is_opaque() {
    let mut c = FrameCompositor::new(SMALL).unwrap();
    let f = c
        .render(&gray_scene(MotionProfile::ZoomIn), 0.5, Duration::ZERO)
        .unwrap();
    assert_eq!((f.width, f.height), (36, 64));
    assert_eq!(f.data.len(), 36 * 64 * 4);
    assert!(f.premultiplied);
    assert!(f.data.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn image_frames_are_bit_identical_across_renders() {
    let scene = gray_scene(MotionProfile::PanRight);
    let mut a = FrameCompositor::new(SMALL).unwrap();
    let mut b = FrameCompositor::new(SMALL).unwrap();
    for p in [0.0, 0.05, 0.3, 0.99] {
        let fa = a.render(&scene, p, Duration::from_secs(1)).unwrap();
        let again = a.render(&scene, p, Duration::from_secs(9)).unwrap();
        let fb = b.render(&scene, p, Duration::ZERO).unwrap();
        assert_eq!(fa, again);
        assert_eq!(fa, fb);
    }
}

#[test]
fn flash_brightens_the_opening_frames() {
    let mut c = FrameCompositor::new(SMALL).unwrap();
    let scene = gray_scene(MotionProfile::ZoomIn);
    let opening = c.render(&scene, 0.0, Duration::ZERO).unwrap();
    let later = c.render(&scene, 0.5, Duration::ZERO).unwrap();
    assert!(luma(&opening, 18, 4) > 150);
    assert!(luma(&later, 18, 4).abs_diff(100) <= 2);
}

#[test]
fn vignette_darkens_the_bottom() {
    let mut c = FrameCompositor::new(SMALL).unwrap();
    let f = c
        .render(&gray_scene(MotionProfile::ZoomOut), 0.5, Duration::ZERO)
        .unwrap();
    let top = luma(&f, 18, 4);
    let upper_band = luma(&f, 18, 30);
    let bottom = luma(&f, 18, 63);
    assert_eq!(top, upper_band);
    assert!(bottom < 40, "bottom={bottom}");
    assert!(luma(&f, 18, 50) < top);
}

#[test]
fn pan_reveals_black_background_at_edge() {
    let mut c = FrameCompositor::new(SMALL).unwrap();
    let f = c
        .render(&gray_scene(MotionProfile::PanLeft), 1.0, Duration::ZERO)
        .unwrap();
    assert_eq!(f.pixel(0, 4).unwrap(), [0, 0, 0, 255]);
    assert!(luma(&f, 18, 4).abs_diff(100) <= 2);
}

#[test]
fn clip_scenes_advance_with_wall_time() {
    let frames = (0..4u8)
        .map(|i| solid_image(9, 16, Rgba8Premul::from_straight_rgba(i * 60, 0, 0, 255)))
        .collect();
    let clip = Arc::new(ClipFrames::new(4, frames).unwrap());
    let scene = Scene {
        index: 3,
        visual: ResolvedVisual::Clip(clip),
        narration: None,
        motion: MotionProfile::ZoomIn,
        duration: 2.0,
    };
    let mut c = FrameCompositor::new(SMALL).unwrap();
    let first = c.render(&scene, 0.5, Duration::from_secs(10)).unwrap();
    let second = c
        .render(&scene, 0.5, Duration::from_millis(10_500))
        .unwrap();
    assert!(first.pixel(18, 4).unwrap()[0] < 10);
    assert!(second.pixel(18, 4).unwrap()[0].abs_diff(120) <= 3);
}
