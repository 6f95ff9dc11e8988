use super::*;

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn burst_shrinks_from_overzoom() {
    let c = Canvas::PORTRAIT_720;
    let s = motion_at(MotionProfile::PanLeft, 0.0, c);
    assert!(near(s.zoom, 1.25));
    assert!(near(s.offset_x, 0.0));
    assert!(near(s.flash_alpha, 0.4));
    let s = motion_at(MotionProfile::ZoomIn, 0.1, c);
    assert!(near(s.zoom, 1.05));
    assert!(near(s.flash_alpha, 0.0));
}

#[test]
fn flash_fades_linearly() {
    let s = motion_at(MotionProfile::ZoomIn, 0.05, Canvas::PORTRAIT_720);
    assert!(near(s.flash_alpha, 0.2));
}

#[test]
fn drift_per_profile() {
    let c = Canvas::PORTRAIT_720;
    assert!(near(motion_at(MotionProfile::ZoomIn, 0.5, c).zoom, 1.075));
    assert!(near(motion_at(MotionProfile::ZoomOut, 1.0, c).zoom, 1.0));
    assert!(near(motion_at(MotionProfile::ZoomOut, 0.2, c).zoom, 1.12));

    let left = motion_at(MotionProfile::PanLeft, 1.0, c);
    assert!(near(left.zoom, 1.0));
    assert!(near(left.offset_x, 30.0));
    let right = motion_at(MotionProfile::PanRight, 1.0, c);
    assert!(near(right.offset_x, -30.0));
    assert!(near(motion_at(MotionProfile::PanRight, 0.5, c).offset_x, 0.0));
}

#[test]
fn pan_travel_scales_with_canvas_width() {
    let c = Canvas {
        width: 360,
        height: 640,
    };
    assert!(near(motion_at(MotionProfile::PanLeft, 1.0, c).offset_x, 15.0));
}

#[test]
fn out_of_range_progress_is_clamped() {
    let c = Canvas::PORTRAIT_720;
    assert_eq!(
        motion_at(MotionProfile::ZoomIn, -1.0, c),
        motion_at(MotionProfile::ZoomIn, 0.0, c)
    );
    assert_eq!(
        motion_at(MotionProfile::ZoomIn, f64::NAN, c),
        motion_at(MotionProfile::ZoomIn, 0.0, c)
    );
}

#[test]
fn cover_rect_fills_canvas_for_wide_and_tall_sources() {
    let c = Canvas::PORTRAIT_720;
    let wide = cover_rect(16.0 / 9.0, c, 1.0, 0.0);
    assert!(near(wide.height(), 1280.0));
    assert!(wide.width() > 720.0);
    assert!(near(wide.x0 + wide.x1, 720.0));

    let tall = cover_rect(0.5, c, 1.0, 0.0);
    assert!(near(tall.width(), 720.0));
    assert!(near(tall.height(), 1440.0));
    assert!(near(tall.y0, -80.0));

    let exact = cover_rect(720.0 / 1280.0, c, 1.0, 0.0);
    assert!(near(exact.x0, 0.0) && near(exact.y1, 1280.0));
}

#[test]
fn cover_rect_applies_zoom_and_offset() {
    let c = Canvas::PORTRAIT_720;
    let r = cover_rect(720.0 / 1280.0, c, 1.25, 30.0);
    assert!(near(r.width(), 900.0));
    assert!(near(r.x0, -90.0 + 30.0));
    assert!(near(r.y0, -160.0));
}
