//! Per-frame camera math for a scene: opening burst, Ken-Burns drift, flash and cover fit.

use crate::foundation::core::{Canvas, Rect};
use crate::timeline::scene::MotionProfile;

/// Progress at which the opening burst hands over to the scene's drift.
pub const BURST_END: f64 = 0.12;
pub const BURST_ZOOM: f64 = 1.25;
pub const BURST_RATE: f64 = 2.0;
/// Total zoom change over a zoom-in / zoom-out scene.
pub const DRIFT_ZOOM: f64 = 0.15;
/// Horizontal pan travel in pixels on a 720 px wide canvas.
pub const PAN_TRAVEL: f64 = 60.0;
pub const FLASH_END: f64 = 0.10;
pub const FLASH_PEAK: f64 = 0.4;
/// Vignette starts at this fraction of the canvas height.
pub const VIGNETTE_TOP: f64 = 0.625;
pub const VIGNETTE_ALPHA: f64 = 0.7;

/// Camera state for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    pub zoom: f64,
    pub offset_x: f64,
    /// Opacity of the white flash overlay, 0 when absent.
    pub flash_alpha: f64,
}

pub fn motion_at(motion: MotionProfile, progress: f64, canvas: Canvas) -> MotionState {
    let p = if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let pan = PAN_TRAVEL * f64::from(canvas.width) / 720.0;

    let (zoom, offset_x) = if p < BURST_END {
        (BURST_ZOOM - p * BURST_RATE, 0.0)
    } else {
        match motion {
            MotionProfile::ZoomIn => (1.0 + p * DRIFT_ZOOM, 0.0),
            MotionProfile::ZoomOut => (1.0 + DRIFT_ZOOM - p * DRIFT_ZOOM, 0.0),
            MotionProfile::PanLeft => (1.0, (p - 0.5) * pan),
            MotionProfile::PanRight => (1.0, (0.5 - p) * pan),
        }
    };

    let flash_alpha = if p < FLASH_END {
        FLASH_PEAK * (1.0 - p / FLASH_END)
    } else {
        0.0
    };

    MotionState {
        zoom,
        offset_x,
        flash_alpha,
    }
}

/// Destination rectangle that covers `canvas` for a source of aspect `src_aspect`, scaled by
/// `zoom`, centred and shifted horizontally by `offset_x`.
pub fn cover_rect(src_aspect: f64, canvas: Canvas, zoom: f64, offset_x: f64) -> Rect {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let (dw, dh) = if src_aspect > w / h {
        (h * src_aspect * zoom, h * zoom)
    } else {
        (w * zoom, w / src_aspect * zoom)
    };
    let x = (w - dw) / 2.0 + offset_x;
    let y = (h - dh) / 2.0;
    Rect::new(x, y, x + dw, y + dh)
}

#[cfg(test)]
#[path = "../../tests/unit/render/motion.rs"]
mod tests;
