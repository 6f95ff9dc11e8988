use std::collections::HashMap;
use std::time::Duration;

use crate::assets::clip::ClipPlayer;
use crate::assets::resolver::ResolvedVisual;
use crate::foundation::core::{Affine, Canvas, Vec2};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::{FrameRGBA, affine_to_cpu, image_paint, pixmap_from_premul_bytes};
use crate::render::motion::{VIGNETTE_ALPHA, VIGNETTE_TOP, cover_rect, motion_at};
use crate::timeline::scene::Scene;

#[derive(Clone)]
struct StillPaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

/// Draws output frames for timeline scenes on the CPU.
///
/// Keeps one `vello_cpu` render context, decoded still paints per scene, the vignette image, and
/// a clip player per clip-backed scene across frames.
pub struct FrameCompositor {
    canvas: Canvas,
    ctx: Option<vello_cpu::RenderContext>,
    stills: HashMap<usize, StillPaint>,
    players: HashMap<usize, ClipPlayer>,
    vignette: Option<vello_cpu::Image>,
    active_clip: Option<usize>,
}

impl FrameCompositor {
    pub fn new(canvas: Canvas) -> ReelResult<Self> {
        canvas.validate()?;
        Ok(Self {
            canvas,
            ctx: None,
            stills: HashMap::new(),
            players: HashMap::new(),
            vignette: None,
            active_clip: None,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Compose the frame for `scene` at intra-scene `progress`. `wall` advances clip playback.
    pub fn render(&mut self, scene: &Scene, progress: f64, wall: Duration) -> ReelResult<FrameRGBA> {
        let (w16, h16) = self.size_u16()?;
        let width = f64::from(self.canvas.width);
        let height = f64::from(self.canvas.height);

        let (paint, src_w, src_h) = self.paint_for(scene, wall)?;
        let vignette = self.vignette_paint()?;
        let state = motion_at(scene.motion, progress, self.canvas);
        let dst = cover_rect(
            f64::from(src_w) / f64::from(src_h.max(1)),
            self.canvas,
            state.zoom,
            state.offset_x,
        );

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, width, height));

        let tr = Affine::translate(Vec2::new(dst.x0, dst.y0)).pre_scale_non_uniform(
            dst.width() / f64::from(src_w),
            dst.height() / f64::from(src_h),
        );
        ctx.set_transform(affine_to_cpu(tr));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(src_w),
            f64::from(src_h),
        ));

        if state.flash_alpha > 0.0 {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
            ctx.push_opacity_layer(state.flash_alpha as f32);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, width, height));
            ctx.pop_layer();
        }

        let top = (height * VIGNETTE_TOP).round();
        ctx.set_transform(affine_to_cpu(Affine::translate(Vec2::new(0.0, top))));
        ctx.set_paint(vignette);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, width, height - top));

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn size_u16(&self) -> ReelResult<(u16, u16)> {
        let w = u16::try_from(self.canvas.width)
            .map_err(|_| ReelError::validation("canvas width exceeds u16"))?;
        let h = u16::try_from(self.canvas.height)
            .map_err(|_| ReelError::validation("canvas height exceeds u16"))?;
        Ok((w, h))
    }

    fn paint_for(&mut self, scene: &Scene, wall: Duration) -> ReelResult<(vello_cpu::Image, u32, u32)> {
        match &scene.visual {
            ResolvedVisual::Image(img) | ResolvedVisual::Placeholder(img) => {
                self.pause_active_clip(None, wall);
                if let Some(p) = self.stills.get(&scene.index) {
                    return Ok((p.paint.clone(), p.w, p.h));
                }
                let still = StillPaint {
                    paint: image_paint(img)?,
                    w: img.width,
                    h: img.height,
                };
                self.stills.insert(scene.index, still.clone());
                Ok((still.paint, still.w, still.h))
            }
            ResolvedVisual::Clip(frames) => {
                self.pause_active_clip(Some(scene.index), wall);
                let player = self
                    .players
                    .entry(scene.index)
                    .or_insert_with(|| ClipPlayer::new(frames.clone()));
                player.play(wall);
                let frame = player.frame_at(wall);
                Ok((image_paint(frame)?, frame.width, frame.height))
            }
        }
    }

    /// Pause whichever clip was playing unless it belongs to `keep`.
    fn pause_active_clip(&mut self, keep: Option<usize>, wall: Duration) {
        if self.active_clip != keep {
            if let Some(prev) = self.active_clip
                && let Some(player) = self.players.get_mut(&prev)
            {
                player.pause(wall);
            }
            self.active_clip = keep;
        }
    }

    fn vignette_paint(&mut self) -> ReelResult<vello_cpu::Image> {
        if let Some(img) = self.vignette.clone() {
            return Ok(img);
        }
        let img = vignette_image(self.canvas)?;
        self.vignette = Some(img.clone());
        Ok(img)
    }
}

/// Bottom vignette: transparent at the top row, `VIGNETTE_ALPHA` black at the bottom row.
fn vignette_image(canvas: Canvas) -> ReelResult<vello_cpu::Image> {
    let height = f64::from(canvas.height);
    let top = (height * VIGNETTE_TOP).round();
    let h = ((height - top) as u32).max(1);
    let w = canvas.width;
    let max_a = (VIGNETTE_ALPHA * 255.0).round();
    let h1 = f64::from(h.max(1) - 1);

    let mut bytes = vec![0u8; (w as usize) * (h as usize) * 4];
    for (y, row) in bytes.chunks_exact_mut(w as usize * 4).enumerate() {
        let t = if h1 <= 0.0 { 1.0 } else { y as f64 / h1 };
        let a = (max_a * t).round().clamp(0.0, 255.0) as u8;
        for px in row.chunks_exact_mut(4) {
            px[3] = a;
        }
    }
    let pixmap = pixmap_from_premul_bytes(&bytes, w, h)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
