use log::{debug, trace};
use plate_core::constants::{SOCKET_GAP_CM, SOCKET_SIZE_CM};
use plate_core::{Composition, Direction, Plate, SocketGroup};
use tiny_skia::{
    Color, FillRule, FilterQuality, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::RenderError;

/// What to draw: the plates, their groups and the fitted composition.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    pub plates: &'a [Plate],
    pub groups: &'a [SocketGroup],
    pub composition: &'a Composition,
}

/// Decoded images. Either may still be loading or have failed.
#[derive(Clone, Copy, Debug, Default)]
pub struct Assets<'a> {
    pub motif: Option<&'a Pixmap>,
    pub socket_tile: Option<&'a Pixmap>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Device pixel ratio; anything below 1 or not finite counts as 1.
    pub dpr: f64,
    pub background: Color,
    /// Fill used for socket tiles when no tile image is available.
    pub placeholder: Color,
    pub draw_sockets: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            dpr: 1.0,
            background: Color::TRANSPARENT,
            placeholder: Color::from_rgba8(0x11, 0x11, 0x11, 0xff),
            draw_sockets: true,
        }
    }
}

impl RenderOptions {
    pub fn effective_dpr(&self) -> f64 {
        if self.dpr.is_finite() { self.dpr.max(1.0) } else { 1.0 }
    }
}

/// Placement of the motif over the whole layout, in logical units with the
/// origin at the layout's bottom-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverFit {
    pub dx: f64,
    pub dy: f64,
    pub dw: f64,
    pub dh: f64,
}

/// Scale the image to cover `layout_w` × `layout_h` and center it.
pub fn cover_fit(layout_w: f64, layout_h: f64, image_w: f64, image_h: f64) -> Option<CoverFit> {
    if !(image_w > 0.0 && image_h > 0.0) {
        return None;
    }
    let s = (layout_w / image_w).max(layout_h / image_h);
    let dw = image_w * s;
    let dh = image_h * s;
    Some(CoverFit {
        dx: (layout_w - dw) / 2.0,
        dy: (layout_h - dh) / 2.0,
        dw,
        dh,
    })
}

/// Logical y-up rectangle to a device y-down rectangle.
struct Device {
    k: f64,
    layout_h: f64,
}

impl Device {
    fn rect(&self, x: f64, y: f64, w: f64, h: f64) -> Option<Rect> {
        let k = self.k;
        Rect::from_xywh(
            (k * x) as f32,
            (k * (self.layout_h - y - h)) as f32,
            (k * w) as f32,
            (k * h) as f32,
        )
    }

    /// Maps an `iw` × `ih` image onto the logical rectangle.
    fn image_transform(&self, x: f64, y: f64, w: f64, h: f64, iw: u32, ih: u32) -> Transform {
        let k = self.k;
        Transform::from_row(
            (k * w / iw as f64) as f32,
            0.0,
            0.0,
            (k * h / ih as f64) as f32,
            (k * x) as f32,
            (k * (self.layout_h - y - h)) as f32,
        )
    }
}

/// Draw the scene onto a fresh surface of
/// `round(layoutW·scale·dpr) × round(layoutH·scale·dpr)` pixels.
pub fn render(scene: &Scene, assets: &Assets, opts: &RenderOptions) -> Result<Pixmap, RenderError> {
    let comp = scene.composition;
    let layout = &comp.layout;
    let (width, height) = crate::export_size(comp, opts.effective_dpr());
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Alloc { width, height })?;
    if opts.background.alpha() > 0.0 {
        pixmap.fill(opts.background);
    }
    let dev = Device {
        k: comp.scale * opts.effective_dpr(),
        layout_h: layout.max_h,
    };
    debug!(
        "render {} plate(s), {} group(s) at {width}×{height}",
        scene.plates.len(),
        scene.groups.len()
    );

    let fit = assets
        .motif
        .and_then(|m| cover_fit(layout.total_w, layout.max_h, m.width() as f64, m.height() as f64));
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };

    // one clip covering every plate; the motif is drawn once through it
    if let (Some(motif), Some(fit)) = (assets.motif, fit) {
        let mut pb = PathBuilder::new();
        for r in (0..scene.plates.len())
            .filter_map(|i| layout.plate_rect(scene.plates, i))
            .filter_map(|p| dev.rect(p.x, p.y, p.w, p.h))
        {
            pb.push_rect(r);
        }
        if let (Some(clip), Some(mut mask)) = (pb.finish(), Mask::new(width, height)) {
            mask.fill_path(&clip, FillRule::Winding, false, Transform::identity());
            let ts = dev.image_transform(fit.dx, fit.dy, fit.dw, fit.dh, motif.width(), motif.height());
            pixmap.draw_pixmap(0, 0, motif.as_ref(), &paint, ts, Some(&mask));
        }
    }

    if opts.draw_sockets {
        let mut fill = Paint::default();
        fill.set_color(opts.placeholder);
        fill.anti_alias = true;
        for g in scene.groups {
            let Some(r) = layout.group_rect(g) else {
                trace!("group {} has no plate, skipped", g.id);
                continue;
            };
            for t in 0..g.count {
                let step = t as f64 * (SOCKET_SIZE_CM + SOCKET_GAP_CM);
                let (x, y) = match g.dir {
                    Direction::Horizontal => (r.x + step, r.y),
                    Direction::Vertical => (r.x, r.y + step),
                };
                match assets.socket_tile {
                    Some(tile) => {
                        let ts = dev.image_transform(x, y, SOCKET_SIZE_CM, SOCKET_SIZE_CM, tile.width(), tile.height());
                        pixmap.draw_pixmap(0, 0, tile.as_ref(), &paint, ts, None);
                    }
                    None => {
                        if let Some(rect) = dev.rect(x, y, SOCKET_SIZE_CM, SOCKET_SIZE_CM) {
                            pixmap.fill_rect(rect, &fill, Transform::identity(), None);
                        }
                    }
                }
            }
        }
    }
    Ok(pixmap)
}
