//! Side-by-side plate layout and viewport fitting.

use crate::constants::{MIN_PROBE_SCALE, PLATE_GAP_SCREEN_PX, PROBE_BOX_CM};
use crate::geometry::{Rect, rect_from_anchor};
use crate::models::{Plate, Point, SocketGroup};

/// Horizontal arrangement of all plates in logical centimeters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
    pub x_starts: Vec<f64>,
    pub total_w: f64,
    pub max_h: f64,
}

impl Layout {
    /// World rectangle of plate `i`, bottom aligned.
    pub fn plate_rect(&self, plates: &[Plate], i: usize) -> Option<Rect> {
        let p = plates.get(i)?;
        let x = *self.x_starts.get(i)?;
        Some(Rect {
            x,
            y: 0.0,
            w: p.width,
            h: p.height,
        })
    }

    /// World rectangle covered by a socket group, or `None` when its plate is gone.
    pub fn group_rect(&self, g: &SocketGroup) -> Option<Rect> {
        let x0 = *self.x_starts.get(g.plate_index)?;
        Some(rect_from_anchor(g.x, g.y, g.count, g.dir).translate(x0, 0.0))
    }
}

/// Place plates left to right with `gap_logical` between neighbours.
/// Both totals are floored at 1.
pub fn layout(plates: &[Plate], gap_logical: f64) -> Layout {
    let mut x_starts = Vec::with_capacity(plates.len());
    let mut acc = 0.0;
    for (i, p) in plates.iter().enumerate() {
        x_starts.push(acc);
        acc += p.width;
        if i + 1 < plates.len() {
            acc += gap_logical;
        }
    }
    let max_h = plates.iter().map(|p| p.height).fold(1.0_f64, f64::max);
    Layout {
        x_starts,
        total_w: acc.max(1.0),
        max_h,
    }
}

/// Largest uniform scale that fits `layout_w` × `layout_h` into the viewport,
/// never above 1.
pub fn fit_scale(viewport_w: f64, viewport_h: f64, layout_w: f64, layout_h: f64) -> f64 {
    if !(layout_w > 0.0 && layout_h > 0.0) {
        return 1.0;
    }
    let s = (viewport_w.max(0.0) / layout_w)
        .min(viewport_h.max(0.0) / layout_h)
        .min(1.0);
    if s.is_finite() { s } else { 1.0 }
}

/// Logical width of the constant screen gap for `plate_count` plates
/// shown in the given viewport.
pub fn gap_logical(plate_count: usize, viewport_w: f64, viewport_h: f64) -> f64 {
    if plate_count <= 1 {
        return 0.0;
    }
    let probe = fit_scale(viewport_w, viewport_h, PROBE_BOX_CM, PROBE_BOX_CM);
    PLATE_GAP_SCREEN_PX / probe.max(MIN_PROBE_SCALE)
}

/// Layout plus the scale it is displayed at.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Composition {
    pub layout: Layout,
    pub gap: f64,
    pub scale: f64,
}

impl Composition {
    /// Probe scale, logical gap, layout, then the final fit scale.
    pub fn fit(plates: &[Plate], viewport_w: f64, viewport_h: f64) -> Self {
        let gap = gap_logical(plates.len(), viewport_w, viewport_h);
        let layout = layout(plates, gap);
        let scale = fit_scale(viewport_w, viewport_h, layout.total_w, layout.max_h);
        Composition { layout, gap, scale }
    }

    /// Fixed scale, used when replaying a composition off screen.
    pub fn with_scale(plates: &[Plate], gap: f64, scale: f64) -> Self {
        Composition {
            layout: layout(plates, gap),
            gap,
            scale,
        }
    }

    pub fn view(&self) -> ViewTransform {
        ViewTransform {
            scale: self.scale,
            layout_h: self.layout.max_h,
        }
    }

    /// Size of the displayed layout in CSS pixels.
    pub fn css_size(&self) -> (f64, f64) {
        (
            self.layout.total_w * self.scale,
            self.layout.max_h * self.scale,
        )
    }
}

/// Mapping between the y-up logical world and y-down screen pixels, with the
/// screen origin at the top-left of the displayed layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub layout_h: f64,
}

impl ViewTransform {
    pub fn to_screen(&self, p: Point) -> (f64, f64) {
        (p.x * self.scale, (self.layout_h - p.y) * self.scale)
    }

    pub fn from_screen(&self, x: f64, y: f64) -> Point {
        Point {
            x: x / self.scale,
            y: self.layout_h - y / self.scale,
        }
    }

    /// Convert a pointer delta to a logical delta; screen y is inverted.
    pub fn delta_to_world(&self, dx_px: f64, dy_px: f64) -> (f64, f64) {
        (dx_px / self.scale, -dy_px / self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_plate_has_no_gap() {
        let l = layout(&[Plate::new(120.0, 60.0)], 5.0);
        assert_eq!(l.x_starts, vec![0.0]);
        assert_eq!(l.total_w, 120.0);
        assert_eq!(l.max_h, 60.0);
        assert_eq!(gap_logical(1, 800.0, 400.0), 0.0);
    }

    #[test]
    fn plates_are_placed_left_to_right_with_gap() {
        let plates = [
            Plate::new(100.0, 60.0),
            Plate::new(50.0, 100.0),
            Plate::new(30.0, 40.0),
        ];
        let l = layout(&plates, 2.0);
        assert_eq!(l.x_starts, vec![0.0, 102.0, 154.0]);
        assert_eq!(l.total_w, 184.0);
        assert_eq!(l.max_h, 100.0);
    }

    #[test]
    fn empty_layout_is_floored_at_one() {
        let l = layout(&[], 3.0);
        assert_eq!(l.total_w, 1.0);
        assert_eq!(l.max_h, 1.0);
    }

    #[test]
    fn fit_scale_never_upscales() {
        assert_eq!(fit_scale(1000.0, 1000.0, 100.0, 50.0), 1.0);
        assert_eq!(fit_scale(500.0, 1000.0, 1000.0, 50.0), 0.5);
        assert_eq!(fit_scale(500.0, 100.0, 0.0, 50.0), 1.0);
        assert_eq!(fit_scale(0.0, 100.0, 10.0, 50.0), 0.0);
    }

    #[test]
    fn gap_stays_three_pixels_on_screen() {
        // probe: 100×100 into 400×300 → 1.0, so gap is 3 cm
        assert_eq!(gap_logical(2, 400.0, 300.0), 3.0);
        // probe: 100×100 into 50×80 → 0.5, so gap is 6 cm
        assert_eq!(gap_logical(3, 50.0, 80.0), 6.0);
    }

    #[test]
    fn composition_fits_the_viewport() {
        let plates = [Plate::new(200.0, 100.0), Plate::new(200.0, 100.0)];
        let c = Composition::fit(&plates, 400.0, 300.0);
        assert!((c.layout.total_w - (400.0 + c.gap)).abs() < 1e-9);
        let (w, h) = c.css_size();
        assert!(w <= 400.0 + 1e-9);
        assert!(h <= 300.0 + 1e-9);
    }

    #[test]
    fn view_transform_round_trips_and_flips_y() {
        let v = ViewTransform {
            scale: 2.0,
            layout_h: 60.0,
        };
        assert_eq!(v.to_screen(Point { x: 0.0, y: 0.0 }), (0.0, 120.0));
        assert_eq!(v.to_screen(Point { x: 10.0, y: 60.0 }), (20.0, 0.0));
        let p = v.from_screen(20.0, 100.0);
        assert_eq!(p, Point { x: 10.0, y: 10.0 });
        assert_eq!(v.delta_to_world(4.0, 4.0), (2.0, -2.0));
    }

    #[test]
    fn group_rect_is_offset_by_plate_start() {
        let plates = [Plate::new(100.0, 60.0), Plate::new(100.0, 60.0)];
        let l = layout(&plates, 2.0);
        let mut g = SocketGroup::new(1);
        g.x = 10.0;
        g.y = 5.0;
        let r = l.group_rect(&g).unwrap();
        assert!((r.x - 108.5).abs() < 1e-9);
        assert_eq!(r.y, 5.0);
        g.plate_index = 7;
        assert!(l.group_rect(&g).is_none());
    }

    proptest! {
        #[test]
        fn total_width_is_widths_plus_gaps(
            widths in prop::collection::vec(20.0f64..300.0, 1..10),
            gap in 0.0f64..20.0,
        ) {
            let plates: Vec<Plate> = widths.iter().map(|w| Plate::new(*w, 60.0)).collect();
            let l = layout(&plates, gap);
            let expected: f64 = widths.iter().sum::<f64>() + gap * (plates.len() - 1) as f64;
            prop_assert!((l.total_w - expected).abs() < 1e-6);
        }

        #[test]
        fn fit_scale_bounds(
            vw in 0.0f64..4000.0,
            vh in 0.0f64..4000.0,
            lw in 1.0f64..4000.0,
            lh in 1.0f64..4000.0,
        ) {
            let s = fit_scale(vw, vh, lw, lh);
            prop_assert!(s <= 1.0);
            prop_assert!(s * lw <= vw + 1e-6);
            prop_assert!(s * lh <= vh + 1e-6);
        }
    }
}
