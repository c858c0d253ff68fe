//! Rectangle math for socket groups. Everything is in plate-local
//! centimeters with y growing upward.

use crate::constants::{EDGE_MIN_CM, SOCKET_GAP_CM, SOCKET_HALF_CM, SOCKET_SIZE_CM};
use crate::models::{Direction, Point};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

/// Axis-aligned rectangle; `(x, y)` is the bottom-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn top(&self) -> f64 {
        self.y + self.h
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.top()
    }
}

/// Footprint of a group: sockets run along x for horizontal groups and along
/// y for vertical ones.
pub fn group_size(count: u8, dir: Direction) -> Size {
    let n = count as f64;
    let gaps = (n - 1.0).max(0.0) * SOCKET_GAP_CM;
    let run = n * SOCKET_SIZE_CM + gaps;
    match dir {
        Direction::Horizontal => Size {
            w: run,
            h: SOCKET_SIZE_CM,
        },
        Direction::Vertical => Size {
            w: SOCKET_SIZE_CM,
            h: run,
        },
    }
}

/// Rectangle covered by a group anchored at `(x, y)`.
///
/// x is the center of the first socket, y is already the bottom edge.
pub fn rect_from_anchor(x: f64, y: f64, count: u8, dir: Direction) -> Rect {
    let Size { w, h } = group_size(count, dir);
    Rect {
        x: x - SOCKET_HALF_CM,
        y,
        w,
        h,
    }
}

/// True when every side of `rect` keeps the minimum clearance to a
/// `plate_w` × `plate_h` plate.
pub fn within_bounds(rect: &Rect, plate_w: f64, plate_h: f64) -> bool {
    rect.x >= EDGE_MIN_CM
        && rect.y >= EDGE_MIN_CM
        && rect.right() <= plate_w - EDGE_MIN_CM
        && rect.top() <= plate_h - EDGE_MIN_CM
}

/// Separating-axis test with both rectangles inflated by `pad`.
/// Touching at exactly `pad` distance does not count as overlap.
pub fn overlaps_with_padding(a: &Rect, b: &Rect, pad: f64) -> bool {
    !(a.right() + pad <= b.x
        || b.right() + pad <= a.x
        || a.top() + pad <= b.y
        || b.top() + pad <= a.y)
}

pub fn anchor_to_edge(anchor: Point) -> Point {
    Point {
        x: anchor.x - SOCKET_HALF_CM,
        y: anchor.y,
    }
}

pub fn edge_to_anchor(edge: Point) -> Point {
    Point {
        x: edge.x + SOCKET_HALF_CM,
        y: edge.y,
    }
}

/// Allowed edge-offset interval along one axis: `[3, plate_dim - 3 - footprint]`.
pub fn edge_range(plate_dim: f64, footprint: f64) -> (f64, f64) {
    (EDGE_MIN_CM, plate_dim - EDGE_MIN_CM - footprint)
}

/// Clamp an edge offset into the plate. The lower bound wins when the
/// footprint does not fit at all.
pub fn clamp_edge(edge: Point, plate_w: f64, plate_h: f64, size: Size) -> Point {
    let (min_x, max_x) = edge_range(plate_w, size.w);
    let (min_y, max_y) = edge_range(plate_h, size.h);
    Point {
        x: edge.x.min(max_x).max(min_x),
        y: edge.y.min(max_y).max(min_y),
    }
}
