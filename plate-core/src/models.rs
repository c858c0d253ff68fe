use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Basic two dimensional point used for geometry operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<(f64, f64)> for Point {
    fn from(v: (f64, f64)) -> Self {
        Point { x: v.0, y: v.1 }
    }
}

/// A rectangular wall panel, dimensions in centimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    pub width: f64,
    pub height: f64,
}

impl Default for Plate {
    fn default() -> Self {
        Plate {
            width: DEFAULT_PLATE_WIDTH_CM,
            height: DEFAULT_PLATE_HEIGHT_CM,
        }
    }
}

impl Plate {
    /// Build a plate with both dimensions clamped into their allowed ranges.
    pub fn new(width: f64, height: f64) -> Self {
        Plate {
            width: Dimension::Width.clamp(width),
            height: Dimension::Height.clamp(height),
        }
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Width => self.width,
            Dimension::Height => self.height,
        }
    }

    /// Plates below 40×40 cm cannot carry sockets.
    pub fn is_socket_eligible(&self) -> bool {
        self.width >= SOCKET_PLATE_MIN_CM && self.height >= SOCKET_PLATE_MIN_CM
    }
}

/// Which side of a plate a write targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Width,
    Height,
}

impl Dimension {
    pub fn range(self) -> (f64, f64) {
        match self {
            Dimension::Width => (PLATE_WIDTH_MIN_CM, PLATE_WIDTH_MAX_CM),
            Dimension::Height => (PLATE_HEIGHT_MIN_CM, PLATE_HEIGHT_MAX_CM),
        }
    }

    pub fn default_cm(self) -> f64 {
        match self {
            Dimension::Width => DEFAULT_PLATE_WIDTH_CM,
            Dimension::Height => DEFAULT_PLATE_HEIGHT_CM,
        }
    }

    /// Clamp into range; non-finite input falls back to the default size.
    pub fn clamp(self, value_cm: f64) -> f64 {
        let (min, max) = self.range();
        if value_cm.is_finite() {
            value_cm.clamp(min, max)
        } else {
            self.default_cm()
        }
    }
}

/// Orientation of a socket group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "h")]
    Horizontal,
    #[serde(rename = "v")]
    Vertical,
}

/// A linear run of 1..=5 socket cutouts placed on one plate.
///
/// `(x, y)` is the anchor: x is the horizontal center of the first socket,
/// y is the bottom edge of the group. Both are local to the host plate with
/// the origin at its bottom-left corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SocketGroup {
    pub id: String,
    #[serde(rename = "plateIndex")]
    pub plate_index: usize,
    pub count: u8,
    pub dir: Direction,
    pub x: f64,
    pub y: f64,
}

impl SocketGroup {
    /// A fresh group with default count, direction and the safe default anchor.
    pub fn new(plate_index: usize) -> Self {
        SocketGroup {
            id: new_group_id(),
            plate_index,
            count: DEFAULT_SOCKETS_PER_GROUP,
            dir: Direction::Horizontal,
            x: EDGE_MIN_CM + SOCKET_HALF_CM,
            y: EDGE_MIN_CM,
        }
    }

    pub fn anchor(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    /// Surcharge for this group's cutouts in euros.
    pub fn price_eur(&self) -> u32 {
        u32::from(self.count) * SOCKET_PRICE_EUR
    }

    /// Copy of this group with a patch applied.
    pub fn patched(&self, patch: &GroupPatch) -> SocketGroup {
        SocketGroup {
            id: self.id.clone(),
            plate_index: patch.plate_index.unwrap_or(self.plate_index),
            count: patch.count.map(clamp_count).unwrap_or(self.count),
            dir: patch.dir.unwrap_or(self.dir),
            x: patch.x.unwrap_or(self.x),
            y: patch.y.unwrap_or(self.y),
        }
    }
}

/// Surcharge for all groups together.
pub fn total_price_eur(groups: &[SocketGroup]) -> u32 {
    groups.iter().map(SocketGroup::price_eur).sum()
}

pub fn clamp_count(count: u8) -> u8 {
    count.clamp(MIN_SOCKETS_PER_GROUP, MAX_SOCKETS_PER_GROUP)
}

pub fn new_group_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Partial update for a socket group; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupPatch {
    pub plate_index: Option<usize>,
    pub count: Option<u8>,
    pub dir: Option<Direction>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl GroupPatch {
    pub fn anchor(p: Point) -> Self {
        GroupPatch {
            x: Some(p.x),
            y: Some(p.y),
            ..Default::default()
        }
    }

    pub fn is_layout_change(&self) -> bool {
        self.plate_index.is_some() || self.count.is_some() || self.dir.is_some()
    }
}

/// Display unit. Stored values are always centimeters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Cm,
    In,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Cm => "cm",
            Unit::In => "in",
        }
    }

    pub fn parse(s: &str) -> Option<Unit> {
        match s.trim() {
            "cm" => Some(Unit::Cm),
            "in" => Some(Unit::In),
            _ => None,
        }
    }
}
