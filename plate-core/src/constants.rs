/// Application-wide numeric constants.
/// Values are expressed in centimeters unless noted otherwise.
pub const SOCKET_SIZE_CM: f64 = 7.0;
/// Half a socket; the distance between a group's x anchor and its left edge.
pub const SOCKET_HALF_CM: f64 = SOCKET_SIZE_CM / 2.0;
/// Gap between two sockets inside one group.
pub const SOCKET_GAP_CM: f64 = 0.2;
/// Minimum clearance between a socket group and any plate edge.
pub const EDGE_MIN_CM: f64 = 3.0;
/// Minimum clearance between two socket groups on the same plate.
pub const GROUP_MIN_GAP_CM: f64 = 4.0;
/// Both plate dimensions must reach this size before sockets may be attached.
pub const SOCKET_PLATE_MIN_CM: f64 = 40.0;

pub const PLATE_WIDTH_MIN_CM: f64 = 20.0;
pub const PLATE_WIDTH_MAX_CM: f64 = 300.0;
pub const PLATE_HEIGHT_MIN_CM: f64 = 30.0;
pub const PLATE_HEIGHT_MAX_CM: f64 = 128.0;
pub const DEFAULT_PLATE_WIDTH_CM: f64 = 120.0;
pub const DEFAULT_PLATE_HEIGHT_CM: f64 = 60.0;
/// Upper bound on the plate list length.
pub const MAX_PLATES: usize = 10;

pub const MIN_SOCKETS_PER_GROUP: u8 = 1;
pub const MAX_SOCKETS_PER_GROUP: u8 = 5;
pub const DEFAULT_SOCKETS_PER_GROUP: u8 = 3;

/// Visible gap between neighbouring plates, in CSS pixels.
pub const PLATE_GAP_SCREEN_PX: f64 = 3.0;
/// Side of the square reference layout used to probe the scale for the gap.
pub const PROBE_BOX_CM: f64 = 100.0;
/// Lower bound for the probe scale when converting the screen gap.
pub const MIN_PROBE_SCALE: f64 = 0.0001;

/// Grid step of the auto-placement search.
pub const SEARCH_STEP_CM: f64 = 0.5;

pub const CM_PER_INCH: f64 = 2.54;

/// Price of one socket cutout, whole euros.
pub const SOCKET_PRICE_EUR: u32 = 20;
