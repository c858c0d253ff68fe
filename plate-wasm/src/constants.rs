/// Element ids and timings of the browser shell.
/// Geometry constants live in `plate_core::constants`.
pub const CANVAS_ID: &str = "cv";
/// Element whose size is the viewport the plates are fitted into.
pub const DRAW_AREA_ID: &str = "drawArea";
/// File input for a custom motif.
pub const MOTIF_INPUT_ID: &str = "motifFile";

pub const DEFAULT_MOTIF: &str = "assets/motif.jpg";
pub const SOCKET_TILE: &str = "assets/socket.png";

/// Quiet period before state changes are written to local storage (ms).
pub const SAVE_DEBOUNCE_MS: i32 = 250;

/// Drag outline colours and guide styling.
pub const VALID_STROKE: &str = "#10b981";
pub const INVALID_STROKE: &str = "#ef4444";
pub const GUIDE_STROKE: &str = "rgba(17,17,17,0.6)";
pub const GUIDE_FONT: &str = "12px sans-serif";
