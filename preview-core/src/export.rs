use chrono::{DateTime, SecondsFormat, Utc};
use plate_core::Composition;

/// `plate-preview-<timestamp>.png`, the ISO-8601 millisecond UTC timestamp
/// with `:` and `.` turned into `-` so it is safe on every filesystem.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("plate-preview-{stamp}.png")
}

/// Pixel size of the surface for `comp` at device pixel ratio `dpr`.
pub fn export_size(comp: &Composition, dpr: f64) -> (u32, u32) {
    let k = comp.scale * dpr;
    let side = |v: f64| {
        let px = (v * k).round();
        if px.is_finite() && px >= 1.0 { px.min(u32::MAX as f64) as u32 } else { 1 }
    };
    (side(comp.layout.total_w), side(comp.layout.max_h))
}
