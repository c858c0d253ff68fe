use clap::Parser;
use std::path::PathBuf;

/// Render a saved plate configuration to PNG
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Project JSON with `plates`, `sockets` and `unit` sections
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Motif image spread across all plates (PNG, JPEG, WebP)
    #[arg(short = 'm', long = "motif", value_name = "IMAGE")]
    pub motif: Option<PathBuf>,

    /// Image stamped for every socket; a dark square is drawn without it
    #[arg(short = 's', long = "socket-tile", value_name = "IMAGE")]
    pub socket_tile: Option<PathBuf>,

    /// Output file, or a directory to receive a timestamped file
    #[arg(short = 'o', long = "out", value_name = "PATH", default_value = ".")]
    pub out: PathBuf,

    /// Viewport the layout is fitted into, in CSS pixels
    #[arg(long = "viewport", value_names = ["W", "H"], num_args = 2, default_values_t = [1200.0, 800.0])]
    pub viewport: Vec<f64>,

    /// Fixed scale in pixels per centimeter instead of fitting the viewport
    #[arg(long = "scale", value_name = "PX_PER_CM")]
    pub scale: Option<f64>,

    /// Device pixel ratio
    #[arg(long = "dpr", default_value_t = 1.0)]
    pub dpr: f64,

    /// Background as #rrggbb or #rrggbbaa; transparent when omitted
    #[arg(long = "background", value_name = "HEX", value_parser = parse_hex_color)]
    pub background: Option<[u8; 4]>,

    /// Leave socket tiles out even when sockets are enabled
    #[arg(long = "no-sockets")]
    pub no_sockets: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    pub fn viewport(&self) -> (f64, f64) {
        match self.viewport.as_slice() {
            [w, h] => (*w, *h),
            _ => (1200.0, 800.0),
        }
    }
}

pub fn parse_hex_color(s: &str) -> Result<[u8; 4], String> {
    let hex = s.trim().trim_start_matches('#');
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return Err(format!("expected #rrggbb or #rrggbbaa, got {s:?}"));
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("{s:?}: {e}"));
    let a = if hex.len() == 8 { byte(6)? } else { 255 };
    Ok([byte(0)?, byte(2)?, byte(4)?, a])
}
