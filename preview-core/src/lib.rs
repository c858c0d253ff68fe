//! Raster compositing of plates, motif and socket tiles.
//!
//! The browser preview and the PNG export both go through [`render`], so
//! what is shown is exactly what gets saved.

mod compose;
mod export;
mod raster;

pub use compose::{Assets, CoverFit, RenderOptions, Scene, cover_fit, render};
pub use export::{export_file_name, export_size};
pub use raster::{decode_image, encode_png, encode_rgba_to_png_bytes, pixmap_from_rgba, to_rgba};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot allocate a {width}×{height} surface")]
    Alloc { width: u32, height: u32 },
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("png encode failed: {0}")]
    Encode(#[from] png::EncodingError),
}

pub use tiny_skia::{Color, Pixmap};
