use log::warn;
use png::{BitDepth, ColorType, Encoder};
use tiny_skia::{IntSize, Pixmap};

use crate::RenderError;

/// Decode PNG, JPEG or WebP bytes into a premultiplied surface.
pub fn decode_image(bytes: &[u8]) -> Result<Pixmap, RenderError> {
    let image = image::load_from_memory(bytes).map_err(|err| {
        warn!("image decode failed: {err}");
        RenderError::Decode(err.to_string())
    })?;
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    pixmap_from_rgba(w, h, rgba.into_raw())
}

/// Wrap straight-alpha RGBA8 pixels as a surface.
pub fn pixmap_from_rgba(width: u32, height: u32, mut rgba: Vec<u8>) -> Result<Pixmap, RenderError> {
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| RenderError::Decode(format!("invalid image size {width}×{height}")))?;
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }
    }
    Pixmap::from_vec(rgba, size).ok_or(RenderError::Alloc { width, height })
}

/// Straight-alpha RGBA8 copy of a surface, as PNG and canvas `ImageData` expect.
pub fn to_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

// RGBA -> PNG bytes (deterministic for same input)
pub fn encode_rgba_to_png_bytes(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, png::EncodingError> {
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, width, height);
        enc.set_color(ColorType::Rgba);
        enc.set_depth(BitDepth::Eight);
        let mut writer = enc.write_header()?;
        writer.write_image_data(rgba)?;
    }
    Ok(buf)
}

pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RenderError> {
    let rgba = to_rgba(pixmap);
    Ok(encode_rgba_to_png_bytes(pixmap.width(), pixmap.height(), &rgba)?)
}
