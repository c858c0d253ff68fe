use plate_core::drag::DragFeedback;
use plate_core::geometry::group_size;
use plate_core::{Composition, Point, SocketGroup, Unit};
use preview_core::Pixmap;
use wasm_bindgen::Clamped;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::constants::{GUIDE_FONT, GUIDE_STROKE, INVALID_STROKE, VALID_STROKE};

// Non-deprecated helpers to set canvas styles via property assignment.
pub fn set_fill_style(ctx: &CanvasRenderingContext2d, color: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(color),
    );
}

pub fn set_stroke_style(ctx: &CanvasRenderingContext2d, color: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("strokeStyle"),
        &JsValue::from_str(color),
    );
}

/// Copy a rendered surface onto the canvas, sizing the backing store to the
/// surface and the element to `css_w` × `css_h`.
pub fn blit(
    canvas: &HtmlCanvasElement,
    ctx: &CanvasRenderingContext2d,
    pixmap: &Pixmap,
    css_w: f64,
    css_h: f64,
) -> Result<(), JsValue> {
    if canvas.width() != pixmap.width() {
        canvas.set_width(pixmap.width());
    }
    if canvas.height() != pixmap.height() {
        canvas.set_height(pixmap.height());
    }
    let style = canvas.style();
    style.set_property("width", &format!("{:.2}px", css_w))?;
    style.set_property("height", &format!("{:.2}px", css_h))?;
    let rgba = preview_core::to_rgba(pixmap);
    let img = ImageData::new_with_u8_clamped_array_and_sh(Clamped(&rgba), pixmap.width(), pixmap.height())?;
    ctx.put_image_data(&img, 0.0, 0.0)
}

/// Outline of the dragged group plus distance guides to the plate's left
/// and bottom edges. Drawn on top of the preview; never exported.
pub fn draw_drag_overlay(
    ctx: &CanvasRenderingContext2d,
    fb: &DragFeedback,
    group: &SocketGroup,
    comp: &Composition,
    unit: Unit,
    dpr: f64,
) -> Result<(), JsValue> {
    let Some(&x0) = comp.layout.x_starts.get(fb.plate_index) else {
        return Ok(());
    };
    let view = comp.view();
    let size = group_size(group.count, group.dir);
    let (left, top) = view.to_screen(Point {
        x: x0 + fb.edge.x,
        y: fb.edge.y + size.h,
    });
    let (w, h) = (size.w * view.scale, size.h * view.scale);
    let bottom = top + h;
    let (plate_left, plate_bottom) = view.to_screen(Point { x: x0, y: 0.0 });

    ctx.save();
    ctx.scale(dpr, dpr)?;

    set_stroke_style(ctx, if fb.invalid() { INVALID_STROKE } else { VALID_STROKE });
    ctx.set_line_width(2.0);
    ctx.stroke_rect(left, top, w, h);

    let mid_y = top + h / 2.0;
    let mid_x = left + w / 2.0;
    set_stroke_style(ctx, GUIDE_STROKE);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    ctx.move_to(plate_left, mid_y);
    ctx.line_to(left, mid_y);
    ctx.move_to(mid_x, bottom);
    ctx.line_to(mid_x, plate_bottom);
    ctx.stroke();

    set_fill_style(ctx, GUIDE_STROKE);
    ctx.set_font(GUIDE_FONT);
    ctx.set_text_align("center");
    ctx.fill_text(&unit.label(fb.edge.x), (plate_left + left) / 2.0, mid_y - 4.0)?;
    ctx.set_text_align("left");
    ctx.fill_text(&unit.label(fb.edge.y), mid_x + 4.0, (bottom + plate_bottom) / 2.0)?;

    ctx.restore();
    Ok(())
}
