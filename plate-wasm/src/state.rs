use plate_core::drag::DragController;
use plate_core::{Composition, PlateStore, SocketStore, UnitStore};
use preview_core::{Assets, Pixmap, RenderOptions, Scene};
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, Window};

use crate::canvas;

/// Images loaded asynchronously.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Asset {
    Motif,
    SocketTile,
}

/// Everything the shell owns, shared across callbacks behind
/// `Rc<RefCell<_>>`.
pub struct State {
    pub window: Window,
    pub document: Document,
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub area: Option<HtmlElement>,
    pub plates: PlateStore,
    pub sockets: SocketStore,
    pub units: UnitStore,
    pub drag: DragController,
    pub composition: Composition,
    pub motif: Option<Pixmap>,
    pub socket_tile: Option<Pixmap>,
    motif_generation: u64,
    tile_generation: u64,
}

impl State {
    pub fn new(
        window: Window,
        document: Document,
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
        area: Option<HtmlElement>,
        (plates, sockets, units): (PlateStore, SocketStore, UnitStore),
    ) -> Self {
        State {
            window,
            document,
            canvas,
            ctx,
            area,
            plates,
            sockets,
            units,
            drag: DragController::new(),
            composition: Composition::default(),
            motif: None,
            socket_tile: None,
            motif_generation: 0,
            tile_generation: 0,
        }
    }

    /// Size available for the layout in CSS pixels.
    pub fn viewport(&self) -> (f64, f64) {
        if let Some(area) = &self.area {
            let (w, h) = (area.client_width() as f64, area.client_height() as f64);
            if w > 0.0 && h > 0.0 {
                return (w, h);
            }
        }
        let dim = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
        (dim(self.window.inner_width()), dim(self.window.inner_height()))
    }

    pub fn dpr(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            dpr: self.dpr(),
            draw_sockets: self.sockets.enabled(),
            ..RenderOptions::default()
        }
    }

    fn render(&self) -> Result<Pixmap, JsValue> {
        let scene = Scene {
            plates: self.plates.plates(),
            groups: self.sockets.groups(),
            composition: &self.composition,
        };
        let assets = Assets {
            motif: self.motif.as_ref(),
            socket_tile: self.socket_tile.as_ref(),
        };
        preview_core::render(&scene, &assets, &self.render_options())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Refit the layout to the viewport and repaint the canvas.
    pub fn draw(&mut self) -> Result<(), JsValue> {
        let (vw, vh) = self.viewport();
        self.composition = Composition::fit(self.plates.plates(), vw, vh);
        let pixmap = self.render()?;
        let (css_w, css_h) = self.composition.css_size();
        canvas::blit(&self.canvas, &self.ctx, &pixmap, css_w, css_h)?;

        if let Some(fb) = self.drag.feedback()
            && let Some(g) = self.sockets.group(&fb.group_id)
        {
            let dpr = self.render_options().effective_dpr();
            canvas::draw_drag_overlay(&self.ctx, fb, g, &self.composition, self.units.unit(), dpr)?;
        }
        Ok(())
    }

    /// Render the current state once more at full resolution and encode it.
    pub fn export_png(&self) -> Result<Vec<u8>, JsValue> {
        let pixmap = self.render()?;
        preview_core::encode_png(&pixmap).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Start a load; the returned token must be handed to `finish_load`.
    pub fn begin_load(&mut self, asset: Asset) -> u64 {
        let generation = match asset {
            Asset::Motif => &mut self.motif_generation,
            Asset::SocketTile => &mut self.tile_generation,
        };
        *generation += 1;
        *generation
    }

    /// Store a loaded image unless a newer load was started meanwhile.
    /// A failed load (`None`) clears the image so the preview degrades.
    pub fn finish_load(&mut self, asset: Asset, token: u64, image: Option<Pixmap>) -> bool {
        let (current, slot) = match asset {
            Asset::Motif => (self.motif_generation, &mut self.motif),
            Asset::SocketTile => (self.tile_generation, &mut self.socket_tile),
        };
        if token != current {
            return false;
        }
        *slot = image;
        true
    }
}
