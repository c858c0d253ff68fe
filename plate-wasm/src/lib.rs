use std::cell::{Cell, RefCell};
use std::rc::Rc;

use plate_core::controls::{self, Axis};
use plate_core::drag::group_at;
use plate_core::geometry::anchor_to_edge;
use plate_core::persist::{PersistedSockets, ProjectFile};
use plate_core::{Dimension, Direction, GroupPatch, Unit, format_eur, total_price_eur};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, PointerEvent, ResizeObserver};

mod canvas;
mod constants;
mod state;
mod storage;
mod upload;
mod utils;

use constants::{CANVAS_ID, DEFAULT_MOTIF, DRAW_AREA_ID, SOCKET_TILE};
use state::{Asset, State};
pub(crate) use utils::log;
use utils::{asset_url, event_css_coords, fetch_bytes, get_query_param};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Shared pointer to the shell state plus change bookkeeping. Cloned into
/// every DOM callback.
#[derive(Clone)]
pub(crate) struct Handle {
    pub state: Rc<RefCell<State>>,
    changed: Rc<Cell<bool>>,
    listeners: Rc<RefCell<Vec<js_sys::Function>>>,
}

impl Handle {
    /// Run `f` against the state, then repaint and tell JS listeners if any
    /// store changed.
    fn mutate<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let r = f(&mut self.state.borrow_mut());
        self.settle();
        r
    }

    fn settle(&self) {
        if let Err(e) = self.state.borrow_mut().draw() {
            log(&format!("draw failed: {:?}", e));
        }
        if self.changed.replace(false) {
            let listeners = self.listeners.borrow().clone();
            for f in listeners {
                if let Err(e) = f.call0(&JsValue::NULL) {
                    log(&format!("change listener threw: {:?}", e));
                }
            }
        }
    }

    pub(crate) fn finish_image(&self, asset: Asset, token: u64, bytes: &[u8]) {
        let image = match preview_core::decode_image(bytes) {
            Ok(p) => Some(p),
            Err(e) => {
                log(&format!("{:?} image unusable: {e}", asset));
                None
            }
        };
        if self.state.borrow_mut().finish_load(asset, token, image) {
            self.settle();
        } else {
            log(&format!("stale {:?} load ignored", asset));
        }
    }

    fn load_image(&self, asset: Asset, url: String) {
        let token = self.state.borrow_mut().begin_load(asset);
        let window = self.state.borrow().window.clone();
        let h = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match fetch_bytes(&window, &url).await {
                Ok(bytes) => h.finish_image(asset, token, &bytes),
                Err(e) => {
                    log(&format!("Failed to load '{}': {:?}", url, e));
                    if h.state.borrow_mut().finish_load(asset, token, None) {
                        h.settle();
                    }
                }
            }
        });
    }
}

fn init_canvas(
    document: &Document,
    id: &str,
) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let cv = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("canvas #{id} not found")))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = cv
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2D context not available"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    Ok((cv, ctx))
}

fn attach_pointer(handle: &Handle) -> Result<(), JsValue> {
    let canvas = handle.state.borrow().canvas.clone();
    canvas.style().set_property("touch-action", "none")?;
    {
        let h = handle.clone();
        let down = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e: PointerEvent| {
            {
                let mut s = h.state.borrow_mut();
                if !s.sockets.enabled() {
                    return;
                }
                let (x, y) = event_css_coords(&e, &s.canvas);
                let world = s.composition.view().from_screen(x, y);
                let Some(g) = group_at(&s.composition.layout, s.sockets.groups(), world).cloned() else {
                    return;
                };
                s.drag.begin(&g, (e.client_x() as f64, e.client_y() as f64));
                let _ = s.canvas.set_pointer_capture(e.pointer_id());
            }
            e.prevent_default();
            e.stop_propagation();
            h.settle();
        }));
        canvas.add_event_listener_with_callback("pointerdown", down.as_ref().unchecked_ref())?;
        down.forget();
    }
    {
        let h = handle.clone();
        let mv = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e: PointerEvent| {
            {
                let mut s = h.state.borrow_mut();
                if !s.drag.is_dragging() {
                    return;
                }
                let view = s.composition.view();
                let st = &mut *s;
                st.drag.update(
                    (e.client_x() as f64, e.client_y() as f64),
                    &view,
                    st.plates.plates(),
                    &mut st.sockets,
                );
            }
            e.prevent_default();
            h.settle();
        }));
        canvas.add_event_listener_with_callback("pointermove", mv.as_ref().unchecked_ref())?;
        mv.forget();
    }
    for (event, cancel) in [("pointerup", false), ("pointercancel", true)] {
        let h = handle.clone();
        let up = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e: PointerEvent| {
            {
                let mut s = h.state.borrow_mut();
                if !s.drag.is_dragging() {
                    return;
                }
                let st = &mut *s;
                if cancel {
                    st.drag.cancel(&mut st.sockets);
                } else {
                    st.drag.end();
                }
                if st.canvas.has_pointer_capture(e.pointer_id()) {
                    let _ = st.canvas.release_pointer_capture(e.pointer_id());
                }
            }
            h.settle();
        }));
        canvas.add_event_listener_with_callback(event, up.as_ref().unchecked_ref())?;
        up.forget();
    }
    Ok(())
}

fn attach_resize(handle: &Handle) -> Result<(), JsValue> {
    let h = handle.clone();
    let cb = Closure::<dyn FnMut(js_sys::Array)>::wrap(Box::new(move |_entries: js_sys::Array| {
        h.settle();
    }));
    let (window, area) = {
        let s = handle.state.borrow();
        (s.window.clone(), s.area.clone())
    };
    match (ResizeObserver::new(cb.as_ref().unchecked_ref()), area) {
        (Ok(ro), Some(area)) => {
            ro.observe(&area);
            // the observer must outlive this function
            std::mem::forget(ro);
        }
        _ => {
            window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())?;
        }
    }
    cb.forget();
    Ok(())
}

fn parse_dimension(field: &str) -> Result<Dimension, JsValue> {
    match field {
        "width" => Ok(Dimension::Width),
        "height" => Ok(Dimension::Height),
        other => Err(JsValue::from_str(&format!("unknown field '{other}'"))),
    }
}

fn parse_axis(axis: &str) -> Result<Axis, JsValue> {
    match axis {
        "x" => Ok(Axis::X),
        "y" => Ok(Axis::Y),
        other => Err(JsValue::from_str(&format!("unknown axis '{other}'"))),
    }
}

/// Plate configurator bound to a canvas. Mutations repaint synchronously
/// and fire `onChange` listeners when stored state changed.
#[wasm_bindgen]
pub struct Configurator {
    handle: Handle,
}

#[wasm_bindgen]
impl Configurator {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: Option<String>, area_id: Option<String>) -> Result<Configurator, JsValue> {
        utils::init_logging(log::LevelFilter::Info);
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let (canvas, ctx) = init_canvas(&document, canvas_id.as_deref().unwrap_or(CANVAS_ID))?;
        let area = document
            .get_element_by_id(area_id.as_deref().unwrap_or(DRAW_AREA_ID))
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .or_else(|| canvas.parent_element().and_then(|el| el.dyn_into::<HtmlElement>().ok()));

        let (mut plates, mut sockets, mut units) = storage::load_stores(&window);
        let writer = storage::DebouncedWriter::new(window.clone());
        storage::attach_persistence(&mut plates, &mut sockets, &mut units, &writer);
        let changed = Rc::new(Cell::new(false));
        {
            let c = changed.clone();
            plates.subscribe(move |_| c.set(true));
            let c = changed.clone();
            sockets.subscribe(move |_| c.set(true));
            let c = changed.clone();
            units.subscribe(move |_| c.set(true));
        }
        controls::normalize_anchors(plates.plates(), &mut sockets);

        let search = window.location().search().unwrap_or_default();
        let motif = get_query_param(&search, "motif")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MOTIF.to_string());

        let state = State::new(window, document, canvas, ctx, area, (plates, sockets, units));
        let handle = Handle {
            state: Rc::new(RefCell::new(state)),
            changed,
            listeners: Rc::default(),
        };
        attach_pointer(&handle)?;
        attach_resize(&handle)?;
        upload::attach_motif_input(&handle)?;
        handle.load_image(Asset::Motif, asset_url(&motif));
        handle.load_image(Asset::SocketTile, asset_url(SOCKET_TILE));
        handle.settle();
        Ok(Configurator { handle })
    }

    /// Register a callback run after any stored state changed.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, f: js_sys::Function) {
        self.handle.listeners.borrow_mut().push(f);
    }

    pub fn redraw(&self) {
        self.handle.settle();
    }

    /// Current plates, sockets and unit as a project JSON document.
    pub fn snapshot(&self) -> Result<String, JsValue> {
        let s = self.handle.state.borrow();
        let project = ProjectFile {
            plates: s.plates.snapshot().clone(),
            sockets: PersistedSockets::from(s.sockets.snapshot()),
            unit: s.units.unit(),
        };
        project.to_json().map_err(js_err)
    }

    #[wasm_bindgen(js_name = addPlate)]
    pub fn add_plate(&self) -> bool {
        self.handle.mutate(|s| s.plates.add_plate())
    }

    #[wasm_bindgen(js_name = removePlate)]
    pub fn remove_plate(&self, index: usize) -> bool {
        self.handle
            .mutate(|s| controls::remove_plate(&mut s.plates, &mut s.sockets, index))
    }

    /// Raw write in centimeters; the store clamps.
    #[wasm_bindgen(js_name = updatePlate)]
    pub fn update_plate(&self, index: usize, field: &str, value_cm: f64) -> Result<bool, JsValue> {
        let dim = parse_dimension(field)?;
        Ok(self.handle.mutate(|s| {
            let ok = s.plates.update_plate(index, dim, value_cm);
            controls::normalize_anchors(s.plates.plates(), &mut s.sockets);
            ok
        }))
    }

    /// Typed dimension in the current unit. Returns the stored centimeters
    /// or the field-level error message.
    #[wasm_bindgen(js_name = commitDimension)]
    pub fn commit_dimension(&self, index: usize, field: &str, text: &str) -> Result<f64, JsValue> {
        let dim = parse_dimension(field)?;
        self.handle.mutate(|s| {
            let unit = s.units.unit();
            controls::commit_dimension(&mut s.plates, &mut s.sockets, unit, index, dim, text).map_err(js_err)
        })
    }

    #[wasm_bindgen(js_name = plateLabel)]
    pub fn plate_label(&self, index: usize) -> Option<String> {
        let s = self.handle.state.borrow();
        let unit = s.units.unit();
        s.plates.plates().get(index).map(|p| unit.plate_label(p))
    }

    /// Value to show in a dimension field, in the current unit.
    #[wasm_bindgen(js_name = dimensionText)]
    pub fn dimension_text(&self, index: usize, field: &str) -> Result<Option<String>, JsValue> {
        let dim = parse_dimension(field)?;
        let s = self.handle.state.borrow();
        let unit = s.units.unit();
        Ok(s.plates.plates().get(index).map(|p| unit.field_text(p.get(dim))))
    }

    pub fn unit(&self) -> String {
        self.handle.state.borrow().units.unit().as_str().to_string()
    }

    #[wasm_bindgen(js_name = setUnit)]
    pub fn set_unit(&self, unit: &str) -> Result<bool, JsValue> {
        let unit = Unit::parse(unit).ok_or_else(|| JsValue::from_str("unit must be 'cm' or 'in'"))?;
        Ok(self.handle.mutate(|s| s.units.set_unit(unit)))
    }

    #[wasm_bindgen(js_name = toggleSockets)]
    pub fn toggle_sockets(&self) -> Result<Option<String>, JsValue> {
        self.handle.mutate(|s| {
            controls::toggle_sockets(s.plates.plates(), &mut s.sockets).map_err(js_err)
        })
    }

    #[wasm_bindgen(js_name = confirmGroup)]
    pub fn confirm_group(&self, active_id: Option<String>) -> Result<String, JsValue> {
        self.handle.mutate(|s| {
            controls::confirm_group(s.plates.plates(), &mut s.sockets, active_id.as_deref()).map_err(js_err)
        })
    }

    #[wasm_bindgen(js_name = addGroupOn)]
    pub fn add_group_on(&self, plate_index: usize) -> Result<String, JsValue> {
        self.handle.mutate(|s| {
            s.sockets.add_group_on(plate_index, s.plates.plates()).map_err(js_err)
        })
    }

    #[wasm_bindgen(js_name = removeGroup)]
    pub fn remove_group(&self, id: &str) -> bool {
        self.handle.mutate(|s| s.sockets.remove_group(id))
    }

    /// Change plate, count or direction (`"h"`/`"v"`) of a group.
    #[wasm_bindgen(js_name = setGroup)]
    pub fn set_group(
        &self,
        id: &str,
        plate_index: Option<usize>,
        count: Option<u8>,
        dir: Option<String>,
    ) -> Result<(), JsValue> {
        let dir = match dir.as_deref() {
            None => None,
            Some("h") => Some(Direction::Horizontal),
            Some("v") => Some(Direction::Vertical),
            Some(other) => return Err(JsValue::from_str(&format!("unknown direction '{other}'"))),
        };
        let patch = GroupPatch {
            plate_index,
            count,
            dir,
            ..Default::default()
        };
        self.handle.mutate(|s| {
            controls::set_group(s.plates.plates(), &mut s.sockets, id, &patch)
                .map(|_| ())
                .map_err(js_err)
        })
    }

    /// Typed edge distance (`axis` is `"x"` or `"y"`) in the current unit.
    #[wasm_bindgen(js_name = commitPosition)]
    pub fn commit_position(&self, id: &str, axis: &str, text: &str) -> Result<f64, JsValue> {
        let axis = parse_axis(axis)?;
        self.handle.mutate(|s| {
            let unit = s.units.unit();
            controls::commit_position(s.plates.plates(), &mut s.sockets, unit, id, axis, text).map_err(js_err)
        })
    }

    /// Stored edge distance of a group for a position field.
    #[wasm_bindgen(js_name = positionText)]
    pub fn position_text(&self, id: &str, axis: &str) -> Result<Option<String>, JsValue> {
        let axis = parse_axis(axis)?;
        let s = self.handle.state.borrow();
        let unit = s.units.unit();
        Ok(s.sockets.group(id).map(|g| {
            let edge = anchor_to_edge(g.anchor());
            unit.field_text(match axis {
                Axis::X => edge.x,
                Axis::Y => edge.y,
            })
        }))
    }

    /// Socket surcharge of one group, formatted in euros.
    #[wasm_bindgen(js_name = groupPrice)]
    pub fn group_price(&self, id: &str) -> Option<String> {
        let s = self.handle.state.borrow();
        s.sockets.group(id).map(|g| format_eur(g.price_eur()))
    }

    /// Socket surcharge of every group.
    #[wasm_bindgen(js_name = totalPrice)]
    pub fn total_price(&self) -> String {
        format_eur(total_price_eur(self.handle.state.borrow().sockets.groups()))
    }

    pub fn error(&self) -> Option<String> {
        self.handle.state.borrow().sockets.error().map(str::to_string)
    }

    #[wasm_bindgen(js_name = setError)]
    pub fn set_error(&self, message: Option<String>) {
        self.handle.mutate(|s| s.sockets.set_error(message));
    }

    #[wasm_bindgen(js_name = setMotifUrl)]
    pub fn set_motif_url(&self, url: &str) {
        self.handle.load_image(Asset::Motif, asset_url(url));
    }

    #[wasm_bindgen(js_name = setSocketTileUrl)]
    pub fn set_socket_tile_url(&self, url: &str) {
        self.handle.load_image(Asset::SocketTile, asset_url(url));
    }

    /// Render the current composition off screen and download it as PNG.
    #[wasm_bindgen(js_name = exportPng)]
    pub fn export_png(&self) -> Result<String, JsValue> {
        let s = self.handle.state.borrow();
        let bytes = s.export_png()?;
        let name = preview_core::export_file_name(chrono::Utc::now());
        utils::download_bytes(&s.document, &name, "image/png", &bytes)?;
        log(&format!("exported {} ({} bytes)", name, bytes.len()));
        Ok(name)
    }
}
