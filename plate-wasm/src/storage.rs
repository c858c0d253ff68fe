use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use plate_core::persist::{
    PLATES_KEY, SOCKETS_KEY, UNITS_KEY, load_plates, load_sockets, load_unit, save_plates, save_sockets,
    save_unit,
};
use plate_core::{PlateStore, SocketStore, UnitStore};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Storage, Window};

use crate::constants::SAVE_DEBOUNCE_MS;
use crate::log;

fn local_storage(window: &Window) -> Option<Storage> {
    window.local_storage().ok().flatten()
}

/// Read the three stores from local storage, sanitising whatever is there.
pub fn load_stores(window: &Window) -> (PlateStore, SocketStore, UnitStore) {
    let storage = local_storage(window);
    let get = |key: &str| storage.as_ref().and_then(|s| s.get_item(key).ok().flatten());
    let plates = PlateStore::from_state(load_plates(get(PLATES_KEY).as_deref()));
    let mut sockets = SocketStore::from_state(load_sockets(get(SOCKETS_KEY).as_deref()));
    sockets.ensure_groups_within(plates.plates().len());
    let units = UnitStore::new(load_unit(get(UNITS_KEY).as_deref()).unit);
    (plates, sockets, units)
}

/// Collects writes and flushes them once no new write arrived for
/// `SAVE_DEBOUNCE_MS`.
pub struct DebouncedWriter {
    window: Window,
    pending: Rc<RefCell<BTreeMap<&'static str, String>>>,
    timer: Cell<Option<i32>>,
    flush: Closure<dyn FnMut()>,
}

impl DebouncedWriter {
    pub fn new(window: Window) -> Rc<Self> {
        let pending: Rc<RefCell<BTreeMap<&'static str, String>>> = Rc::default();
        let p = pending.clone();
        let w = window.clone();
        let flush = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            let Some(storage) = local_storage(&w) else {
                log("localStorage unavailable; changes not saved");
                return;
            };
            for (key, value) in std::mem::take(&mut *p.borrow_mut()) {
                if let Err(e) = storage.set_item(key, &value) {
                    log(&format!("Failed to save {key}: {e:?}"));
                }
            }
        }));
        Rc::new(DebouncedWriter {
            window,
            pending,
            timer: Cell::new(None),
            flush,
        })
    }

    pub fn write(&self, key: &'static str, value: String) {
        self.pending.borrow_mut().insert(key, value);
        if let Some(id) = self.timer.take() {
            self.window.clear_timeout_with_handle(id);
        }
        let id = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                self.flush.as_ref().unchecked_ref(),
                SAVE_DEBOUNCE_MS,
            )
            .ok();
        self.timer.set(id);
    }
}

/// Subscribe the writer to every store so each change is saved.
pub fn attach_persistence(
    plates: &mut PlateStore,
    sockets: &mut SocketStore,
    units: &mut UnitStore,
    writer: &Rc<DebouncedWriter>,
) {
    let w = writer.clone();
    plates.subscribe(move |s| match save_plates(s) {
        Ok(json) => w.write(PLATES_KEY, json),
        Err(e) => log(&format!("Failed to serialise plates: {e}")),
    });
    let w = writer.clone();
    sockets.subscribe(move |s| match save_sockets(s) {
        Ok(json) => w.write(SOCKETS_KEY, json),
        Err(e) => log(&format!("Failed to serialise sockets: {e}")),
    });
    let w = writer.clone();
    units.subscribe(move |s| match save_unit(s) {
        Ok(json) => w.write(UNITS_KEY, json),
        Err(e) => log(&format!("Failed to serialise unit: {e}")),
    });
}
