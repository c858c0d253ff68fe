use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Event, FileReader, HtmlInputElement};

use crate::constants::MOTIF_INPUT_ID;
use crate::state::Asset;
use crate::{Handle, log};

// Wires up the file input that replaces the motif with a local image.
pub fn attach_motif_input(handle: &Handle) -> Result<(), JsValue> {
    let doc = handle.state.borrow().document.clone();
    let Some(input) = doc.get_element_by_id(MOTIF_INPUT_ID) else {
        return Ok(());
    };
    let input: HtmlInputElement = input.dyn_into()?;
    let h = handle.clone();
    let input_for_closure = input.clone();
    let onchange = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_e: Event| {
        let Some(file) = input_for_closure.files().and_then(|f| f.item(0)) else {
            log("No file selected");
            return;
        };
        let reader = match FileReader::new() {
            Ok(r) => r,
            Err(e) => {
                log(&format!("FileReader unavailable: {e:?}"));
                return;
            }
        };
        let token = h.state.borrow_mut().begin_load(Asset::Motif);
        let h2 = h.clone();
        let reader_for_closure = reader.clone();
        let onload = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_ev: Event| {
            let bytes = match reader_for_closure.result() {
                Ok(buf) => js_sys::Uint8Array::new(&buf).to_vec(),
                Err(e) => {
                    log(&format!("Failed to read image: {e:?}"));
                    return;
                }
            };
            h2.finish_image(Asset::Motif, token, &bytes);
        }));
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        if let Err(e) = reader.read_as_array_buffer(&file) {
            log(&format!("Failed to read file: {:?}", e));
        }
        onload.forget();
    }));
    input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
    onchange.forget();
    Ok(())
}
