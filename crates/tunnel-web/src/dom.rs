use serde::Serialize;
use wasm_bindgen::JsValue;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// Keep the canvas backing store at CSS size times devicePixelRatio.
pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) {
    if let Some(w) = web::window() {
        let dpr = w.device_pixel_ratio();
        let rect = canvas.get_bounding_client_rect();
        let w_px = (rect.width() * dpr) as u32;
        let h_px = (rect.height() * dpr) as u32;
        canvas.set_width(w_px.max(1));
        canvas.set_height(h_px.max(1));
    }
}

/// Dispatch a bubbling `CustomEvent` named `name` on `target`, with `detail`
/// converted to a plain JS object (`None` becomes `null`).
pub fn dispatch_custom_event<T: Serialize + ?Sized>(
    target: &web::EventTarget,
    name: &str,
    detail: &T,
) -> Result<(), JsValue> {
    let detail = detail.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?;
    let init = web::CustomEventInit::new();
    init.set_bubbles(true);
    init.set_detail(&detail);
    let event = web::CustomEvent::new_with_event_init_dict(name, &init)?;
    target.dispatch_event(&event)?;
    Ok(())
}
