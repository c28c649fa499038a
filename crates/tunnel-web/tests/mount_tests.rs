#![cfg(target_arch = "wasm32")]
// Browser-side lifecycle checks; run with `wasm-pack test --headless --chrome`.

use tunnel_web::mount;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;
use web_sys as web;

wasm_bindgen_test_configure!(run_in_browser);

fn add_canvas(id: &str) -> web::HtmlCanvasElement {
    let document = web::window().and_then(|w| w.document()).unwrap();
    let canvas = document.create_element("canvas").unwrap();
    canvas.set_id(id);
    canvas
        .set_attribute("style", "width: 320px; height: 240px")
        .unwrap();
    document.body().unwrap().append_child(&canvas).unwrap();
    canvas.dyn_into().unwrap()
}

#[wasm_bindgen_test]
async fn mount_and_dispose_repeat_on_one_canvas() {
    let canvas = add_canvas("tunnel-remount");
    for _ in 0..3 {
        let handle = mount("tunnel-remount".into(), JsValue::UNDEFINED)
            .await
            .unwrap();
        assert!(!handle.is_disposed());
        handle.dispose();
        handle.dispose();
        assert!(handle.is_disposed());
        // calls after teardown are ignored
        handle.set_reduced_animations(true);
    }
    assert!(canvas.width() >= 1);
    canvas.remove();
}

#[wasm_bindgen_test]
async fn mount_rejects_a_missing_canvas() {
    assert!(mount("no-such-canvas".into(), JsValue::UNDEFINED)
        .await
        .is_err());
}
