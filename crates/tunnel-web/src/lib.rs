#![cfg(target_arch = "wasm32")]
//! Browser front-end for the neural tunnel.
//!
//! `mount` binds an [`Orchestrator`] to a canvas: DOM pointer events feed the
//! engine, a `requestAnimationFrame` loop drives `frame` and renders through
//! WebGPU, link syncs go out over `fetch`, and host notifications come back
//! as `CustomEvent`s on the canvas.

mod dom;
mod events;
mod frame;
mod input;
mod observer;
mod render;
mod rpc;

use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tunnel_core::{EngineOptions, LinkSync, OfflineSync, Orchestrator};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("tunnel-web loaded");
    Ok(())
}

/// Options accepted by [`mount`]: the engine options plus the RPC endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MountOptions {
    rpc_url: Option<String>,
    api_key: Option<String>,
    #[serde(flatten)]
    engine: EngineOptions,
}

struct Mount {
    engine: Rc<RefCell<Orchestrator>>,
    canvas: web::HtmlCanvasElement,
    raf: frame::RafLoop,
    listeners: RefCell<events::Listeners>,
    torn_down: Cell<bool>,
}

impl Mount {
    fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        self.raf.stop();
        self.listeners.borrow_mut().remove_all();
        match self.engine.try_borrow_mut() {
            Ok(mut engine) => engine.dispose(),
            Err(_) => log::warn!("[web] engine busy during teardown"),
        }
    }
}

/// Handle returned to JS. Dropping it on the JS side does not stop the
/// engine; call `dispose`.
#[wasm_bindgen]
pub struct TunnelHandle {
    inner: Rc<Mount>,
}

#[wasm_bindgen]
impl TunnelHandle {
    /// Stop the loop, detach listeners and free engine resources. Safe to
    /// call more than once, including from inside one of our own events.
    pub fn dispose(&self) {
        let mount = self.inner.clone();
        if mount.engine.try_borrow_mut().is_ok() {
            mount.teardown();
        } else {
            // called from a listener while the engine is mid-frame or
            // mid-event; finish once the current task unwinds
            spawn_local(async move { mount.teardown() });
        }
    }

    #[wasm_bindgen(js_name = isDisposed)]
    pub fn is_disposed(&self) -> bool {
        self.inner.torn_down.get()
    }

    #[wasm_bindgen(js_name = setReducedAnimations)]
    pub fn set_reduced_animations(&self, on: bool) {
        self.with_engine(move |e| e.set_reduced_animations(on));
    }

    /// Re-read the canvas CSS size; the next frame resizes the viewport.
    pub fn resize(&self) {
        dom::sync_canvas_backing_size(&self.inner.canvas);
    }
}

impl TunnelHandle {
    fn with_engine(&self, f: impl FnOnce(&mut Orchestrator) + 'static) {
        if self.inner.torn_down.get() {
            return;
        }
        if let Ok(mut engine) = self.inner.engine.try_borrow_mut() {
            f(&mut engine);
            return;
        }
        let engine = self.inner.engine.clone();
        spawn_local(async move {
            if let Ok(mut engine) = engine.try_borrow_mut() {
                f(&mut engine);
            }
        });
    }
}

fn to_js_error(e: anyhow::Error) -> JsValue {
    js_sys::Error::new(&format!("{e:#}")).into()
}

/// Mount the tunnel on the canvas with id `canvas_id`. `options` is a plain
/// object (camelCase keys) or `undefined` for defaults.
#[wasm_bindgen]
pub async fn mount(canvas_id: String, options: JsValue) -> Result<TunnelHandle, JsValue> {
    mount_inner(&canvas_id, options).await.map_err(to_js_error)
}

async fn mount_inner(canvas_id: &str, options: JsValue) -> anyhow::Result<TunnelHandle> {
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;
    let canvas: web::HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| anyhow::anyhow!("missing #{canvas_id}"))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("#{canvas_id} is not a canvas: {:?}", e)))?;

    let options: MountOptions = if options.is_undefined() || options.is_null() {
        MountOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| anyhow::anyhow!("invalid mount options: {e}"))?
    };

    dom::sync_canvas_backing_size(&canvas);

    let transport: Box<dyn LinkSync> = match options.rpc_url {
        Some(url) => {
            log::info!("[web] link sync via {}", url);
            Box::new(rpc::FetchLinkSync::new(url, options.api_key))
        }
        None => {
            log::warn!("[web] no rpcUrl given, links stay local");
            Box::new(OfflineSync)
        }
    };
    let observer = Box::new(observer::DomObserver::new(&canvas));

    let clock = frame::Clock::start();
    let mut engine = Orchestrator::new(options.engine, transport, observer, clock.now_ms())?;
    engine.resize(canvas.width(), canvas.height());
    let engine = Rc::new(RefCell::new(engine));

    // the engine keeps running without a GPU so host events still fire
    let gpu = frame::init_gpu(&canvas).await;

    let listeners = events::wire_input(&canvas, engine.clone(), clock);
    let ctx = Rc::new(RefCell::new(frame::FrameContext {
        engine: engine.clone(),
        canvas: canvas.clone(),
        gpu,
        clock,
    }));
    let raf = frame::start_loop(ctx);

    Ok(TunnelHandle {
        inner: Rc::new(Mount {
            engine,
            canvas,
            raf,
            listeners: RefCell::new(listeners),
            torn_down: Cell::new(false),
        }),
    })
}
