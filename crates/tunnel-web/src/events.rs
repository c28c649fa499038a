//! DOM listener wiring. Every closure is kept alongside its target so the
//! mount can remove them all on dispose instead of leaking them with
//! `forget`.

use crate::dom;
use crate::frame::Clock;
use crate::input;
use std::cell::RefCell;
use std::rc::Rc;
use tunnel_core::Orchestrator;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

struct Listener {
    target: web::EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web::Event)>,
}

#[derive(Default)]
pub struct Listeners {
    entries: Vec<Listener>,
}

impl Listeners {
    pub fn add(
        &mut self,
        target: &web::EventTarget,
        kind: &'static str,
        handler: impl FnMut(web::Event) + 'static,
    ) {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web::Event)>);
        if let Err(e) =
            target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
        {
            log::warn!("[web] could not listen for {}: {:?}", kind, e);
            return;
        }
        self.entries.push(Listener {
            target: target.clone(),
            kind,
            closure,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn remove_all(&mut self) {
        for l in self.entries.drain(..) {
            let _ = l
                .target
                .remove_event_listener_with_callback(l.kind, l.closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for Listeners {
    fn drop(&mut self) {
        self.remove_all();
    }
}

/// Forward a pointer event to the engine in canvas pixels. Events arriving
/// while the engine is busy (a host listener reacting to one of our own
/// events) are dropped.
fn on_pointer(
    engine: &Rc<RefCell<Orchestrator>>,
    canvas: &web::HtmlCanvasElement,
    ev: &web::Event,
    f: impl FnOnce(&mut Orchestrator, glam::Vec2),
) {
    let Some(ev) = ev.dyn_ref::<web::PointerEvent>() else {
        return;
    };
    let pos = input::pointer_canvas_px(ev, canvas);
    if let Ok(mut engine) = engine.try_borrow_mut() {
        f(&mut engine, pos);
    }
}

pub fn wire_input(
    canvas: &web::HtmlCanvasElement,
    engine: Rc<RefCell<Orchestrator>>,
    clock: Clock,
) -> Listeners {
    let mut listeners = Listeners::default();
    let target: &web::EventTarget = canvas.as_ref();

    // pointermove
    {
        let engine_m = engine.clone();
        let canvas_m = canvas.clone();
        listeners.add(target, "pointermove", move |ev| {
            on_pointer(&engine_m, &canvas_m, &ev, |e, pos| {
                e.pointer_move(pos.x, pos.y, clock.now_ms())
            });
        });
    }

    // pointerdown
    {
        let engine_d = engine.clone();
        let canvas_d = canvas.clone();
        listeners.add(target, "pointerdown", move |ev| {
            on_pointer(&engine_d, &canvas_d, &ev, |e, pos| e.pointer_down(pos.x, pos.y));
            if let Some(pe) = ev.dyn_ref::<web::PointerEvent>() {
                let _ = canvas_d.set_pointer_capture(pe.pointer_id());
            }
            ev.prevent_default();
        });
    }

    // pointerup
    {
        let engine_u = engine.clone();
        let canvas_u = canvas.clone();
        listeners.add(target, "pointerup", move |ev| {
            on_pointer(&engine_u, &canvas_u, &ev, |e, pos| {
                if let Some(outcome) = e.pointer_up(pos.x, pos.y, clock.now_ms()) {
                    log::debug!("[web] click -> {:?}", outcome);
                }
            });
            ev.prevent_default();
        });
    }

    // pointerleave / pointercancel
    for kind in ["pointerleave", "pointercancel"] {
        let engine_l = engine.clone();
        listeners.add(target, kind, move |_ev| {
            if let Ok(mut e) = engine_l.try_borrow_mut() {
                e.pointer_leave();
            }
        });
    }

    // window resize only resyncs the backing store; the frame loop picks up
    // the new size for the engine viewport and the surface
    if let Some(window) = web::window() {
        let canvas_r = canvas.clone();
        listeners.add(window.as_ref(), "resize", move |_ev| {
            dom::sync_canvas_backing_size(&canvas_r);
        });
    }

    log::info!("[web] {} listeners wired", listeners.len());
    listeners
}
