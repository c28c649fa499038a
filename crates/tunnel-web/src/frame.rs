use crate::render;
use instant::Instant;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tunnel_core::{Orchestrator, Viewport};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

/// Millisecond clock shared by the frame loop and input handlers so both feed
/// the engine timestamps from the same origin.
#[derive(Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

pub struct FrameContext<'a> {
    pub engine: Rc<RefCell<Orchestrator>>,
    pub canvas: web::HtmlCanvasElement,
    pub gpu: Option<render::GpuState<'a>>,
    pub clock: Clock,
}

impl<'a> FrameContext<'a> {
    pub fn frame(&mut self) {
        let now_ms = self.clock.now_ms();
        // busy means a host listener re-entered us; skip this frame
        let Ok(mut engine) = self.engine.try_borrow_mut() else {
            return;
        };
        if engine.is_disposed() {
            return;
        }

        let width = self.canvas.width().max(1);
        let height = self.canvas.height().max(1);
        if engine.viewport() != (Viewport { width, height }) {
            engine.resize(width, height);
        }

        let stats = engine.frame(now_ms);
        if let Some(r) = stats.regenerated {
            log::info!("[web] tunnel rebuilt, generation {}", r.generation);
        }

        if let Some(g) = self.gpu.as_mut() {
            if let Some(r) = stats.regenerated {
                g.rebind(&engine, r);
            }
            g.resize_if_needed(width, height);
            match g.render(&engine, (now_ms / 1000.0) as f32) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => g.reconfigure(),
                Err(e) => log::error!("[web] render error: {:?}", e),
            }
        }
    }
}

pub async fn init_gpu(canvas: &web::HtmlCanvasElement) -> Option<render::GpuState<'static>> {
    match render::GpuState::new(canvas).await {
        Ok(g) => Some(g),
        Err(e) => {
            log::error!("[web] WebGPU init error: {:?}", e);
            None
        }
    }
}

type Tick = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// A running `requestAnimationFrame` loop. [`RafLoop::stop`] cancels the
/// pending frame and drops the callback together with everything it owns.
pub struct RafLoop {
    tick: Tick,
    pending: Rc<Cell<Option<i32>>>,
}

impl RafLoop {
    /// Must not be called from inside the loop's own callback.
    pub fn stop(&self) {
        if let Some(id) = self.pending.take() {
            if let Some(w) = web::window() {
                let _ = w.cancel_animation_frame(id);
            }
        }
        self.tick.borrow_mut().take();
    }
}

fn request_frame(tick: &Tick) -> Option<i32> {
    let window = web::window()?;
    let tick = tick.borrow();
    let callback = tick.as_ref()?;
    window
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .ok()
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext<'static>>>) -> RafLoop {
    let tick: Tick = Rc::new(RefCell::new(None));
    let pending = Rc::new(Cell::new(None));
    let tick_clone = tick.clone();
    let pending_clone = pending.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        pending_clone.set(None);
        frame_ctx.borrow_mut().frame();
        pending_clone.set(request_frame(&tick_clone));
    }) as Box<dyn FnMut()>));
    pending.set(request_frame(&tick));
    RafLoop { tick, pending }
}
