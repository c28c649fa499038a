//! Re-broadcasts engine notifications as DOM events on the canvas so the
//! host page can drive tooltips and counters without touching the engine.

use crate::dom;
use tunnel_core::{Evolved, HostObserver, LinkCreated, NodeHover, NodeId, Theme};
use web_sys as web;

pub const NODE_HOVER_EVENT: &str = "node-hover";
pub const LINK_CREATED_EVENT: &str = "link-created";
pub const EVOLVE_EVENT: &str = "evolve";

pub struct DomObserver {
    target: web::EventTarget,
}

impl DomObserver {
    pub fn new(canvas: &web::HtmlCanvasElement) -> Self {
        Self {
            target: canvas.clone().into(),
        }
    }

    fn emit<T: serde::Serialize + ?Sized>(&self, name: &str, detail: &T) {
        if let Err(e) = dom::dispatch_custom_event(&self.target, name, detail) {
            log::warn!("[web] failed to dispatch {}: {:?}", name, e);
        }
    }
}

impl HostObserver for DomObserver {
    fn node_hover(&mut self, hover: Option<&NodeHover>) {
        // detail is null once the pointer leaves every node
        self.emit(NODE_HOVER_EVENT, &hover);
    }

    fn link_created(&mut self, from: NodeId, to: NodeId, theme: Theme) {
        self.emit(
            LINK_CREATED_EVENT,
            &LinkCreated {
                from: from.0,
                to: to.0,
                theme,
            },
        );
    }

    fn evolve(&mut self, theme: Theme, level: u32) {
        self.emit(EVOLVE_EVENT, &Evolved { theme, level });
    }
}
