use crate::nodes::{NodeId, NodeState};
use crate::theme::Theme;
use serde::Serialize;

/// Hover target projected to canvas pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHover {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub label: String,
    pub theme: Theme,
    pub state: NodeState,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCreated {
    pub from: u32,
    pub to: u32,
    pub theme: Theme,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evolved {
    pub theme: Theme,
    pub level: u32,
}

pub trait HostObserver {
    /// `None` when the pointer left every node.
    fn node_hover(&mut self, _hover: Option<&NodeHover>) {}
    fn link_created(&mut self, _from: NodeId, _to: NodeId, _theme: Theme) {}
    fn evolve(&mut self, _theme: Theme, _level: u32) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl HostObserver for NullObserver {}
