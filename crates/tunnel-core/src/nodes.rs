//! Nodes sampled from the tunnel surface. State only moves forward.

use crate::constants::*;
use crate::geometry::TunnelMesh;
use crate::input::ray_sphere;
use crate::random::{stream, SeededRandom};
use crate::state::Ray;
use crate::theme::Theme;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Locked,
    Discovered,
    Linked,
}

impl NodeState {
    #[inline]
    fn rank(self) -> u8 {
        match self {
            NodeState::Locked => 0,
            NodeState::Discovered => 1,
            NodeState::Linked => 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec3,
    pub state: NodeState,
    pub theme: Theme,
    pub display_name: String,
    /// Active pulse in `[0, 1]`; 0 is idle.
    pub pulse: f32,
    /// Scale multiplier reached at `pulse == 1`.
    burst: f32,
}

impl Node {
    #[inline]
    pub fn scale(&self) -> f32 {
        NODE_BASE_SCALE * (1.0 + self.pulse * (self.burst - 1.0))
    }

    fn advance_to(&mut self, next: NodeState) -> bool {
        if next.rank() <= self.state.rank() {
            return false;
        }
        self.state = next;
        true
    }

    fn fire_pulse(&mut self, burst: f32) {
        self.pulse = 1.0;
        self.burst = burst;
    }

    fn color(&self, hovered: bool) -> [f32; 4] {
        let theme = self.theme.color_rgb();
        let (rgb, k) = match self.state {
            NodeState::Locked => (LOCKED_COLOR, 1.0),
            NodeState::Discovered => (theme, DISCOVERED_DIM),
            NodeState::Linked => (theme, LINKED_BRIGHTEN),
        };
        let k = if hovered { k * HOVER_BRIGHTEN } else { k };
        [rgb[0] * k, rgb[1] * k, rgb[2] * k, 1.0]
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NodeInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 4],
    pub pulse: f32,
    pub hovered: f32,
    pub state: f32,
    pub _pad: f32,
}

/// Emitted by [`NodeLayer::regenerate`] so owners of derived render state can
/// rebind it to the new generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Regenerated {
    pub generation: u32,
    pub node_count: usize,
}

pub struct NodeLayer {
    nodes: Vec<Node>,
    instances: Vec<NodeInstance>,
    hover: Option<NodeId>,
    generation: u32,
}

impl NodeLayer {
    pub fn new(mesh: &TunnelMesh, node_count: usize, seed: u64) -> Self {
        let mut layer = Self {
            nodes: Vec::new(),
            instances: Vec::new(),
            hover: None,
            generation: 0,
        };
        layer.nodes = sample_nodes(mesh, node_count, seed);
        layer.refresh_instances();
        log::info!("[nodes] sampled {} nodes", layer.nodes.len());
        layer
    }

    /// Build a layer from explicit positions instead of sampling a mesh.
    pub fn from_points(points: impl IntoIterator<Item = (Vec3, Theme)>) -> Self {
        let mut ordinals = [0u32; Theme::ALL.len()];
        let nodes = points
            .into_iter()
            .enumerate()
            .map(|(i, (position, theme))| {
                let slot = theme_slot(theme);
                ordinals[slot] += 1;
                Node {
                    id: NodeId(i as u32),
                    position,
                    state: NodeState::Locked,
                    theme,
                    display_name: theme.display_name(ordinals[slot]),
                    pulse: 0.0,
                    burst: 1.0,
                }
            })
            .collect();
        let mut layer = Self {
            nodes,
            instances: Vec::new(),
            hover: None,
            generation: 0,
        };
        layer.refresh_instances();
        layer
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.get(id).map(|n| n.state)
    }

    pub fn hover(&self) -> Option<NodeId> {
        self.hover
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn instances(&self) -> &[NodeInstance] {
        &self.instances
    }

    /// `Locked -> Discovered`. Returns whether a transition happened; any
    /// other starting state is a no-op.
    pub fn discover(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id.0 as usize) else {
            return false;
        };
        if node.state != NodeState::Locked {
            return false;
        }
        node.advance_to(NodeState::Discovered);
        node.fire_pulse(PULSE_SCALE_DISCOVER);
        log::debug!("[nodes] discovered {} ({})", id, node.display_name);
        true
    }

    /// Any state `-> Linked` (terminal). Returns whether a transition happened.
    pub fn link(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id.0 as usize) else {
            return false;
        };
        // Re-linking an already linked node still pulses, but is not a transition.
        let changed = node.advance_to(NodeState::Linked);
        node.fire_pulse(PULSE_SCALE_LINK);
        changed
    }

    /// Reversible highlight, independent of discovery/link state. Returns
    /// whether the hovered node changed.
    pub fn set_hover(&mut self, id: Option<NodeId>) -> bool {
        let id = id.filter(|id| (id.0 as usize) < self.nodes.len());
        if self.hover == id {
            return false;
        }
        self.hover = id;
        if let Some(node) = id.and_then(|id| self.nodes.get_mut(id.0 as usize)) {
            // A stronger pulse already in flight wins.
            if node.pulse < 0.5 {
                node.fire_pulse(PULSE_SCALE_HOVER);
            }
        }
        true
    }

    /// Nearest node whose pick sphere the ray enters.
    pub fn raycast(&self, ray: &Ray) -> Option<NodeId> {
        let mut best = None::<(NodeId, f32)>;
        for node in &self.nodes {
            if let Some(t) = ray_sphere(ray.origin, ray.dir, node.position, NODE_PICK_RADIUS) {
                match best {
                    Some((_, bt)) if t >= bt => {}
                    _ => best = Some((node.id, t)),
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Decay pulses toward 0 at a fixed rate and refresh instance data.
    pub fn update(&mut self, dt_sec: f32) {
        let decay = (-dt_sec.max(0.0) * PULSE_DECAY_PER_SEC).exp();
        for node in &mut self.nodes {
            if node.pulse > 0.0 {
                node.pulse *= decay;
                if node.pulse < 1e-3 {
                    node.pulse = 0.0;
                }
            }
        }
        self.refresh_instances();
    }

    /// Discard the current instance data and resample against `mesh`. Ids are
    /// index based, so each id keeps the state it had; nothing regresses.
    #[must_use]
    pub fn regenerate(&mut self, mesh: &TunnelMesh, node_count: usize, seed: u64) -> Regenerated {
        let previous: Vec<NodeState> = self.nodes.iter().map(|n| n.state).collect();
        self.dispose();
        self.nodes = sample_nodes(mesh, node_count, seed);
        for (node, state) in self.nodes.iter_mut().zip(previous) {
            node.advance_to(state);
        }
        self.generation = self.generation.wrapping_add(1);
        self.refresh_instances();
        log::info!(
            "[nodes] regenerated generation={} nodes={}",
            self.generation,
            self.nodes.len()
        );
        Regenerated {
            generation: self.generation,
            node_count: self.nodes.len(),
        }
    }

    /// Mark previously acknowledged links without pulsing.
    pub fn hydrate_linked(&mut self, ids: &[u32]) {
        for &id in ids {
            match self.nodes.get_mut(id as usize) {
                Some(node) => {
                    node.advance_to(NodeState::Linked);
                }
                None => log::warn!("[nodes] ignoring unknown linked id {}", id),
            }
        }
        self.refresh_instances();
    }

    pub fn dispose(&mut self) {
        self.nodes.clear();
        self.instances.clear();
        self.hover = None;
    }

    fn refresh_instances(&mut self) {
        let hover = self.hover;
        self.instances.clear();
        self.instances.extend(self.nodes.iter().map(|n| {
            let hovered = hover == Some(n.id);
            NodeInstance {
                position: n.position.to_array(),
                scale: n.scale(),
                color: n.color(hovered),
                pulse: n.pulse,
                hovered: if hovered { 1.0 } else { 0.0 },
                state: n.state.rank() as f32,
                _pad: 0.0,
            }
        }));
    }
}

fn theme_slot(theme: Theme) -> usize {
    Theme::ALL.iter().position(|t| *t == theme).unwrap_or(0)
}

/// Stratified sampling: a fixed stride over the interior vertices (entrance
/// and vanishing rings excluded) with a bounded seeded offset inside each
/// stride.
fn sample_nodes(mesh: &TunnelMesh, node_count: usize, seed: u64) -> Vec<Node> {
    let stride_per_ring = mesh.config.segments as usize + 1;
    let first = stride_per_ring;
    let last = mesh
        .vertices
        .len()
        .saturating_sub(stride_per_ring)
        .max(first + 1);
    let available = last - first;
    let count = node_count.min(available);
    if count < node_count {
        log::warn!(
            "[nodes] mesh has {} interior vertices, clamping node count {} -> {}",
            available,
            node_count,
            count
        );
    }
    if count == 0 {
        return Vec::new();
    }
    let stride = available / count;
    let mut rng = SeededRandom::derive(seed, stream::NODE_SAMPLING);
    let mut ordinals = [0u32; Theme::ALL.len()];

    (0..count)
        .map(|i| {
            let offset = rng.index(stride.max(1));
            let vi = (first + i * stride + offset).min(last - 1);
            let p = mesh.position(vi).unwrap_or(Vec3::ZERO);
            let position = Vec3::new(p.x * NODE_INSET, p.y * NODE_INSET, p.z);
            let ti = rng.index(Theme::ALL.len());
            let theme = Theme::ALL[ti];
            ordinals[ti] += 1;
            Node {
                id: NodeId(i as u32),
                position,
                state: NodeState::Locked,
                theme,
                display_name: theme.display_name(ordinals[ti]),
                pulse: 0.0,
                burst: 1.0,
            }
        })
        .collect()
}
