//! Per-frame engine loop and input wiring.

use crate::breath::FieldBreathModulator;
use crate::constants::*;
use crate::debounce::Debouncer;
use crate::effects::{AmbientCadence, EffectPool, PoolConfig};
use crate::error::EngineError;
use crate::events::{HostObserver, NodeHover};
use crate::evolution::TunnelEvolution;
use crate::geometry::{build_tunnel, TunnelConfig, TunnelMesh};
use crate::input::{PointerRelease, PointerTracker, Throttle};
use crate::link::{LinkEngine, LinkEvent, LinkRules, LinkSync, SelectOutcome, Selection};
use crate::nodes::{NodeId, NodeLayer, Regenerated};
use crate::quality::{DeviceClass, QualityMonitor, QualityTier};
use crate::random::{stream, SeededRandom};
use crate::state::{project_to_screen, screen_to_world_ray, Camera, OrbitControls, Viewport};
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Construction parameters supplied by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    pub seed: u64,
    pub node_count: usize,
    pub tunnel: TunnelConfig,
    /// Halves motion-heavy effects throughout.
    pub reduced_animations: bool,
    pub user_id: String,
    pub device_class: DeviceClass,
    /// Nodes the server already knows as linked.
    pub linked_node_ids: Vec<u32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            node_count: DEFAULT_NODE_COUNT,
            tunnel: TunnelConfig::default(),
            reduced_animations: false,
            user_id: String::new(),
            device_class: DeviceClass::default(),
            linked_node_ids: Vec::new(),
        }
    }
}

/// Breath-driven transform applied to the tunnel root.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootTransform {
    pub scale: f32,
    pub twist: f32,
}

impl RootTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_z(self.twist) * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

impl Default for RootTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            twist: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub dt_ms: f64,
    pub ambient_arcs: usize,
    pub reactive_arcs: usize,
    /// Set on the frame that swapped in a rebuilt tunnel.
    pub regenerated: Option<Regenerated>,
    pub generation: u32,
}

pub struct Orchestrator {
    options: EngineOptions,
    viewport: Viewport,
    controls: OrbitControls,
    evolution: TunnelEvolution,
    mesh: TunnelMesh,
    nodes: NodeLayer,
    links: LinkEngine,
    ambient: EffectPool,
    cadence: AmbientCadence,
    reactive: EffectPool,
    breath: FieldBreathModulator,
    quality: QualityMonitor,
    rebuild: Debouncer,
    pointer: PointerTracker,
    hover_throttle: Throttle,
    root: RootTransform,
    observer: Box<dyn HostObserver>,
    events: Vec<LinkEvent>,
    last_frame_ms: Option<f64>,
    rebuilds: u32,
    disposed: bool,
}

impl Orchestrator {
    pub fn new(
        options: EngineOptions,
        transport: Box<dyn LinkSync>,
        observer: Box<dyn HostObserver>,
        now_ms: f64,
    ) -> Result<Self, EngineError> {
        if options.node_count < 2 {
            return Err(EngineError::NodeCount(options.node_count));
        }
        let seed = options.seed;
        let reduced = options.reduced_animations;
        let device = options.device_class;

        let mut config = options.tunnel.clone();
        config.seed = seed;
        let mesh = build_tunnel(&config)?;

        let mut nodes = NodeLayer::new(&mesh, options.node_count, seed);
        nodes.hydrate_linked(&options.linked_node_ids);

        let links = LinkEngine::new(
            LinkRules::for_depth(config.depth),
            options.user_id.clone(),
            seed,
            transport,
        );
        let ambient = EffectPool::new(
            PoolConfig::ambient(device.ambient_capacity(), reduced),
            &mesh.edges,
            SeededRandom::derive(seed, stream::AMBIENT_FX),
        );
        let reactive = EffectPool::new(
            PoolConfig::reactive(device.reactive_capacity(), reduced),
            &mesh.edges,
            SeededRandom::derive(seed, stream::REACTIVE_FX),
        );
        let cadence = AmbientCadence::new(
            AMBIENT_BASE_RATE,
            reduced,
            SeededRandom::derive(seed, stream::AMBIENT_CADENCE),
        );
        let breath =
            FieldBreathModulator::new(now_ms, reduced, SeededRandom::derive(seed, stream::BREATH));
        let controls = OrbitControls::new(Vec3::new(0.0, 0.0, config.depth * 0.3), !reduced);

        log::info!(
            "[engine] seed={} nodes={} rings={} segments={} device={:?} reduced={}",
            seed,
            nodes.len(),
            config.rings,
            config.segments,
            device,
            reduced
        );

        Ok(Self {
            viewport: Viewport::default(),
            controls,
            evolution: TunnelEvolution::new(config, device),
            mesh,
            nodes,
            links,
            ambient,
            cadence,
            reactive,
            breath,
            quality: QualityMonitor::default(),
            rebuild: Debouncer::new(REBUILD_WINDOW_MS),
            pointer: PointerTracker::default(),
            hover_throttle: Throttle::default(),
            root: RootTransform::default(),
            observer,
            events: Vec::new(),
            last_frame_ms: None,
            rebuilds: 0,
            disposed: false,
            options,
        })
    }

    // ---------------- accessors ----------------

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn mesh(&self) -> &TunnelMesh {
        &self.mesh
    }

    pub fn nodes(&self) -> &NodeLayer {
        &self.nodes
    }

    pub fn links(&self) -> &LinkEngine {
        &self.links
    }

    pub fn selection(&self) -> Selection {
        self.links.selection()
    }

    pub fn ambient_pool(&self) -> &EffectPool {
        &self.ambient
    }

    pub fn reactive_pool(&self) -> &EffectPool {
        &self.reactive
    }

    pub fn cadence(&self) -> &AmbientCadence {
        &self.cadence
    }

    pub fn breath(&self) -> &FieldBreathModulator {
        &self.breath
    }

    pub fn root_transform(&self) -> RootTransform {
        self.root
    }

    pub fn camera(&self) -> Camera {
        self.controls.camera(self.viewport)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn quality_tier(&self) -> QualityTier {
        self.quality.tier()
    }

    pub fn tunnel_config(&self) -> &TunnelConfig {
        self.evolution.config()
    }

    /// Bumped on every rebuild; render state keyed to an older value is stale.
    pub fn scene_generation(&self) -> u32 {
        self.nodes.generation()
    }

    pub fn rebuild_count(&self) -> u32 {
        self.rebuilds
    }

    pub fn rebuild_pending(&self) -> bool {
        self.rebuild.is_pending()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ---------------- host controls ----------------

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport {
            width: width.max(1),
            height: height.max(1),
        };
    }

    pub fn set_reduced_animations(&mut self, on: bool) {
        self.options.reduced_animations = on;
        self.cadence.set_reduced_motion(on);
        self.breath.set_reduced_motion(on);
        self.ambient.set_trails(!on && self.quality.tier() != QualityTier::Low);
        self.reactive.set_trails(!on);
        self.controls.set_auto_orbit(!on);
    }

    // ---------------- pointer input ----------------

    pub fn pointer_move(&mut self, x: f32, y: f32, now_ms: f64) {
        if self.disposed {
            return;
        }
        let pos = Vec2::new(x, y);
        if let Some(delta) = self.pointer.moved(pos) {
            if self.pointer.is_dragging() {
                self.controls.drag(delta.x, delta.y);
                return;
            }
        }
        if !self.hover_throttle.ready(now_ms) {
            return;
        }
        let hit = self.pick(pos);
        if self.nodes.set_hover(hit) {
            self.emit_hover();
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if self.disposed {
            return;
        }
        self.pointer.press(Vec2::new(x, y));
    }

    /// Completes a press. Only a click (displacement within the slop) on a
    /// node reaches discovery and the link protocol.
    pub fn pointer_up(&mut self, x: f32, y: f32, now_ms: f64) -> Option<SelectOutcome> {
        if self.disposed {
            return None;
        }
        let pos = Vec2::new(x, y);
        match self.pointer.release(pos)? {
            PointerRelease::Drag => None,
            PointerRelease::Click => {
                let id = self.pick(pos)?;
                self.activate_node(id, now_ms)
            }
        }
    }

    pub fn pointer_leave(&mut self) {
        if self.disposed {
            return;
        }
        self.pointer.cancel();
        if self.nodes.set_hover(None) {
            self.emit_hover();
        }
    }

    /// A confirmed click on `id`: discover it, then run the selection protocol.
    pub fn activate_node(&mut self, id: NodeId, now_ms: f64) -> Option<SelectOutcome> {
        if self.disposed || self.nodes.get(id).is_none() {
            return None;
        }
        self.nodes.discover(id);
        let outcome = self
            .links
            .select_or_link(id, now_ms, &mut self.nodes, &mut self.events);
        self.dispatch(now_ms);
        Some(outcome)
    }

    fn pick(&self, pos: Vec2) -> Option<NodeId> {
        let ray = screen_to_world_ray(&self.camera(), self.viewport, pos.x, pos.y);
        self.nodes.raycast(&ray.to_local(&self.root.matrix()))
    }

    fn emit_hover(&mut self) {
        let hover = self.nodes.hover().and_then(|id| {
            let node = self.nodes.get(id)?;
            let world = self.root.matrix().transform_point3(node.position);
            let screen = project_to_screen(&self.camera(), self.viewport, world)?;
            Some(NodeHover {
                id: id.0,
                x: screen.x,
                y: screen.y,
                label: node.display_name.clone(),
                theme: node.theme,
                state: node.state,
            })
        });
        self.observer.node_hover(hover.as_ref());
    }

    // ---------------- event routing ----------------

    fn dispatch(&mut self, now_ms: f64) {
        let mut events = std::mem::take(&mut self.events);
        for ev in events.drain(..) {
            match ev {
                LinkEvent::Created { from, to, theme } => {
                    if let (Some(a), Some(b)) = (self.nodes.get(from), self.nodes.get(to)) {
                        self.reactive.spawn_between(a.position, b.position, now_ms);
                    }
                    self.breath
                        .boost_amplitude(LINK_BREATH_BOOST, LINK_BREATH_BOOST_MS, now_ms);
                    self.cadence
                        .boost_rate(LINK_RATE_BOOST, LINK_RATE_BOOST_MS, now_ms);
                    self.observer.link_created(from, to, theme);
                }
                LinkEvent::Evolve {
                    theme,
                    level,
                    theme_links,
                } => {
                    self.observer.evolve(theme, level);
                    if self.evolution.apply(theme, level, theme_links) {
                        if self.rebuild.request(now_ms) {
                            log::debug!("[engine] rebuild scheduled");
                        } else {
                            log::debug!("[engine] rebuild request dropped (debounced)");
                        }
                    }
                }
            }
        }
        // keep the allocation
        self.events = events;
    }

    fn rebuild_geometry(&mut self) -> Option<Regenerated> {
        let mesh = match build_tunnel(self.evolution.config()) {
            Ok(mesh) => mesh,
            Err(e) => {
                log::error!("[engine] rebuild failed, keeping current tunnel: {}", e);
                return None;
            }
        };
        let regenerated = self
            .nodes
            .regenerate(&mesh, self.options.node_count, self.options.seed);
        self.ambient.refresh_edges(&mesh.edges);
        self.reactive.refresh_edges(&mesh.edges);
        self.mesh = mesh;
        self.links.clear_selection();
        self.rebuilds += 1;
        self.emit_hover();
        Some(regenerated)
    }

    // ---------------- frame ----------------

    pub fn frame(&mut self, now_ms: f64) -> FrameStats {
        if self.disposed {
            return FrameStats::default();
        }
        let dt_ms = match self.last_frame_ms {
            Some(last) => (now_ms - last).clamp(0.0, MAX_FRAME_DT_MS),
            None => 0.0,
        };
        if self.last_frame_ms.is_some() {
            if let Some(tier) = self.quality.tick(dt_ms as f32) {
                self.apply_tier(tier);
            }
        }
        self.last_frame_ms = Some(now_ms);
        let dt_sec = (dt_ms / 1000.0) as f32;

        let regenerated = if self.rebuild.take_due(now_ms) {
            self.rebuild_geometry()
        } else {
            None
        };

        self.links.poll(&mut self.events);
        self.dispatch(now_ms);

        self.breath.update(now_ms);
        self.root = RootTransform {
            scale: self.breath.scale(),
            twist: self.breath.twist_delta(),
        };

        self.nodes.update(dt_sec);

        if self.cadence.should_spawn(now_ms) {
            self.ambient.spawn_along_edges(now_ms);
        }
        let intensity = self.breath.intensity();
        self.ambient.set_field_intensity(intensity);
        self.reactive.set_field_intensity(intensity);
        self.ambient.update(now_ms, dt_sec);
        self.reactive.update(now_ms, dt_sec);

        self.controls.update(dt_sec);

        FrameStats {
            dt_ms,
            ambient_arcs: self.ambient.len(),
            reactive_arcs: self.reactive.len(),
            regenerated,
            generation: self.nodes.generation(),
        }
    }

    fn apply_tier(&mut self, tier: QualityTier) {
        self.cadence
            .set_base_rate(AMBIENT_BASE_RATE * tier.ambient_rate_scale());
        self.ambient
            .set_trails(tier != QualityTier::Low && !self.options.reduced_animations);
    }

    /// Stop the engine and free every pooled resource. Outstanding syncs are
    /// dropped; nothing they produce is applied afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.links.dispose();
        self.ambient.dispose();
        self.reactive.dispose();
        self.nodes.dispose();
        self.rebuild.cancel();
        self.events.clear();
        log::info!("[engine] disposed");
    }
}
