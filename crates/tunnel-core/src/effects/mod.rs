//! Pooled transient arcs with FIFO eviction at capacity.

mod ambient;
mod paths;

pub use ambient::AmbientCadence;
pub use paths::{bowed, smooth, EdgeGraph};

use crate::constants::*;
use crate::geometry::Edge;
use crate::random::SeededRandom;
use glam::Vec3;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcKind {
    Ambient,
    Reactive,
}

#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub kind: ArcKind,
    pub capacity: usize,
    pub lifetime_ms: (f64, f64),
    pub trails: bool,
    pub color: [f32; 3],
}

impl PoolConfig {
    pub fn ambient(capacity: usize, reduced_motion: bool) -> Self {
        Self {
            kind: ArcKind::Ambient,
            capacity,
            lifetime_ms: AMBIENT_LIFETIME_MS,
            trails: !reduced_motion,
            color: [0.45, 0.7, 1.0],
        }
    }

    pub fn reactive(capacity: usize, reduced_motion: bool) -> Self {
        Self {
            kind: ArcKind::Reactive,
            capacity,
            lifetime_ms: REACTIVE_LIFETIME_MS,
            trails: !reduced_motion,
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Per-arc values handed to the arc shader.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ArcParams {
    pub time: f32,
    pub lifetime_ratio: f32,
    pub field_intensity: f32,
    pub trail_length: f32,
    pub color: [f32; 3],
}

#[derive(Clone, Debug)]
pub struct Arc {
    pub id: u64,
    pub path: Vec<Vec3>,
    pub params: ArcParams,
    pub birth_ms: f64,
    pub lifetime_ms: f64,
}

impl Arc {
    #[inline]
    pub fn ratio(&self, now_ms: f64) -> f32 {
        ((now_ms - self.birth_ms) / self.lifetime_ms.max(1.0)) as f32
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ArcVertex {
    pub position: [f32; 3],
    /// Position along the path in `[0, 1]`.
    pub along: f32,
    pub color: [f32; 4],
    /// `[lifetime_ratio, field_intensity, trail_length, time]`
    pub params: [f32; 4],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub spawned: u64,
    pub evicted: u64,
    pub expired: u64,
}

pub struct EffectPool {
    config: PoolConfig,
    arcs: VecDeque<Arc>,
    edges: EdgeGraph,
    rng: SeededRandom,
    next_id: u64,
    field_intensity: f32,
    vertices: Vec<ArcVertex>,
    stats: PoolStats,
}

impl EffectPool {
    pub fn new(mut config: PoolConfig, edges: &[Edge], rng: SeededRandom) -> Self {
        config.capacity = config.capacity.max(1);
        Self {
            arcs: VecDeque::with_capacity(config.capacity),
            config,
            edges: EdgeGraph::new(edges),
            rng,
            next_id: 0,
            field_intensity: 1.0,
            vertices: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.iter()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Line-list vertices for every live arc, refreshed by `update`.
    pub fn vertices(&self) -> &[ArcVertex] {
        &self.vertices
    }

    /// Worst-case vertex count, for sizing GPU buffers.
    pub fn max_vertices(&self) -> usize {
        let per_arc = match self.config.kind {
            ArcKind::Ambient => (AMBIENT_HOPS.1 * PATH_SUBDIVISIONS + 1) * 2,
            ArcKind::Reactive => REACTIVE_SAMPLES * 2,
        };
        self.config.capacity * per_arc
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.config.capacity = capacity.max(1);
        while self.arcs.len() > self.config.capacity {
            self.evict_oldest();
        }
    }

    pub fn set_trails(&mut self, on: bool) {
        self.config.trails = on;
    }

    pub fn set_field_intensity(&mut self, intensity: f32) {
        self.field_intensity = intensity;
    }

    /// Replace the cached edges. Live arcs keep their own copied paths.
    pub fn refresh_edges(&mut self, edges: &[Edge]) {
        self.edges = EdgeGraph::new(edges);
        log::debug!(
            "[fx] {:?} pool edge cache refreshed ({} edges)",
            self.config.kind,
            self.edges.len()
        );
    }

    /// Spawn an arc that walks the cached wireframe. Silent no-op (`None`)
    /// when the edge cache is empty.
    pub fn spawn_along_edges(&mut self, now_ms: f64) -> Option<u64> {
        if self.edges.is_empty() {
            return None;
        }
        let hops = self.rng.range_usize(AMBIENT_HOPS.0, AMBIENT_HOPS.1);
        let walk = self.edges.random_walk(hops, &mut self.rng);
        if walk.len() < 2 {
            return None;
        }
        let path = smooth(&walk);
        Some(self.insert(path, now_ms))
    }

    /// Spawn an arc bowing from `a` to `b`.
    pub fn spawn_between(&mut self, a: Vec3, b: Vec3, now_ms: f64) -> u64 {
        let bow = REACTIVE_BOW * self.rng.sign();
        let path = bowed(a, b, bow, REACTIVE_SAMPLES);
        self.insert(path, now_ms)
    }

    fn insert(&mut self, path: Vec<Vec3>, now_ms: f64) -> u64 {
        while self.arcs.len() >= self.config.capacity {
            self.evict_oldest();
        }
        let id = self.next_id;
        self.next_id += 1;
        let lifetime_ms = self
            .rng
            .range_f64(self.config.lifetime_ms.0, self.config.lifetime_ms.1);
        self.arcs.push_back(Arc {
            id,
            path,
            params: ArcParams {
                time: 0.0,
                lifetime_ratio: 0.0,
                field_intensity: self.field_intensity,
                trail_length: if self.config.trails { TRAIL_LENGTH } else { 0.0 },
                color: self.config.color,
            },
            birth_ms: now_ms,
            lifetime_ms,
        });
        self.stats.spawned += 1;
        id
    }

    fn evict_oldest(&mut self) {
        if let Some(arc) = self.arcs.pop_front() {
            self.stats.evicted += 1;
            log::trace!("[fx] evicted arc {} ({:?})", arc.id, self.config.kind);
        }
    }

    /// Advance shader time, expire arcs whose lifetime has elapsed, and
    /// rebuild the vertex data for the survivors.
    pub fn update(&mut self, now_ms: f64, dt_sec: f32) {
        let before = self.arcs.len();
        self.arcs.retain(|arc| arc.ratio(now_ms) < 1.0);
        self.stats.expired += (before - self.arcs.len()) as u64;

        let trail = if self.config.trails { TRAIL_LENGTH } else { 0.0 };
        for arc in &mut self.arcs {
            arc.params.time += dt_sec;
            arc.params.lifetime_ratio = arc.ratio(now_ms).max(0.0);
            arc.params.field_intensity = self.field_intensity;
            arc.params.trail_length = trail;
        }
        self.rebuild_vertices();
    }

    fn rebuild_vertices(&mut self) {
        self.vertices.clear();
        for arc in &self.arcs {
            let n = arc.path.len();
            if n < 2 {
                continue;
            }
            let p = &arc.params;
            let color = [p.color[0], p.color[1], p.color[2], 1.0];
            let params = [p.lifetime_ratio, p.field_intensity, p.trail_length, p.time];
            let along = |i: usize| i as f32 / (n - 1) as f32;
            for i in 0..n - 1 {
                for j in [i, i + 1] {
                    self.vertices.push(ArcVertex {
                        position: arc.path[j].to_array(),
                        along: along(j),
                        color,
                        params,
                    });
                }
            }
        }
    }

    /// Free every arc immediately.
    pub fn clear(&mut self) {
        self.arcs.clear();
        self.vertices.clear();
    }

    pub fn dispose(&mut self) {
        self.clear();
        self.edges = EdgeGraph::default();
    }
}
