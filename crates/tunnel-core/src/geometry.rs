//! Procedural tunnel mesh.
//!
//! The tunnel runs along +Z from the entrance (`z = 0`) to a vanishing point
//! (`z = depth`). Rings shrink super-linearly and twist progressively, so the
//! torsion ramps from zero at the entrance to `base_twist` at the far end.
//! Alongside the triangle mesh the builder emits a deduplicated undirected
//! edge list in world space, which effect pools walk without any knowledge of
//! the mesh topology.

use crate::constants::*;
use crate::error::ConfigValidationError;
use crate::random::{stream, Noise1D, SeededRandom};
use fnv::FnvHashSet;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TunnelConfig {
    pub rings: u32,
    pub segments: u32,
    pub radius: f32,
    pub depth: f32,
    pub base_twist: f32,
    pub noise_amplitude: f32,
    pub seed: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            rings: DEFAULT_RINGS,
            segments: DEFAULT_SEGMENTS,
            radius: DEFAULT_RADIUS,
            depth: DEFAULT_DEPTH,
            base_twist: DEFAULT_BASE_TWIST,
            noise_amplitude: DEFAULT_NOISE_AMPLITUDE,
            seed: DEFAULT_SEED,
        }
    }
}

impl TunnelConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.rings < 1 {
            return Err(ConfigValidationError::TooFewRings(self.rings));
        }
        if self.segments < 3 {
            return Err(ConfigValidationError::TooFewSegments(self.segments));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigValidationError::InvalidRadius(self.radius));
        }
        if !(self.depth.is_finite() && self.depth > 0.0) {
            return Err(ConfigValidationError::InvalidDepth(self.depth));
        }
        Ok(())
    }

    /// Maximum Euclidean distance between two linkable nodes.
    #[inline]
    pub fn max_link_distance(&self) -> f32 {
        self.depth * MAX_LINK_DISTANCE_FRACTION
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        (self.rings as usize + 1) * (self.segments as usize + 1)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TunnelVertex {
    pub position: [f32; 3],
    /// Normalised depth `r / rings`, used by the shader for fog.
    pub depth_t: f32,
}

/// One undirected mesh edge, stored once per unordered vertex pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: Vec3,
    pub to: Vec3,
    /// Canonical `(min, max)` vertex indices.
    pub indices: [u32; 2],
}

impl Edge {
    #[inline]
    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }
}

#[derive(Clone, Debug)]
pub struct TunnelMesh {
    pub config: TunnelConfig,
    pub vertices: Vec<TunnelVertex>,
    pub indices: Vec<u32>,
    pub edges: Vec<Edge>,
}

impl TunnelMesh {
    #[inline]
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.vertices.get(index).map(|v| Vec3::from(v.position))
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Edges flattened into a GPU line list (two vertices per edge).
    pub fn line_vertices(&self) -> Vec<TunnelVertex> {
        let mut out = Vec::with_capacity(self.edges.len() * 2);
        for e in &self.edges {
            out.push(self.vertices[e.indices[0] as usize]);
            out.push(self.vertices[e.indices[1] as usize]);
        }
        out
    }
}

/// Build the tunnel mesh for `config`. Identical configs (seed included)
/// always produce identical vertex and edge data.
pub fn build_tunnel(config: &TunnelConfig) -> Result<TunnelMesh, ConfigValidationError> {
    config.validate()?;

    let rings = config.rings as usize;
    let segments = config.segments as usize;
    let stride = segments + 1;
    let ring_spacing = config.depth / config.rings as f32;
    let segment_arc = TAU / config.segments as f32;

    let noise = Noise1D::new(&mut SeededRandom::derive(config.seed, stream::TUNNEL_NOISE));
    let mut jitter_rng = SeededRandom::derive(config.seed, stream::TUNNEL_JITTER);

    let mut vertices = Vec::with_capacity(config.vertex_count());
    let mut ring_jitter: Vec<(f32, f32)> = Vec::with_capacity(segments);
    for r in 0..=rings {
        let t = r as f32 / config.rings as f32;
        let twist = config.base_twist * t;
        let ring_radius = config.radius * (1.0 - t).powf(RADIUS_FALLOFF_EXPONENT);
        let z = t * config.depth;

        // The seam vertex reuses segment 0's perturbation so the ring closes.
        ring_jitter.clear();
        for _ in 0..segments {
            ring_jitter.push((jitter_rng.signed(), jitter_rng.signed()));
        }

        for s in 0..=segments {
            let ss = s % segments;
            let n = noise.sample(
                r as f32 * NOISE_RING_FREQUENCY + ss as f32 * NOISE_SEGMENT_FREQUENCY,
            );
            let angle = s as f32 * segment_arc + twist + n * config.noise_amplitude * segment_arc;
            let (jr, jz) = ring_jitter[ss];
            let rad = ring_radius * (1.0 + jr * RADIUS_JITTER);
            let vz = z + jz * Z_JITTER * ring_spacing;
            vertices.push(TunnelVertex {
                position: [rad * angle.cos(), rad * angle.sin(), vz],
                depth_t: t,
            });
        }
    }

    let mut indices = Vec::with_capacity(rings * segments * 6);
    for r in 0..rings {
        for s in 0..segments {
            let a = (r * stride + s) as u32;
            let b = a + 1;
            let c = a + stride as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    let edges = collect_edges(&vertices, &indices);
    log::debug!(
        "[tunnel] built rings={} segments={} vertices={} triangles={} edges={}",
        config.rings,
        config.segments,
        vertices.len(),
        indices.len() / 3,
        edges.len()
    );

    Ok(TunnelMesh {
        config: config.clone(),
        vertices,
        indices,
        edges,
    })
}

/// Every triangle edge, deduplicated by canonical `(min, max)` index pair,
/// in first-seen order.
fn collect_edges(vertices: &[TunnelVertex], indices: &[u32]) -> Vec<Edge> {
    let mut seen: FnvHashSet<(u32, u32)> = FnvHashSet::default();
    let mut edges = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        for (i, j) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (i.min(j), i.max(j));
            if seen.insert(key) {
                edges.push(Edge {
                    from: Vec3::from(vertices[key.0 as usize].position),
                    to: Vec3::from(vertices[key.1 as usize].position),
                    indices: [key.0, key.1],
                });
            }
        }
    }
    edges
}
