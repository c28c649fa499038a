use crate::constants::PATH_SUBDIVISIONS;
use crate::geometry::Edge;
use crate::random::SeededRandom;
use fnv::FnvHashMap;
use glam::Vec3;
use smallvec::SmallVec;

type PointKey = [u32; 3];

#[inline]
fn key(p: Vec3) -> PointKey {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Edge list plus endpoint adjacency, owned by one pool and replaced
/// wholesale on every geometry rebuild.
#[derive(Clone, Debug, Default)]
pub struct EdgeGraph {
    edges: Vec<Edge>,
    adjacency: FnvHashMap<PointKey, SmallVec<[u32; 8]>>,
}

impl EdgeGraph {
    pub fn new(edges: &[Edge]) -> Self {
        let mut adjacency: FnvHashMap<PointKey, SmallVec<[u32; 8]>> = FnvHashMap::default();
        for (i, e) in edges.iter().enumerate() {
            adjacency.entry(key(e.from)).or_default().push(i as u32);
            adjacency.entry(key(e.to)).or_default().push(i as u32);
        }
        Self {
            edges: edges.to_vec(),
            adjacency,
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Walk up to `hops` edges from a random start, never immediately
    /// backtracking unless the walk is at a dead end. Returns the visited
    /// points (`hops + 1` at most); empty when there are no edges.
    pub fn random_walk(&self, hops: usize, rng: &mut SeededRandom) -> Vec<Vec3> {
        if self.edges.is_empty() || hops == 0 {
            return Vec::new();
        }
        // The first hop is the start edge itself, walked in a random direction.
        let start = &self.edges[rng.index(self.edges.len())];
        let (from, mut at) = if rng.sign() > 0.0 {
            (start.from, start.to)
        } else {
            (start.to, start.from)
        };
        let mut points = vec![from, at];
        let mut prev = start.indices;

        for _ in 1..hops {
            let Some(neighbours) = self.adjacency.get(&key(at)) else {
                break;
            };
            let candidates: SmallVec<[u32; 8]> = neighbours
                .iter()
                .copied()
                .filter(|&i| self.edges[i as usize].indices != prev)
                .collect();
            let pool = if candidates.is_empty() {
                neighbours
            } else {
                &candidates
            };
            let next = &self.edges[pool[rng.index(pool.len())] as usize];
            at = if key(next.from) == key(at) {
                next.to
            } else {
                next.from
            };
            points.push(at);
            prev = next.indices;
        }
        points
    }
}

/// Uniform Catmull-Rom through `points`, `PATH_SUBDIVISIONS` samples per span.
pub fn smooth(points: &[Vec3]) -> Vec<Vec3> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let n = points.len();
    let mut out = Vec::with_capacity((n - 1) * PATH_SUBDIVISIONS + 1);
    for i in 0..n - 1 {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(n - 1)];
        for s in 0..PATH_SUBDIVISIONS {
            let t = s as f32 / PATH_SUBDIVISIONS as f32;
            out.push(catmull_rom(p0, p1, p2, p3, t));
        }
    }
    out.push(points[n - 1]);
    out
}

#[inline]
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Quadratic Bezier from `a` to `b` through one control point offset
/// perpendicular to the span by `bow * |b - a|`.
pub fn bowed(a: Vec3, b: Vec3, bow: f32, samples: usize) -> Vec<Vec3> {
    let span = b - a;
    let len = span.length();
    let mid = (a + b) * 0.5;
    let perp = span.cross(Vec3::Z).try_normalize().unwrap_or_else(|| {
        span.try_normalize()
            .map(|d| d.any_orthonormal_vector())
            .unwrap_or(Vec3::Y)
    });
    let control = mid + perp * len * bow;
    let samples = samples.max(2);
    let controls: SmallVec<[Vec3; 3]> = SmallVec::from_buf([a, control, b]);
    (0..samples)
        .map(|i| {
            let t = i as f32 / (samples - 1) as f32;
            let u = 1.0 - t;
            controls[0] * (u * u) + controls[1] * (2.0 * u * t) + controls[2] * (t * t)
        })
        .collect()
}
