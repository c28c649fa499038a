use rand::prelude::*;

/// Stream identifiers mixed into the base seed.
pub mod stream {
    pub const TUNNEL_NOISE: u64 = 1;
    pub const TUNNEL_JITTER: u64 = 2;
    pub const NODE_SAMPLING: u64 = 3;
    pub const AMBIENT_FX: u64 = 4;
    pub const REACTIVE_FX: u64 = 5;
    pub const BREATH: u64 = 6;
    pub const AMBIENT_CADENCE: u64 = 7;
}

#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Derive an independent stream from a base seed.
    pub fn derive(seed: u64, stream: u64) -> Self {
        let mix = seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self::new(mix)
    }

    /// Uniform in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Uniform in `[-1, 1)`.
    #[inline]
    pub fn signed(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }

    #[inline]
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    #[inline]
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.rng.gen::<f64>()
    }

    /// Uniform integer in `[lo, hi]` (inclusive).
    #[inline]
    pub fn range_usize(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform index in `[0, len)`; 0 when `len` is 0.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.rng.gen_range(0..len)
        }
    }

    /// +1.0 or -1.0 with equal probability.
    #[inline]
    pub fn sign(&mut self) -> f32 {
        if self.rng.gen::<bool>() {
            1.0
        } else {
            -1.0
        }
    }
}

const LATTICE_SIZE: usize = 256;

/// Smooth 1D value noise over a seeded lattice, output in `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct Noise1D {
    lattice: Vec<f32>,
}

impl Noise1D {
    pub fn new(rng: &mut SeededRandom) -> Self {
        let lattice = (0..LATTICE_SIZE).map(|_| rng.signed()).collect();
        Self { lattice }
    }

    pub fn sample(&self, x: f32) -> f32 {
        let floor = x.floor();
        let frac = x - floor;
        let i0 = (floor as i64).rem_euclid(LATTICE_SIZE as i64) as usize;
        let i1 = (i0 + 1) % LATTICE_SIZE;
        // smoothstep keeps the derivative continuous across lattice points
        let t = frac * frac * (3.0 - 2.0 * frac);
        self.lattice[i0] + (self.lattice[i1] - self.lattice[i0]) * t
    }
}
