use crate::boost::Boost;
use crate::constants::*;
use crate::random::SeededRandom;

/// Jittered spawn gate for the ambient pool.
///
/// `effective_rate = base_rate + boost(t)`, and a spawn fires once the time
/// since the previous one exceeds `1000 / effective_rate` scaled by a factor
/// drawn from `U(0.8, 1.2)` after every spawn, so arcs never fall into a
/// visible rhythm.
#[derive(Clone, Debug)]
pub struct AmbientCadence {
    base_rate: f32,
    rate_scale: f32,
    boost: Boost,
    last_spawn_ms: Option<f64>,
    jitter: f32,
    rng: SeededRandom,
}

impl AmbientCadence {
    pub fn new(base_rate: f32, reduced_motion: bool, mut rng: SeededRandom) -> Self {
        let jitter = rng.range(AMBIENT_JITTER.0, AMBIENT_JITTER.1);
        Self {
            base_rate,
            rate_scale: if reduced_motion { 0.5 } else { 1.0 },
            boost: Boost::new(LINK_RATE_BOOST * 2.0),
            last_spawn_ms: None,
            jitter,
            rng,
        }
    }

    pub fn set_reduced_motion(&mut self, on: bool) {
        self.rate_scale = if on { 0.5 } else { 1.0 };
    }

    /// Quality tiers scale the rate on top of reduced motion.
    pub fn set_base_rate(&mut self, base_rate: f32) {
        self.base_rate = base_rate.max(0.0);
    }

    pub fn boost_rate(&mut self, amount: f32, duration_ms: f64, now_ms: f64) {
        self.boost.trigger(amount, duration_ms, now_ms);
    }

    pub fn current_boost(&self, now_ms: f64) -> f32 {
        self.boost.value(now_ms)
    }

    pub fn effective_rate(&self, now_ms: f64) -> f32 {
        (self.base_rate + self.boost.value(now_ms)) * self.rate_scale
    }

    /// True when an ambient arc should spawn at `now_ms`.
    pub fn should_spawn(&mut self, now_ms: f64) -> bool {
        let rate = self.effective_rate(now_ms);
        if rate <= 0.0 {
            return false;
        }
        let Some(last) = self.last_spawn_ms else {
            self.last_spawn_ms = Some(now_ms);
            return false;
        };
        let expected = 1000.0 / rate as f64;
        if now_ms - last > expected * self.jitter as f64 {
            self.last_spawn_ms = Some(now_ms);
            self.jitter = self.rng.range(AMBIENT_JITTER.0, AMBIENT_JITTER.1);
            return true;
        }
        false
    }
}
