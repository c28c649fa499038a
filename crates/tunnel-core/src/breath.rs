//! Intermittent "breathing" of the whole tunnel: a ~2s half-sine every 10-15s.

use crate::boost::Boost;
use crate::constants::*;
use crate::random::SeededRandom;
use std::f32::consts::PI;

pub struct FieldBreathModulator {
    rng: SeededRandom,
    next_breath_ms: f64,
    breath_start_ms: Option<f64>,
    sign: f32,
    motion_scale: f32,
    boost: Boost,
    intensity: f32,
    twist_delta: f32,
    boost_value: f32,
}

impl FieldBreathModulator {
    pub fn new(now_ms: f64, reduced_motion: bool, mut rng: SeededRandom) -> Self {
        let next_breath_ms = now_ms + rng.range_f64(BREATH_INTERVAL_MS.0, BREATH_INTERVAL_MS.1);
        Self {
            rng,
            next_breath_ms,
            breath_start_ms: None,
            sign: 1.0,
            motion_scale: if reduced_motion { 0.5 } else { 1.0 },
            boost: Boost::new(BREATH_BOOST_CAP),
            intensity: 1.0,
            twist_delta: 0.0,
            boost_value: 0.0,
        }
    }

    pub fn set_reduced_motion(&mut self, on: bool) {
        self.motion_scale = if on { 0.5 } else { 1.0 };
    }

    pub fn boost_amplitude(&mut self, amount: f32, duration_ms: f64, now_ms: f64) {
        self.boost.trigger(amount, duration_ms, now_ms);
    }

    pub fn is_breathing(&self) -> bool {
        self.breath_start_ms.is_some()
    }

    pub fn next_breath_ms(&self) -> f64 {
        self.next_breath_ms
    }

    pub fn update(&mut self, now_ms: f64) {
        if self.breath_start_ms.is_none() && now_ms >= self.next_breath_ms {
            self.breath_start_ms = Some(now_ms);
            self.sign = self.rng.sign();
            log::trace!("[breath] inhale sign={}", self.sign);
        }

        let envelope = match self.breath_start_ms {
            Some(start) => {
                let progress = ((now_ms - start) / BREATH_DURATION_MS) as f32;
                if progress >= 1.0 {
                    self.breath_start_ms = None;
                    self.next_breath_ms =
                        now_ms + self.rng.range_f64(BREATH_INTERVAL_MS.0, BREATH_INTERVAL_MS.1);
                    0.0
                } else {
                    (progress.max(0.0) * PI).sin()
                }
            }
            None => 0.0,
        };

        self.intensity = 1.0 + envelope * BREATH_PEAK * self.motion_scale;
        self.twist_delta = self.sign * envelope * BREATH_TWIST_MAX * self.motion_scale;
        self.boost_value = self.boost.value(now_ms);
    }

    /// Breath intensity plus any active boost; 1.0 when idle.
    pub fn intensity(&self) -> f32 {
        self.intensity + self.boost_value
    }

    /// Boost component alone, as of the last `update`.
    pub fn boost_value(&self) -> f32 {
        self.boost_value
    }

    /// Uniform root scale derived from intensity.
    pub fn scale(&self) -> f32 {
        1.0 + (self.intensity() - 1.0) * BREATH_SCALE_RESPONSE
    }

    pub fn twist_delta(&self) -> f32 {
        self.twist_delta
    }
}
