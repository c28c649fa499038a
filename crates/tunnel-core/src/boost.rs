use crate::constants::BOOST_DECAY_MS;

/// Additive boost that holds its amplitude until an end timestamp, then falls
/// linearly to zero over `decay_ms`.
///
/// Triggering while a boost is active raises the amplitude to the larger of
/// the two and pushes the end timestamp out, so overlapping boosts never stack.
#[derive(Clone, Debug)]
pub struct Boost {
    amplitude: f32,
    end_ms: f64,
    decay_ms: f64,
    cap: f32,
}

impl Boost {
    pub fn new(cap: f32) -> Self {
        Self {
            amplitude: 0.0,
            end_ms: f64::NEG_INFINITY,
            decay_ms: BOOST_DECAY_MS,
            cap,
        }
    }

    pub fn with_decay(mut self, decay_ms: f64) -> Self {
        self.decay_ms = decay_ms.max(1.0);
        self
    }

    pub fn trigger(&mut self, amount: f32, duration_ms: f64, now_ms: f64) {
        let amount = amount.max(0.0);
        let current = self.value(now_ms);
        self.amplitude = current.max(amount).min(self.cap);
        self.end_ms = self.end_ms.max(now_ms + duration_ms.max(0.0));
    }

    /// Current boost, never negative.
    pub fn value(&self, now_ms: f64) -> f32 {
        if self.amplitude <= 0.0 {
            return 0.0;
        }
        if now_ms <= self.end_ms {
            return self.amplitude;
        }
        let fade = 1.0 - (now_ms - self.end_ms) / self.decay_ms;
        (self.amplitude * fade.max(0.0) as f32).max(0.0)
    }

    pub fn is_active(&self, now_ms: f64) -> bool {
        self.value(now_ms) > 0.0
    }

    /// Time at which the boost is back at its baseline of zero.
    pub fn settled_at(&self) -> f64 {
        self.end_ms + self.decay_ms
    }
}
