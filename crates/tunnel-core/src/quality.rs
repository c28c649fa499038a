//! Frame-time sampling for adaptive quality.

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Coarse hardware class supplied by the host. Caps geometry growth and
/// effect budgets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    LowEnd,
}

impl DeviceClass {
    pub fn max_rings(self) -> u32 {
        match self {
            DeviceClass::Desktop => 140,
            DeviceClass::Mobile => 110,
            DeviceClass::LowEnd => 96,
        }
    }

    pub fn ambient_capacity(self) -> usize {
        match self {
            DeviceClass::Desktop => AMBIENT_MAX_ARCS,
            DeviceClass::Mobile => AMBIENT_MAX_ARCS * 2 / 3,
            DeviceClass::LowEnd => AMBIENT_MAX_ARCS / 2,
        }
    }

    pub fn reactive_capacity(self) -> usize {
        match self {
            DeviceClass::Desktop => REACTIVE_MAX_ARCS,
            DeviceClass::Mobile | DeviceClass::LowEnd => REACTIVE_MAX_ARCS / 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Multiplier on the ambient spawn rate.
    pub fn ambient_rate_scale(self) -> f32 {
        match self {
            QualityTier::High => 1.0,
            QualityTier::Medium => 0.6,
            QualityTier::Low => 0.3,
        }
    }

    fn lower(self) -> Self {
        match self {
            QualityTier::High => QualityTier::Medium,
            _ => QualityTier::Low,
        }
    }

    fn higher(self) -> Self {
        match self {
            QualityTier::Low => QualityTier::Medium,
            _ => QualityTier::High,
        }
    }
}

/// Rolling window of frame times. Steps the tier down when the window average
/// exceeds the degrade threshold and up when it drops below the recover
/// threshold; the window is cleared after each change so decisions are at
/// least one full window apart.
#[derive(Clone, Debug)]
pub struct QualityMonitor {
    samples: VecDeque<f32>,
    sum: f32,
    window: usize,
    tier: QualityTier,
}

impl QualityMonitor {
    pub fn new(window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window),
            sum: 0.0,
            window: window.max(1),
            tier: QualityTier::High,
        }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn average_ms(&self) -> Option<f32> {
        (!self.samples.is_empty()).then(|| self.sum / self.samples.len() as f32)
    }

    /// Record one frame time; returns the new tier when it changed.
    pub fn tick(&mut self, frame_ms: f32) -> Option<QualityTier> {
        if !frame_ms.is_finite() || frame_ms < 0.0 {
            return None;
        }
        self.samples.push_back(frame_ms);
        self.sum += frame_ms;
        if self.samples.len() > self.window {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= old;
            }
        }
        if self.samples.len() < self.window {
            return None;
        }
        let avg = self.sum / self.samples.len() as f32;
        let next = if avg > QUALITY_DEGRADE_MS {
            self.tier.lower()
        } else if avg < QUALITY_RECOVER_MS {
            self.tier.higher()
        } else {
            self.tier
        };
        if next == self.tier {
            return None;
        }
        log::info!(
            "[quality] avg frame {:.1}ms, tier {:?} -> {:?}",
            avg,
            self.tier,
            next
        );
        self.tier = next;
        self.samples.clear();
        self.sum = 0.0;
        Some(next)
    }
}

impl Default for QualityMonitor {
    fn default() -> Self {
        Self::new(QUALITY_WINDOW)
    }
}
