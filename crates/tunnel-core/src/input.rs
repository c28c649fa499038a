use crate::constants::{CLICK_SLOP_PX, HOVER_THROTTLE_MS};
use glam::{Vec2, Vec3};

/// Nearest non-negative ray parameter where the ray enters the sphere.
#[inline]
pub fn ray_sphere(ray_origin: Vec3, ray_dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray_origin - center;
    let b = oc.dot(ray_dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

/// Rate limiter for pointer-driven work, independent of display refresh.
#[derive(Clone, Debug)]
pub struct Throttle {
    interval_ms: f64,
    last_ms: Option<f64>,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// True at most once per interval; records `now_ms` when it fires.
    pub fn ready(&mut self, now_ms: f64) -> bool {
        match self.last_ms {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(HOVER_THROTTLE_MS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerRelease {
    Click,
    Drag,
}

/// Tracks one press and classifies its release as click or drag by the
/// largest displacement seen while the pointer was down.
#[derive(Clone, Debug)]
pub struct PointerTracker {
    slop_px: f32,
    down_at: Option<Vec2>,
    last: Vec2,
    max_displacement: f32,
}

impl PointerTracker {
    pub fn new(slop_px: f32) -> Self {
        Self {
            slop_px,
            down_at: None,
            last: Vec2::ZERO,
            max_displacement: 0.0,
        }
    }

    pub fn press(&mut self, pos: Vec2) {
        self.down_at = Some(pos);
        self.last = pos;
        self.max_displacement = 0.0;
    }

    /// Returns the delta since the previous move while pressed.
    pub fn moved(&mut self, pos: Vec2) -> Option<Vec2> {
        let origin = self.down_at?;
        self.max_displacement = self.max_displacement.max(origin.distance(pos));
        let delta = pos - self.last;
        self.last = pos;
        Some(delta)
    }

    pub fn is_pressed(&self) -> bool {
        self.down_at.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.down_at.is_some() && self.max_displacement > self.slop_px
    }

    /// `None` when there was no matching press.
    pub fn release(&mut self, pos: Vec2) -> Option<PointerRelease> {
        let origin = self.down_at.take()?;
        let displacement = self.max_displacement.max(origin.distance(pos));
        Some(if displacement > self.slop_px {
            PointerRelease::Drag
        } else {
            PointerRelease::Click
        })
    }

    pub fn cancel(&mut self) {
        self.down_at = None;
    }
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(CLICK_SLOP_PX)
    }
}
