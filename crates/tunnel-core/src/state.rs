use crate::constants::*;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Simple right-handed camera description with perspective projection.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    /// Compute the clip-space projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }
    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    /// Express this ray in the space whose local-to-world matrix is `model`.
    pub fn to_local(&self, model: &Mat4) -> Ray {
        let inv = model.inverse();
        Ray::new(
            inv.transform_point3(self.origin),
            inv.transform_vector3(self.dir),
        )
    }
}

/// Canvas size in backing-store pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Compute a world-space ray from pixel coordinates.
pub fn screen_to_world_ray(camera: &Camera, viewport: Viewport, sx: f32, sy: f32) -> Ray {
    let width = viewport.width.max(1) as f32;
    let height = viewport.height.max(1) as f32;
    let ndc_x = (2.0 * sx / width) - 1.0;
    let ndc_y = 1.0 - (2.0 * sy / height);
    let inv = camera.view_projection().inverse();
    let p_far = inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
    let p1: Vec3 = p_far.truncate() / p_far.w;
    Ray::new(camera.eye, p1 - camera.eye)
}

/// Project a world-space point to pixel coordinates. `None` when the point is
/// behind the camera.
pub fn project_to_screen(camera: &Camera, viewport: Viewport, world: Vec3) -> Option<Vec2> {
    let clip = camera.view_projection() * world.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(
        (ndc.x + 1.0) * 0.5 * viewport.width as f32,
        (1.0 - ndc.y) * 0.5 * viewport.height as f32,
    ))
}

/// Damped orbit around a point on the tunnel axis. Dragging sets a target
/// yaw/pitch; `update` eases toward it. Auto-orbit adds a slow sway.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub distance: f32,
    yaw: f32,
    pitch: f32,
    target_yaw: f32,
    target_pitch: f32,
    auto_phase: f32,
    auto_orbit: bool,
}

impl OrbitControls {
    pub fn new(target: Vec3, auto_orbit: bool) -> Self {
        Self {
            target,
            distance: CAMERA_DISTANCE,
            yaw: 0.0,
            pitch: 0.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            auto_phase: 0.0,
            auto_orbit,
        }
    }

    pub fn drag(&mut self, dx_px: f32, dy_px: f32) {
        self.target_yaw = (self.target_yaw - dx_px * ORBIT_DRAG_SENSITIVITY)
            .clamp(-ORBIT_YAW_LIMIT, ORBIT_YAW_LIMIT);
        self.target_pitch = (self.target_pitch + dy_px * ORBIT_DRAG_SENSITIVITY)
            .clamp(-ORBIT_PITCH_LIMIT, ORBIT_PITCH_LIMIT);
    }

    pub fn set_auto_orbit(&mut self, on: bool) {
        self.auto_orbit = on;
    }

    pub fn update(&mut self, dt_sec: f32) {
        if self.auto_orbit {
            self.auto_phase += dt_sec * AUTO_ORBIT_RAD_PER_SEC;
        }
        let alpha = 1.0 - (-dt_sec * ORBIT_DAMPING_PER_SEC).exp();
        self.yaw += (self.target_yaw - self.yaw) * alpha;
        self.pitch += (self.target_pitch - self.pitch) * alpha;
    }

    pub fn yaw(&self) -> f32 {
        self.yaw + if self.auto_orbit { self.auto_phase.sin() * 0.1 } else { 0.0 }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Camera sits in front of the entrance (negative Z) looking down the tunnel.
    pub fn camera(&self, viewport: Viewport) -> Camera {
        let yaw = self.yaw();
        let offset = Vec3::new(
            yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -yaw.cos() * self.pitch.cos(),
        ) * self.distance;
        Camera {
            eye: self.target + offset,
            target: self.target,
            up: Vec3::Y,
            aspect: viewport.aspect(),
            fovy_radians: CAMERA_FOVY,
            znear: CAMERA_ZNEAR,
            zfar: CAMERA_ZFAR,
        }
    }
}
