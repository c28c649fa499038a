// Shared tuning constants for the tunnel engine.

// Tunnel defaults
pub const DEFAULT_RINGS: u32 = 80;
pub const DEFAULT_SEGMENTS: u32 = 32;
pub const DEFAULT_RADIUS: f32 = 6.0;
pub const DEFAULT_DEPTH: f32 = 40.0;
pub const DEFAULT_BASE_TWIST: f32 = 0.9; // radians at the far end
pub const DEFAULT_NOISE_AMPLITUDE: f32 = 0.35;
pub const DEFAULT_SEED: u64 = 42;

// Tunnel shape
pub const RADIUS_FALLOFF_EXPONENT: f32 = 1.2; // super-linear shrink toward the vanishing point
pub const NOISE_RING_FREQUENCY: f32 = 0.37;
pub const NOISE_SEGMENT_FREQUENCY: f32 = 0.61;
pub const RADIUS_JITTER: f32 = 0.04; // fraction of ring radius
pub const Z_JITTER: f32 = 0.15; // fraction of ring spacing

// Nodes
pub const DEFAULT_NODE_COUNT: usize = 48;
pub const NODE_INSET: f32 = 0.92; // pulls sampled nodes slightly off the wall
pub const NODE_BASE_SCALE: f32 = 0.35;
pub const NODE_PICK_RADIUS: f32 = 0.45; // ray-sphere radius for picking
pub const PULSE_DECAY_PER_SEC: f32 = 18.0; // ~170ms to fall below 5%
pub const PULSE_SCALE_LINK: f32 = 1.5;
pub const PULSE_SCALE_DISCOVER: f32 = 1.3;
pub const PULSE_SCALE_HOVER: f32 = 1.15;
pub const LOCKED_COLOR: [f32; 3] = [0.32, 0.34, 0.42];
pub const DISCOVERED_DIM: f32 = 0.6;
pub const LINKED_BRIGHTEN: f32 = 1.35;
pub const HOVER_BRIGHTEN: f32 = 1.4;

// Link protocol
pub const LINK_COOLDOWN_MS: f64 = 500.0;
pub const MAX_LINK_DISTANCE_FRACTION: f32 = 0.12; // of tunnel depth
pub const BASE_LINK_INTENSITY: f32 = 1.0;
pub const SHARED_THEME_INTENSITY: f32 = 1.5;
pub const LINKS_PER_MILESTONE: u32 = 5;

// Effect pools
pub const AMBIENT_MAX_ARCS: usize = 24;
pub const REACTIVE_MAX_ARCS: usize = 12;
pub const AMBIENT_LIFETIME_MS: (f64, f64) = (1800.0, 3200.0);
pub const REACTIVE_LIFETIME_MS: (f64, f64) = (900.0, 1300.0);
pub const AMBIENT_BASE_RATE: f32 = 1.6; // arcs per second
pub const AMBIENT_JITTER: (f32, f32) = (0.8, 1.2);
pub const AMBIENT_HOPS: (usize, usize) = (6, 12);
pub const PATH_SUBDIVISIONS: usize = 4; // curve samples per hop
pub const REACTIVE_SAMPLES: usize = 24;
pub const REACTIVE_BOW: f32 = 0.18; // perpendicular offset, fraction of span
pub const TRAIL_LENGTH: f32 = 0.35; // fraction of the path lit behind the head
pub const LINK_RATE_BOOST: f32 = 3.0; // extra arcs per second after a link
pub const LINK_RATE_BOOST_MS: f64 = 1500.0;
pub const BOOST_DECAY_MS: f64 = 800.0; // linear fall-off after a boost window

// Breath
pub const BREATH_INTERVAL_MS: (f64, f64) = (10_000.0, 15_000.0);
pub const BREATH_DURATION_MS: f64 = 2_000.0;
pub const BREATH_PEAK: f32 = 0.15; // intensity 1.0 -> 1.15 -> 1.0
pub const BREATH_TWIST_MAX: f32 = 0.06; // radians
pub const BREATH_SCALE_RESPONSE: f32 = 0.25; // root scale per unit of intensity
pub const BREATH_BOOST_CAP: f32 = 0.5;
pub const LINK_BREATH_BOOST: f32 = 0.12;
pub const LINK_BREATH_BOOST_MS: f64 = 1200.0;

// Orchestration
pub const HOVER_THROTTLE_MS: f64 = 1000.0 / 30.0;
pub const CLICK_SLOP_PX: f32 = 6.0;
pub const REBUILD_WINDOW_MS: f64 = 2_000.0;
pub const TWIST_STEP: f32 = 0.15;
pub const TWIST_CAP: f32 = 2.4;
pub const RING_STEP: u32 = 6;
pub const MAX_FRAME_DT_MS: f64 = 100.0; // clamp after tab switches

// Quality
pub const QUALITY_WINDOW: usize = 90; // frames
pub const QUALITY_DEGRADE_MS: f32 = 22.0;
pub const QUALITY_RECOVER_MS: f32 = 14.0;

// Camera
pub const CAMERA_FOVY: f32 = std::f32::consts::FRAC_PI_3;
pub const CAMERA_ZNEAR: f32 = 0.1;
pub const CAMERA_ZFAR: f32 = 200.0;
pub const CAMERA_DISTANCE: f32 = 26.0; // from the orbit target
pub const ORBIT_DAMPING_PER_SEC: f32 = 6.0;
pub const ORBIT_DRAG_SENSITIVITY: f32 = 0.005; // radians per pixel
pub const ORBIT_PITCH_LIMIT: f32 = 0.45;
pub const ORBIT_YAW_LIMIT: f32 = 0.6;
pub const AUTO_ORBIT_RAD_PER_SEC: f32 = 0.04;
