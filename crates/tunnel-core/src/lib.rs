pub mod boost;
pub mod breath;
pub mod constants;
pub mod debounce;
pub mod effects;
pub mod error;
pub mod events;
pub mod evolution;
pub mod geometry;
pub mod input;
pub mod link;
pub mod nodes;
pub mod orchestrator;
pub mod quality;
pub mod random;
pub mod state;
pub mod theme;

pub static TUNNEL_WGSL: &str = include_str!("../shaders/tunnel.wgsl");
pub static NODES_WGSL: &str = include_str!("../shaders/nodes.wgsl");
pub static ARCS_WGSL: &str = include_str!("../shaders/arcs.wgsl");

pub use boost::Boost;
pub use breath::FieldBreathModulator;
pub use debounce::Debouncer;
pub use effects::{AmbientCadence, Arc, ArcKind, ArcVertex, EffectPool, PoolConfig, PoolStats};
pub use error::*;
pub use events::*;
pub use evolution::TunnelEvolution;
pub use geometry::*;
pub use input::*;
pub use link::*;
pub use nodes::*;
pub use orchestrator::*;
pub use quality::*;
pub use random::SeededRandom;
pub use state::*;
pub use theme::Theme;
