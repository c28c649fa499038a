use crate::nodes::NodeId;
use thiserror::Error;

/// A malformed [`TunnelConfig`](crate::TunnelConfig). Fatal to the build call
/// that raised it, never to the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("rings must be at least 1 (got {0})")]
    TooFewRings(u32),
    #[error("segments must be at least 3 (got {0})")]
    TooFewSegments(u32),
    #[error("radius must be positive and finite (got {0})")]
    InvalidRadius(f32),
    #[error("depth must be positive and finite (got {0})")]
    InvalidDepth(f32),
}

/// Why a link attempt was refused. Logged, never surfaced to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkRejected {
    #[error("cooldown active ({remaining_ms:.0}ms remaining)")]
    Cooldown { remaining_ms: f64 },
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("cannot link node {0} to itself")]
    SameNode(NodeId),
    #[error("nodes are {distance:.2} apart (max {max:.2})")]
    TooFar { distance: f32, max: f32 },
}

/// Failure of the remote `upsert_link` call. Local state is kept as is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteSyncError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid tunnel config: {0}")]
    Config(#[from] ConfigValidationError),
    #[error("node count must be at least 2 (got {0})")]
    NodeCount(usize),
}
