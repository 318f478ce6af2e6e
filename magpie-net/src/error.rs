//! Errors from the anonymizing request engine.
//!
//! Network and circuit failures never show up here; those are retried
//! internally. What remains is construction failure, bad request bodies,
//! and the explicit abort when a deadline expires.

use thiserror::Error;

/// Errors surfaced by [`AnonEngine`] and [`CircuitController`].
///
/// [`AnonEngine`]: crate::AnonEngine
/// [`CircuitController`]: crate::CircuitController
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("controller rejected authentication: {0}")]
    AuthRejected(String),

    #[error("control channel: {0}")]
    Control(String),

    #[error("control connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build proxied client: {0}")]
    ClientBuild(String),

    #[error("request body could not be serialized: {0}")]
    Body(#[from] serde_json::Error),

    #[error("gave up waiting for a working circuit")]
    Aborted,
}
