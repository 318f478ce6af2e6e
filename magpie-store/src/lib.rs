//! Magpie Store - durable "last seen" timestamps across restarts
//!
//! Persists a single timestamp or a map of keyed timestamps to two
//! redundant JSON files (primary + backup). Loading prefers the primary,
//! falls back to the backup, and falls back to a default when both are
//! missing or malformed. It never fails past that boundary.

pub mod disk;
pub mod last_seen;
pub mod seen_map;

pub use disk::*;
pub use last_seen::*;
pub use seen_map::*;

use thiserror::Error;

/// Errors from persisting store state. Loading never errors; it falls back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
