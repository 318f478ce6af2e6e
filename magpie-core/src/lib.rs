//! Magpie Core - small helpers shared by collection scripts
//!
//! Foundational utilities:
//! - JSON-safe value cleaning with a stringify fallback
//! - Windows-compatible filename slugging
//! - Explicit logger configuration (no ambient global state)

pub mod logging;
pub mod slug;
pub mod value;

pub use logging::*;
pub use slug::*;
pub use value::*;
