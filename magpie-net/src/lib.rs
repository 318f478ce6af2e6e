//! Magpie Net - anonymizing HTTP layer
//!
//! HTTP through a SOCKS proxy with automatic circuit rotation:
//! - control-port client for clean-circuit signals
//! - stubborn request engine with egress identity verification
//! - per-circuit client identity headers

pub mod controller;
pub mod engine;
pub mod error;
pub mod identity;

pub use controller::*;
pub use engine::*;
pub use error::*;
pub use identity::*;
