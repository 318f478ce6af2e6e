//! Magpie Limit - cooldown enforcement between acknowledged operations
//!
//! A naive rate limiter for working against faulty upstreams and generous
//! API quotas: it only ever blocks for the span the upstream actually
//! requires, and only when an operation was flagged as needing one.

pub mod limiter;

pub use limiter::*;
