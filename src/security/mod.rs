//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin admission, first stage)
//!     → headers.rs (hardening headers on the way out)
//!     → rate_limit.rs (per-client window, last stage)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Cheap checks run before expensive ones
//! - Rejection bodies never echo client input

pub mod cors;
pub mod headers;
pub mod rate_limit;
