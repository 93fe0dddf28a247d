//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request (method, path)
//!     → router.rs (versioned route table)
//!     → liveness.rs (GET /api/v1/)
//!     → or NotFound fallback
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - Unknown methods on known paths are NotFound, not 405

pub mod liveness;
pub mod router;

pub use router::{routes, API_V1};
