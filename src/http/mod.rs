//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → pipeline.rs (fixed admission stages)
//!         → body.rs (JSON and URL-encoded parsing)
//!     → routing (versioned routes)
//!     → Send to client
//! ```

pub mod body;
pub mod pipeline;
pub mod request;
pub mod server;

pub use body::ParsedBody;
pub use pipeline::{PipelineState, Stage};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
