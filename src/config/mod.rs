//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional, loaded by main)
//! defaults
//!     → config file (TOML, optional)
//!     → environment variables (PORT, APP_ENV/NODE_ENV, ALLOWED_ORIGINS, ...)
//!     → validation.rs (semantic checks, origin normalization)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
pub use schema::CorsConfig;
pub use schema::Environment;
pub use schema::RateLimitConfig;
pub use schema::SecurityConfig;
