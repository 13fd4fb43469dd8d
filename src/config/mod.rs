//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! .env
//!     → env.rs (credentials, host/port overrides)
//!     → re-read on SIGHUP
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Secrets live in the env file, never in the TOML file

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{resolve_bind, EnvSettings};
pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    GatewayConfig, ObservabilityConfig, ProgressConfig, ServerConfig, ServiceConfig,
    ServiceTimeouts, SessionConfig, ToolConfig, WebUiConfig,
};
