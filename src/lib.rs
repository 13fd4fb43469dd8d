//! Sandbox gateway library.
//!
//! Serves a local web UI and API, brings a sandboxed execution container up
//! before serving, and tears it down on exit. Every API route passes an
//! ordered authorization pipeline first.

// Core subsystems
pub mod config;
pub mod container;
pub mod http;
pub mod lifecycle;

// Request handling
pub mod handlers;
pub mod security;

// Cross-cutting concerns
pub mod observability;

pub mod app;

pub use app::Gateway;
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{LifecycleOrchestrator, Shutdown};
