//! Request handlers.
//!
//! # Data Flow
//! ```text
//! registry.rs: (route name → factory) table
//!     → factories build handlers from AppServices
//!     → http/server.rs mounts each at /<route name> with its own
//!       AuthorizationPipeline
//! ```
//!
//! A handler declares its methods and its `AuthRequirement`; both default
//! to the strict setting (POST, password + CSRF).

pub mod csrf;
pub mod health;
pub mod registry;
pub mod status;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{http::Method, response::Response};

use crate::http::request::RequestContext;
use crate::lifecycle::LifecycleOrchestrator;
use crate::security::{AuthRequirement, SecurityState};

pub use registry::{HandlerRegistration, HandlerRegistry, RegistryError, BUILTIN_HANDLERS};

#[async_trait]
pub trait ApiHandler: Send + Sync {
    fn methods(&self) -> Vec<Method> {
        vec![Method::POST]
    }

    fn requirements(&self) -> AuthRequirement {
        AuthRequirement::default()
    }

    async fn handle(&self, ctx: &RequestContext) -> Response;
}

/// What handler factories may depend on.
#[derive(Clone)]
pub struct AppServices {
    pub orchestrator: Arc<LifecycleOrchestrator>,
    pub security: SecurityState,
    pub dockerized: bool,
}

pub type HandlerFactory = fn(&AppServices) -> Arc<dyn ApiHandler>;
