//! Backend service status, for the web UI and for API-key clients.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::container::StrategyKind;
use crate::handlers::{ApiHandler, AppServices};
use crate::http::request::RequestContext;
use crate::lifecycle::{LifecycleOrchestrator, LifecyclePhase};
use crate::security::AuthRequirement;

#[derive(Debug, Serialize)]
pub struct ServiceStatusBody {
    pub service: String,
    pub phase: LifecyclePhase,
    pub strategy: Option<StrategyKind>,
    pub dockerized: bool,
}

fn report(orchestrator: &LifecycleOrchestrator, dockerized: bool) -> Response {
    let snapshot = orchestrator.snapshot();
    Json(ServiceStatusBody {
        service: orchestrator.spec().name.clone(),
        phase: snapshot.phase,
        strategy: snapshot.strategy,
        dockerized,
    })
    .into_response()
}

/// Password + CSRF; used by the browser UI.
pub struct ServiceStatus {
    orchestrator: Arc<LifecycleOrchestrator>,
    dockerized: bool,
}

pub fn factory(services: &AppServices) -> Arc<dyn ApiHandler> {
    Arc::new(ServiceStatus {
        orchestrator: services.orchestrator.clone(),
        dockerized: services.dockerized,
    })
}

#[async_trait]
impl ApiHandler for ServiceStatus {
    fn methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST]
    }

    async fn handle(&self, _ctx: &RequestContext) -> Response {
        report(&self.orchestrator, self.dockerized)
    }
}

/// API key only; same payload for headless clients.
pub struct ApiServiceStatus {
    orchestrator: Arc<LifecycleOrchestrator>,
    dockerized: bool,
}

pub fn api_factory(services: &AppServices) -> Arc<dyn ApiHandler> {
    Arc::new(ApiServiceStatus {
        orchestrator: services.orchestrator.clone(),
        dockerized: services.dockerized,
    })
}

#[async_trait]
impl ApiHandler for ApiServiceStatus {
    fn requirements(&self) -> AuthRequirement {
        AuthRequirement::api_key_only()
    }

    async fn handle(&self, _ctx: &RequestContext) -> Response {
        report(&self.orchestrator, self.dockerized)
    }
}
