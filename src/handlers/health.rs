use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::handlers::{ApiHandler, AppServices};
use crate::http::request::RequestContext;
use crate::security::AuthRequirement;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
}

/// Liveness probe; no checks.
pub struct Health;

pub fn factory(_: &AppServices) -> Arc<dyn ApiHandler> {
    Arc::new(Health)
}

#[async_trait]
impl ApiHandler for Health {
    fn methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    fn requirements(&self) -> AuthRequirement {
        AuthRequirement::open()
    }

    async fn handle(&self, _ctx: &RequestContext) -> Response {
        Json(HealthBody {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        })
        .into_response()
    }
}
