//! CSRF token issuance.
//!
//! Creates (or reuses) the caller's server-side session and returns its
//! token; the session id travels back in an `HttpOnly` cookie.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::handlers::{ApiHandler, AppServices};
use crate::http::request::RequestContext;
use crate::security::{AuthRequirement, SessionStore};

pub struct CsrfToken {
    sessions: SessionStore,
    cookie_name: String,
}

pub fn factory(services: &AppServices) -> Arc<dyn ApiHandler> {
    Arc::new(CsrfToken {
        sessions: services.security.sessions.clone(),
        cookie_name: services.security.cookie_name.clone(),
    })
}

#[async_trait]
impl ApiHandler for CsrfToken {
    fn methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    fn requirements(&self) -> AuthRequirement {
        AuthRequirement::default().without_csrf()
    }

    async fn handle(&self, ctx: &RequestContext) -> Response {
        let (session_id, token) = self.sessions.get_or_create(ctx.cookie(&self.cookie_name));
        let mut response = Json(json!({ "ok": true, "token": token })).into_response();

        let cookie = format!("{}={session_id}; Path=/; HttpOnly; SameSite=Strict", self.cookie_name);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Invalid session cookie"),
        }
        response
    }
}
