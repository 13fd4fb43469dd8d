//! Ordered, short-circuiting composition of checks.

use std::sync::Arc;

use crate::http::request::RequestContext;
use crate::observability::metrics;
use crate::security::checks::{ApiKeyCheck, AuthCheck, CsrfCheck, LoopbackCheck, PasswordCheck};
use crate::security::credentials::CredentialStore;
use crate::security::requirement::{AuthRequirement, AuthzDecision};
use crate::security::session::SessionStore;

/// Shared state the checks read from.
#[derive(Clone)]
pub struct SecurityState {
    pub credentials: Arc<CredentialStore>,
    pub sessions: SessionStore,
    pub cookie_name: String,
}

#[derive(Clone)]
pub struct AuthorizationPipeline {
    checks: Vec<Arc<dyn AuthCheck>>,
}

impl AuthorizationPipeline {
    /// Checks in fixed order: loopback, password, API key, CSRF.
    pub fn for_requirement(requirement: AuthRequirement, state: &SecurityState) -> Self {
        let mut checks: Vec<Arc<dyn AuthCheck>> = Vec::new();
        if requirement.loopback_only {
            checks.push(Arc::new(LoopbackCheck));
        }
        if requirement.needs_password_auth {
            checks.push(Arc::new(PasswordCheck::new(state.credentials.clone())));
        }
        if requirement.needs_api_key {
            checks.push(Arc::new(ApiKeyCheck::new(state.credentials.clone())));
        }
        if requirement.needs_csrf {
            checks.push(Arc::new(CsrfCheck::new(state.sessions.clone(), state.cookie_name.clone())));
        }
        Self { checks }
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// First denial wins; later checks are not evaluated.
    pub async fn evaluate(&self, ctx: &RequestContext) -> AuthzDecision {
        for check in &self.checks {
            if let AuthzDecision::Deny(denial) = check.evaluate(ctx).await {
                tracing::info!(
                    check = check.name(),
                    path = %ctx.path,
                    status = denial.status.as_u16(),
                    request_id = %ctx.request_id,
                    "Request denied"
                );
                metrics::record_auth_denied(check.name());
                return AuthzDecision::Deny(denial);
            }
        }
        AuthzDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::credentials::Credentials;
    use axum::http::{Method, StatusCode};

    fn state() -> SecurityState {
        SecurityState {
            credentials: Arc::new(CredentialStore::new(Credentials {
                login: Some("admin".into()),
                password: Some("pw".into()),
                api_key: Some("secret".into()),
            })),
            sessions: SessionStore::new(),
            cookie_name: "session_id".into(),
        }
    }

    fn all() -> AuthRequirement {
        AuthRequirement {
            loopback_only: true,
            needs_password_auth: true,
            needs_api_key: true,
            needs_csrf: true,
        }
    }

    #[test]
    fn test_fixed_order() {
        let pipeline = AuthorizationPipeline::for_requirement(all(), &state());
        assert_eq!(pipeline.check_names(), vec!["loopback", "password", "api_key", "csrf"]);

        let pipeline = AuthorizationPipeline::for_requirement(AuthRequirement::default(), &state());
        assert_eq!(pipeline.check_names(), vec!["password", "csrf"]);

        let pipeline = AuthorizationPipeline::for_requirement(AuthRequirement::open(), &state());
        assert!(pipeline.check_names().is_empty());
    }

    #[tokio::test]
    async fn test_first_failing_check_decides() {
        let state = state();
        let bare = RequestContext::new(Method::POST, "/x").with_remote_addr("10.0.0.5");

        // Every combination of flags: the denial comes from the first declared check.
        for bits in 1u8..16 {
            let requirement = AuthRequirement {
                loopback_only: bits & 1 != 0,
                needs_password_auth: bits & 2 != 0,
                needs_api_key: bits & 4 != 0,
                needs_csrf: bits & 8 != 0,
            };
            let expected = if requirement.loopback_only {
                StatusCode::FORBIDDEN
            } else if requirement.needs_password_auth || requirement.needs_api_key {
                StatusCode::UNAUTHORIZED
            } else {
                StatusCode::FORBIDDEN
            };

            match AuthorizationPipeline::for_requirement(requirement, &state).evaluate(&bare).await {
                AuthzDecision::Deny(denial) => assert_eq!(denial.status, expected, "flags {bits:04b}"),
                AuthzDecision::Allow => panic!("flags {bits:04b} allowed an unauthenticated request"),
            }
        }
    }

    #[tokio::test]
    async fn test_password_denial_precedes_api_key() {
        let requirement = AuthRequirement {
            needs_api_key: true,
            ..AuthRequirement::default()
        };
        let ctx = RequestContext::new(Method::POST, "/x").with_header("x-api-key", "secret");
        match AuthorizationPipeline::for_requirement(requirement, &state()).evaluate(&ctx).await {
            AuthzDecision::Deny(denial) => assert!(denial.www_authenticate.is_some()),
            AuthzDecision::Allow => panic!("missing password must be denied"),
        }
    }

    #[tokio::test]
    async fn test_open_requirement_allows() {
        let pipeline = AuthorizationPipeline::for_requirement(AuthRequirement::open(), &state());
        let ctx = RequestContext::new(Method::GET, "/x");
        assert!(pipeline.evaluate(&ctx).await.is_allowed());
    }
}
