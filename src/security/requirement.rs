//! Per-handler authorization requirements and decisions.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Which checks a handler needs. Evaluated in a fixed order:
/// loopback, password, API key, CSRF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRequirement {
    pub loopback_only: bool,
    pub needs_password_auth: bool,
    pub needs_api_key: bool,
    pub needs_csrf: bool,
}

impl Default for AuthRequirement {
    fn default() -> Self {
        Self {
            loopback_only: false,
            needs_password_auth: true,
            needs_api_key: false,
            needs_csrf: true,
        }
    }
}

impl AuthRequirement {
    /// No checks at all.
    pub const fn open() -> Self {
        Self {
            loopback_only: false,
            needs_password_auth: false,
            needs_api_key: false,
            needs_csrf: false,
        }
    }

    /// Only the API key.
    pub const fn api_key_only() -> Self {
        Self {
            loopback_only: false,
            needs_password_auth: false,
            needs_api_key: true,
            needs_csrf: false,
        }
    }

    pub const fn loopback(mut self) -> Self {
        self.loopback_only = true;
        self
    }

    pub const fn without_csrf(mut self) -> Self {
        self.needs_csrf = false;
        self
    }
}

/// Outcome of authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzDecision {
    Allow,
    Deny(Denial),
}

impl AuthzDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthzDecision::Allow)
    }
}

/// A rejected request: the status, the body text, and for password
/// failures the `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub status: StatusCode,
    pub reason: &'static str,
    pub www_authenticate: Option<&'static str>,
}

pub const BASIC_CHALLENGE: &str = r#"Basic realm="Login Required""#;

impl Denial {
    pub fn forbidden(reason: &'static str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            reason,
            www_authenticate: None,
        }
    }

    pub fn unauthorized(reason: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            reason,
            www_authenticate: None,
        }
    }

    pub fn challenge(reason: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            reason,
            www_authenticate: Some(BASIC_CHALLENGE),
        }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.reason).into_response();
        if let Some(challenge) = self.www_authenticate {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_requirement() {
        let req = AuthRequirement::default();
        assert!(!req.loopback_only);
        assert!(req.needs_password_auth);
        assert!(!req.needs_api_key);
        assert!(req.needs_csrf);
    }

    #[test]
    fn test_challenge_sets_header() {
        let response = Denial::challenge("Login required").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            r#"Basic realm="Login Required""#
        );

        let response = Denial::forbidden("Access denied.").into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
