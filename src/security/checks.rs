//! The four authorization checks.
//!
//! Each check inspects a buffered `RequestContext` and either allows or
//! denies. Secrets are compared with `subtle` so the comparison time does
//! not depend on how much of the supplied value matches.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;

use crate::http::request::RequestContext;
use crate::security::credentials::CredentialStore;
use crate::security::requirement::{AuthzDecision, Denial};
use crate::security::session::SessionStore;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_FIELD: &str = "api_key";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[async_trait]
pub trait AuthCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, ctx: &RequestContext) -> AuthzDecision;
}

pub(crate) fn secure_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Allows only peers whose every resolved address is loopback.
pub struct LoopbackCheck;

#[async_trait]
impl AuthCheck for LoopbackCheck {
    fn name(&self) -> &'static str {
        "loopback"
    }

    async fn evaluate(&self, ctx: &RequestContext) -> AuthzDecision {
        let allowed = match ctx.remote_addr.as_deref() {
            Some(addr) => is_loopback_address(addr).await,
            None => false,
        };
        if allowed {
            AuthzDecision::Allow
        } else {
            AuthzDecision::Deny(Denial::forbidden("Access denied."))
        }
    }
}

/// Literal IPs are judged directly; anything else is resolved and every
/// result must be loopback. Resolution failure denies.
pub async fn is_loopback_address(addr: &str) -> bool {
    let host = addr.trim().trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_loopback_ip(ip);
    }
    if host.is_empty() {
        return false;
    }

    match tokio::net::lookup_host((host, 0)).await {
        Ok(resolved) => {
            let mut any = false;
            for socket in resolved {
                any = true;
                if !is_loopback_ip(socket.ip()) {
                    tracing::debug!(host, resolved = %socket.ip(), "Host resolves to a non-loopback address");
                    return false;
                }
            }
            any
        }
        Err(e) => {
            tracing::debug!(host, error = %e, "Could not resolve peer address");
            false
        }
    }
}

pub fn is_loopback_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback()),
    }
}

/// HTTP Basic auth against the configured login. A no-op unless both the
/// login and the password are configured.
pub struct PasswordCheck {
    credentials: Arc<CredentialStore>,
}

impl PasswordCheck {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl AuthCheck for PasswordCheck {
    fn name(&self) -> &'static str {
        "password"
    }

    async fn evaluate(&self, ctx: &RequestContext) -> AuthzDecision {
        let credentials = self.credentials.load();
        let Some((login, password)) = credentials.basic_auth() else {
            return AuthzDecision::Allow;
        };

        let supplied = ctx.header("authorization").and_then(parse_basic_auth);
        match supplied {
            // Both comparisons always run.
            Some((user, pass)) if secure_eq(&user, login) & secure_eq(&pass, password) => AuthzDecision::Allow,
            _ => AuthzDecision::Deny(Denial::challenge(
                "Could not verify your access level for that URL.\nYou have to login with proper credentials",
            )),
        }
    }
}

/// Decode `Basic <base64(user:pass)>`.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// API key from the `X-API-KEY` header, else from the `api_key` field of a
/// JSON body.
pub struct ApiKeyCheck {
    credentials: Arc<CredentialStore>,
}

impl ApiKeyCheck {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl AuthCheck for ApiKeyCheck {
    fn name(&self) -> &'static str {
        "api_key"
    }

    async fn evaluate(&self, ctx: &RequestContext) -> AuthzDecision {
        let supplied = ctx
            .header(API_KEY_HEADER)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .or_else(|| ctx.json_field(API_KEY_FIELD).filter(|v| !v.is_empty()));

        let credentials = self.credentials.load();
        match (supplied, credentials.api_key.as_deref()) {
            (Some(supplied), Some(expected)) if secure_eq(&supplied, expected) => AuthzDecision::Allow,
            _ => AuthzDecision::Deny(Denial::unauthorized("API key required")),
        }
    }
}

/// Session token (looked up through the session cookie) must equal the
/// `X-CSRF-Token` header.
pub struct CsrfCheck {
    sessions: SessionStore,
    cookie_name: String,
}

impl CsrfCheck {
    pub fn new(sessions: SessionStore, cookie_name: impl Into<String>) -> Self {
        Self {
            sessions,
            cookie_name: cookie_name.into(),
        }
    }
}

#[async_trait]
impl AuthCheck for CsrfCheck {
    fn name(&self) -> &'static str {
        "csrf"
    }

    async fn evaluate(&self, ctx: &RequestContext) -> AuthzDecision {
        let expected = ctx
            .cookie(&self.cookie_name)
            .and_then(|id| self.sessions.csrf_token(id));
        let supplied = ctx.header(CSRF_HEADER);

        match (expected, supplied) {
            (Some(expected), Some(supplied)) if !expected.is_empty() && secure_eq(supplied, &expected) => {
                AuthzDecision::Allow
            }
            _ => AuthzDecision::Deny(Denial::forbidden("CSRF token missing or invalid")),
        }
    }
}
