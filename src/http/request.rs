//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4) and propagate them
//! - Buffer the request once into a `RequestContext` shared by the
//!   authorization checks and the handler
//! - Extract the peer address, cookies, headers, and JSON body fields

use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning an `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// A fully buffered request, as seen by checks and handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Peer address as text; usually a literal IP, possibly a host name.
    pub remote_addr: Option<String>,
    pub body: Bytes,
    pub request_id: String,
}

impl RequestContext {
    /// Buffer `request`, rejecting bodies over `body_limit` with 413.
    pub async fn from_request(request: Request<Body>, body_limit: usize) -> Result<Self, Response> {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, body_limit).await.map_err(|e| {
            tracing::warn!(error = %e, path = %parts.uri.path(), "Rejected request body");
            (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
        })?;

        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            remote_addr,
            body,
            request_id,
        })
    }

    /// Minimal context for tests and internal callers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            remote_addr: None,
            body: Bytes::new(),
            request_id: "unknown".to_string(),
        }
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(HeaderName::from_static(name), value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Header value as text; non-UTF-8 values count as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of cookie `name` across all `Cookie` headers.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// String field of a JSON object body.
    pub fn json_field(&self, field: &str) -> Option<String> {
        self.json()?
            .get(field)?
            .as_str()
            .map(ToString::to_string)
    }
}
