//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount one route per registered handler at `/<name>`, limited to the
//!   handler's declared methods
//! - Run each request through the handler's `AuthorizationPipeline`
//! - Serve the index page at `GET /` (password auth)
//! - Mount the MCP bridge at `/mcp`, outside the pipeline
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, on, MethodFilter},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::ServerConfig;
use crate::handlers::{ApiHandler, HandlerRegistry};
use crate::http::index::IndexPage;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestContext};
use crate::observability::metrics;
use crate::security::{AuthRequirement, AuthorizationPipeline, AuthzDecision, SecurityState};

pub const MCP_PATH: &str = "/mcp";

/// Everything one mounted route needs per request.
#[derive(Clone)]
struct RouteState {
    name: Arc<str>,
    handler: Arc<dyn ApiHandler>,
    pipeline: AuthorizationPipeline,
    body_limit: usize,
}

#[derive(Clone)]
struct IndexState {
    page: IndexPage,
    pipeline: AuthorizationPipeline,
    body_limit: usize,
}

pub struct HttpServer {
    routes: Router,
    mcp: Router,
    request_timeout: Duration,
}

impl HttpServer {
    pub fn new(
        config: &ServerConfig,
        registry: &HandlerRegistry,
        index: IndexPage,
        security: &SecurityState,
    ) -> Self {
        let body_limit = config.max_body_size;
        let mut routes = Router::new();

        for (name, handler) in registry.iter() {
            let Some(filter) = method_filter(name, handler.as_ref()) else {
                continue;
            };
            let route = RouteState {
                name: Arc::from(name),
                handler: handler.clone(),
                pipeline: AuthorizationPipeline::for_requirement(handler.requirements(), security),
                body_limit,
            };
            tracing::debug!(route = name, checks = ?route.pipeline.check_names(), "Mounting handler");
            routes = routes.route(
                &format!("/{name}"),
                on(filter, move |request: Request<Body>| dispatch(route.clone(), request)),
            );
        }

        let index = IndexState {
            page: index,
            pipeline: AuthorizationPipeline::for_requirement(AuthRequirement::default().without_csrf(), security),
            body_limit,
        };
        routes = routes.route("/", get(move |request: Request<Body>| serve_index(index.clone(), request)));

        Self {
            routes,
            mcp: Router::new().fallback(mcp_unavailable),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Replace the MCP bridge. Requests under `/mcp` reach it without any
    /// authorization check.
    pub fn with_mcp(mut self, bridge: Router) -> Self {
        self.mcp = bridge;
        self
    }

    /// The complete application router with middleware applied.
    #[allow(deprecated)]
    pub fn into_router(self) -> Router {
        self.routes
            .nest_service(MCP_PATH, self.mcp)
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.into_router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                crate::lifecycle::shutdown::wait(shutdown).await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn method_filter(name: &str, handler: &dyn ApiHandler) -> Option<MethodFilter> {
    let mut filter: Option<MethodFilter> = None;
    for method in handler.methods() {
        match MethodFilter::try_from(method.clone()) {
            Ok(f) => filter = Some(filter.map_or(f, |acc| acc.or(f))),
            Err(_) => tracing::warn!(route = name, method = %method, "Unsupported method, ignored"),
        }
    }
    if filter.is_none() {
        tracing::warn!(route = name, "Handler declares no usable methods, not mounted");
    }
    filter
}

async fn dispatch(route: RouteState, request: Request<Body>) -> Response {
    let response = match RequestContext::from_request(request, route.body_limit).await {
        Ok(ctx) => match route.pipeline.evaluate(&ctx).await {
            AuthzDecision::Allow => route.handler.handle(&ctx).await,
            AuthzDecision::Deny(denial) => denial.into_response(),
        },
        Err(rejection) => rejection,
    };
    metrics::record_request(&route.name, response.status().as_u16());
    response
}

async fn serve_index(index: IndexState, request: Request<Body>) -> Response {
    let ctx = match RequestContext::from_request(request, index.body_limit).await {
        Ok(ctx) => ctx,
        Err(rejection) => return rejection,
    };
    if let AuthzDecision::Deny(denial) = index.pipeline.evaluate(&ctx).await {
        return denial.into_response();
    }

    match index.page.render().await {
        Ok(html) => axum::response::Html(html).into_response(),
        Err(e) => {
            tracing::error!(template = %index.page.template().display(), error = %e, "Cannot render index page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Index page unavailable").into_response()
        }
    }
}

async fn mcp_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "MCP bridge not configured" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;
    use crate::handlers::{AppServices, HandlerRegistration};
    use crate::http::index::{GitVersion, StaticGitInfo};
    use crate::lifecycle::LifecycleOrchestrator;
    use crate::security::{CredentialStore, Credentials, SessionStore};
    use async_trait::async_trait;
    use axum::extract::ConnectInfo;
    use axum::http::{header, Method};
    use tower::ServiceExt;

    struct LocalOnly;

    #[async_trait]
    impl ApiHandler for LocalOnly {
        fn methods(&self) -> Vec<axum::http::Method> {
            vec![Method::GET]
        }

        fn requirements(&self) -> AuthRequirement {
            AuthRequirement::open().loopback()
        }

        async fn handle(&self, _ctx: &RequestContext) -> Response {
            "local".into_response()
        }
    }

    fn local_only(_: &AppServices) -> Arc<dyn ApiHandler> {
        Arc::new(LocalOnly)
    }

    fn router(credentials: Credentials, template: &std::path::Path) -> Router {
        let security = SecurityState {
            credentials: Arc::new(CredentialStore::new(credentials)),
            sessions: SessionStore::new(),
            cookie_name: "session_id".into(),
        };
        let services = AppServices {
            orchestrator: Arc::new(LifecycleOrchestrator::from_config(
                &ServiceConfig::default(),
                &std::env::temp_dir(),
                false,
            )),
            security: security.clone(),
            dockerized: false,
        };
        let mut table = crate::handlers::BUILTIN_HANDLERS.to_vec();
        table.push(HandlerRegistration {
            name: "local_only",
            factory: local_only,
        });
        let registry = HandlerRegistry::from_table(&table, &services).unwrap();
        let index = IndexPage::new(
            template,
            Arc::new(StaticGitInfo(GitVersion {
                version: "v9".into(),
                commit_time: "now".into(),
            })),
        );
        HttpServer::new(&ServerConfig::default(), &registry, index, &security).into_router()
    }

    fn from_peer(method: Method, uri: &str, peer: [u8; 4]) -> Request<Body> {
        let mut request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 5555))));
        request
    }

    #[tokio::test]
    async fn test_loopback_route_by_peer() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Credentials::default(), &dir.path().join("index.html"));

        let local = app.clone().oneshot(from_peer(Method::GET, "/local_only", [127, 0, 0, 1])).await.unwrap();
        assert_eq!(local.status(), StatusCode::OK);

        let remote = app.oneshot(from_peer(Method::GET, "/local_only", [10, 0, 0, 5])).await.unwrap();
        assert_eq!(remote.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_undeclared_method_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Credentials::default(), &dir.path().join("index.html"));

        let response = app.oneshot(from_peer(Method::POST, "/health", [127, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_request_id_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Credentials::default(), &dir.path().join("index.html"));

        let response = app.oneshot(from_peer(Method::GET, "/health", [127, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_index_requires_password() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("index.html");
        std::fs::write(&template, "<b>{{version_no}} {{version_time}}</b>").unwrap();
        let app = router(
            Credentials {
                login: Some("admin".into()),
                password: Some("pw".into()),
                api_key: None,
            },
            &template,
        );

        let denied = app.clone().oneshot(from_peer(Method::GET, "/", [127, 0, 0, 1])).await.unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert!(denied.headers().contains_key(header::WWW_AUTHENTICATE));

        let mut request = from_peer(Method::GET, "/", [127, 0, 0, 1]);
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, "Basic YWRtaW46cHc=".parse().unwrap());
        let allowed = app.oneshot(request).await.unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        let body = axum::body::to_bytes(allowed.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"<b>v9 now</b>");
    }

    #[tokio::test]
    async fn test_mcp_bypasses_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let security = SecurityState {
            credentials: Arc::new(CredentialStore::new(Credentials {
                login: Some("admin".into()),
                password: Some("pw".into()),
                api_key: Some("secret".into()),
            })),
            sessions: SessionStore::new(),
            cookie_name: "session_id".into(),
        };
        let index = IndexPage::new(dir.path().join("index.html"), Arc::new(StaticGitInfo(GitVersion::unknown())));
        let app = HttpServer::new(&ServerConfig::default(), &HandlerRegistry::new(), index, &security)
            .with_mcp(Router::new().route("/tools", get(|| async { "bridge" })))
            .into_router();

        let response = app.oneshot(from_peer(Method::GET, "/mcp/tools", [10, 0, 0, 5])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_mcp_default_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Credentials::default(), &dir.path().join("index.html"));

        let response = app.oneshot(from_peer(Method::POST, "/mcp/anything", [127, 0, 0, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
