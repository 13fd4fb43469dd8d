//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Managed backend service (the code-execution container).
    pub service: ServiceConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Web UI settings.
    pub webui: WebUiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host name or address to bind (overridden by `WEB_UI_HOST` and `--host`).
    pub host: String,

    /// Port to bind (overridden by `WEB_UI_PORT` and `--port`).
    pub port: u16,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum buffered request body in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
            request_timeout_secs: 300,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// Backend service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Start the backend automatically at startup.
    pub auto_start: bool,

    /// Strategy-agnostic service name.
    pub name: String,

    /// Image used by the native container strategy.
    pub image: String,

    /// Host port mapped to the container's SSH port (22/tcp).
    pub ssh_port: u16,

    /// Host port mapped to the container's HTTP port (80/tcp).
    pub http_port: u16,

    /// Declarative multi-service definition, relative to the working directory.
    pub compose_file: String,

    /// Optional environment override passed to the compose tool when present.
    pub env_file: String,

    /// Container path the working directory is mounted at.
    pub mount_target: String,

    /// Directory (relative to the working directory) mounted at `/root`.
    pub work_dir: String,

    pub tools: ToolConfig,

    pub timeouts: ServiceTimeouts,

    pub progress: ProgressConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            name: "sandbox".to_string(),
            image: "sandbox-runtime:development".to_string(),
            ssh_port: 55022,
            http_port: 55080,
            compose_file: "docker-compose.yml".to_string(),
            env_file: ".env.docker".to_string(),
            mount_target: "/a0".to_string(),
            work_dir: "work_dir".to_string(),
            tools: ToolConfig::default(),
            timeouts: ServiceTimeouts::default(),
            progress: ProgressConfig::default(),
        }
    }
}

/// External tool binaries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Container CLI providing the `compose` subcommand.
    pub docker_bin: String,

    /// Legacy standalone compose tool.
    pub compose_bin: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            compose_bin: "docker-compose".to_string(),
        }
    }
}

/// Timeouts for external calls, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceTimeouts {
    /// Availability probe.
    pub probe_secs: u64,
    /// Compose command selection.
    pub select_secs: u64,
    /// `ps -q` status query.
    pub status_secs: u64,
    /// Bring-up.
    pub start_secs: u64,
    /// Tear-down.
    pub stop_secs: u64,
    /// Image pull for the native strategy.
    pub pull_secs: u64,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            probe_secs: 10,
            select_secs: 5,
            status_secs: 30,
            start_secs: 120,
            stop_secs: 60,
            pull_secs: 3600,
        }
    }
}

/// Image download progress reporting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub interval_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,

    /// Seconds a session (and its CSRF token) stays valid after creation.
    pub ttl_secs: u64,

    /// Upper bound on live sessions; the oldest is evicted past it.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            ttl_secs: 12 * 60 * 60,
            max_sessions: 10_000,
        }
    }
}

/// Web UI configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebUiConfig {
    /// Template rendered for `GET /`.
    pub index_template: String,
}

impl Default for WebUiConfig {
    fn default() -> Self {
        Self {
            index_template: "webui/index.html".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
