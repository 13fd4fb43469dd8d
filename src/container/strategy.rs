//! The strategy seam shared by compose and native control.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::container::command::CommandError;
use crate::container::spec::ServiceSpec;

/// Which mechanism controls the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Compose,
    NativeApi,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compose => "compose",
            Self::NativeApi => "native_api",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to a running backend, handed back to the same
/// strategy's `stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyHandle {
    Compose {
        definition: PathBuf,
        env_file: Option<PathBuf>,
    },
    Container {
        name: String,
        id: String,
    },
}

impl StrategyHandle {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Compose { .. } => StrategyKind::Compose,
            Self::Container { .. } => StrategyKind::NativeApi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0} unavailable")]
    Unavailable(String),
    #[error("{operation} timed out after {}s", .elapsed.as_secs())]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },
    #[error("{operation} failed ({status}): {diagnostics}")]
    ExternalProcessFailure {
        operation: &'static str,
        status: String,
        diagnostics: String,
    },
    #[error("service definition not found: {}", .0.display())]
    ConfigurationMissing(PathBuf),
    #[error("container engine: {0}")]
    Engine(String),
    #[error("handle {0:?} does not belong to this strategy")]
    ForeignHandle(StrategyHandle),
    #[error("compose: {primary}; native API: {fallback}")]
    BothStrategiesFailed {
        primary: Box<LifecycleError>,
        fallback: Box<LifecycleError>,
    },
    #[error("shutdown in progress")]
    ShuttingDown,
}

impl LifecycleError {
    pub(crate) fn from_command(operation: &'static str, err: CommandError) -> Self {
        match err {
            CommandError::NotFound { program } => Self::Unavailable(program),
            CommandError::Timeout { elapsed, .. } => Self::Timeout { operation, elapsed },
            CommandError::Io { program, source } => Self::ExternalProcessFailure {
                operation,
                status: "spawn error".to_string(),
                diagnostics: format!("{}: {}", program, source),
            },
        }
    }
}

/// One way of running the backend.
#[async_trait]
pub trait ServiceStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether the strategy's tooling is usable on this host.
    async fn is_available(&self) -> bool;

    async fn status(&self) -> ServiceStatus;

    /// Handle that addresses an already-running instance, if the strategy
    /// can adopt one without starting anything.
    fn adopt_handle(&self, spec: &ServiceSpec) -> Option<StrategyHandle>;

    async fn start(&self, spec: &ServiceSpec) -> Result<StrategyHandle, LifecycleError>;

    /// Must succeed when there is nothing to stop.
    async fn stop(&self, handle: &StrategyHandle) -> Result<(), LifecycleError>;
}
