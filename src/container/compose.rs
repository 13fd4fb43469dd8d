//! Compose-driven control of the declared service topology.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ServiceTimeouts;
use crate::container::command::run_with_timeout;
use crate::container::probe::RuntimeProbe;
use crate::container::spec::ServiceSpec;
use crate::container::strategy::{
    LifecycleError, ServiceStatus, ServiceStrategy, StrategyHandle, StrategyKind,
};

/// Drives `up -d` / `down` / `ps -q` against a fixed definition file.
pub struct ComposeStrategy {
    probe: RuntimeProbe,
    definition: Option<PathBuf>,
    env_file: Option<PathBuf>,
    status_timeout: Duration,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl ComposeStrategy {
    pub fn new(probe: RuntimeProbe, timeouts: &ServiceTimeouts, spec: &ServiceSpec) -> Self {
        Self {
            probe,
            definition: spec.compose_file.clone(),
            env_file: spec.env_file.clone(),
            status_timeout: Duration::from_secs(timeouts.status_secs),
            start_timeout: Duration::from_secs(timeouts.start_secs),
            stop_timeout: Duration::from_secs(timeouts.stop_secs),
        }
    }

    fn existing_definition(&self) -> Option<&Path> {
        self.definition.as_deref().filter(|p| p.exists())
    }

    /// Full argv: tool prefix, `-f <definition>`, optional `--env-file`, then `action`.
    async fn command(
        &self,
        definition: &Path,
        env_file: Option<&Path>,
        action: &[&str],
    ) -> Vec<String> {
        let mut argv = self.probe.select_command().await;
        argv.push("-f".to_string());
        argv.push(definition.display().to_string());
        if let Some(env) = env_file.filter(|p| p.exists()) {
            argv.push("--env-file".to_string());
            argv.push(env.display().to_string());
        }
        argv.extend(action.iter().map(|s| s.to_string()));
        argv
    }

    async fn run(
        &self,
        operation: &'static str,
        argv: Vec<String>,
        definition: &Path,
        timeout: Duration,
    ) -> Result<String, LifecycleError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LifecycleError::Unavailable("compose".to_string()))?;
        let output = run_with_timeout(program, args, definition.parent(), timeout)
            .await
            .map_err(|e| LifecycleError::from_command(operation, e))?;

        if output.success() {
            Ok(output.stdout)
        } else {
            Err(LifecycleError::ExternalProcessFailure {
                operation,
                status: output.status.to_string(),
                diagnostics: output.diagnostics(),
            })
        }
    }
}

#[async_trait]
impl ServiceStrategy for ComposeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Compose
    }

    async fn is_available(&self) -> bool {
        self.existing_definition().is_some() && self.probe.detect().await.is_some()
    }

    async fn status(&self) -> ServiceStatus {
        let Some(definition) = self.existing_definition() else {
            return ServiceStatus::Stopped;
        };
        if self.probe.detect().await.is_none() {
            return ServiceStatus::Stopped;
        }

        let argv = self.command(definition, self.env_file.as_deref(), &["ps", "-q"]).await;
        match self.run("compose ps", argv, definition, self.status_timeout).await {
            Ok(stdout) if !stdout.trim().is_empty() => ServiceStatus::Running,
            Ok(_) => ServiceStatus::Stopped,
            Err(e) => {
                tracing::debug!(error = %e, "Compose status query failed");
                ServiceStatus::Stopped
            }
        }
    }

    fn adopt_handle(&self, _spec: &ServiceSpec) -> Option<StrategyHandle> {
        self.existing_definition().map(|definition| StrategyHandle::Compose {
            definition: definition.to_path_buf(),
            env_file: self.env_file.clone(),
        })
    }

    async fn start(&self, spec: &ServiceSpec) -> Result<StrategyHandle, LifecycleError> {
        let definition = spec
            .compose_file
            .clone()
            .ok_or_else(|| LifecycleError::ConfigurationMissing(PathBuf::from("<unset>")))?;
        if !definition.exists() {
            return Err(LifecycleError::ConfigurationMissing(definition));
        }
        if self.probe.detect().await.is_none() {
            return Err(LifecycleError::Unavailable("compose".to_string()));
        }

        tracing::info!(definition = %definition.display(), "Starting compose services");
        let argv = self.command(&definition, spec.env_file.as_deref(), &["up", "-d"]).await;
        self.run("compose up", argv, &definition, self.start_timeout).await?;
        tracing::info!("Compose services started");

        Ok(StrategyHandle::Compose {
            definition,
            env_file: spec.env_file.clone(),
        })
    }

    async fn stop(&self, handle: &StrategyHandle) -> Result<(), LifecycleError> {
        let StrategyHandle::Compose {
            definition,
            env_file,
        } = handle
        else {
            return Err(LifecycleError::ForeignHandle(handle.clone()));
        };

        if !definition.exists() {
            tracing::debug!(definition = %definition.display(), "No definition file, nothing to stop");
            return Ok(());
        }
        if self.probe.detect().await.is_none() {
            tracing::debug!("Compose tool unavailable, nothing to stop");
            return Ok(());
        }

        tracing::info!("Stopping compose services");
        let argv = self.command(definition, env_file.as_deref(), &["down"]).await;
        self.run("compose down", argv, definition, self.stop_timeout).await?;
        tracing::info!("Compose services stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServiceConfig, ToolConfig};

    fn strategy(dir: &Path, docker_bin: &str) -> (ComposeStrategy, ServiceSpec) {
        let config = ServiceConfig {
            tools: ToolConfig {
                docker_bin: docker_bin.to_string(),
                compose_bin: "/nonexistent/docker-compose".to_string(),
            },
            ..ServiceConfig::default()
        };
        let spec = ServiceSpec::from_config(&config, dir);
        let probe = RuntimeProbe::new(&config.tools, &config.timeouts);
        (ComposeStrategy::new(probe, &config.timeouts, &spec), spec)
    }

    fn write_definition(dir: &Path) {
        std::fs::write(dir.join("docker-compose.yml"), "services: {}\n").unwrap();
    }

    #[tokio::test]
    async fn test_start_without_definition_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let (compose, spec) = strategy(dir.path(), "true");

        let err = compose.start(&spec).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_start_without_tool_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path());
        let (compose, spec) = strategy(dir.path(), "/nonexistent/docker");

        assert!(!compose.is_available().await);
        let err = compose.start(&spec).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_start_returns_compose_handle() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path());
        let (compose, spec) = strategy(dir.path(), "true");

        let handle = compose.start(&spec).await.unwrap();
        assert_eq!(handle.kind(), StrategyKind::Compose);
        compose.stop(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_running_iff_ids_listed() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path());

        // `echo` prints its arguments, standing in for container ids.
        let (listing, _) = strategy(dir.path(), "echo");
        assert_eq!(listing.status().await, ServiceStatus::Running);

        let (silent, _) = strategy(dir.path(), "true");
        assert_eq!(silent.status().await, ServiceStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_is_vacuous_without_definition() {
        let dir = tempfile::tempdir().unwrap();
        let (compose, _) = strategy(dir.path(), "false");
        let handle = StrategyHandle::Compose {
            definition: dir.path().join("docker-compose.yml"),
            env_file: None,
        };
        assert!(compose.stop(&handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_is_vacuous_without_tool() {
        let dir = tempfile::tempdir().unwrap();
        write_definition(dir.path());
        let (compose, _) = strategy(dir.path(), "/nonexistent/docker");
        let handle = compose.adopt_handle(&ServiceSpec::from_config(
            &ServiceConfig::default(),
            dir.path(),
        ));
        assert!(compose.stop(&handle.unwrap()).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_rejects_container_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (compose, _) = strategy(dir.path(), "true");
        let handle = StrategyHandle::Container {
            name: "x".to_string(),
            id: "y".to_string(),
        };
        assert!(matches!(
            compose.stop(&handle).await,
            Err(LifecycleError::ForeignHandle(_))
        ));
    }
}
