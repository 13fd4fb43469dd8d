//! Container runtime detection.
//!
//! Probes are read-only and never cached here; callers decide whether to
//! remember the answer.

use std::time::Duration;

use crate::config::{ServiceTimeouts, ToolConfig};
use crate::container::command::{run_with_timeout, CommandError};

/// Which compose front-end is usable on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// `docker compose ...`
    ComposePlugin,
    /// `docker-compose ...`
    ComposeStandalone,
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ComposePlugin => "compose-plugin",
            Self::ComposeStandalone => "compose-standalone",
        })
    }
}

/// Detects compose tooling by running `version` subcommands.
#[derive(Debug, Clone)]
pub struct RuntimeProbe {
    docker_bin: String,
    compose_bin: String,
    availability_timeout: Duration,
    selection_timeout: Duration,
}

impl RuntimeProbe {
    pub fn new(tools: &ToolConfig, timeouts: &ServiceTimeouts) -> Self {
        Self {
            docker_bin: tools.docker_bin.clone(),
            compose_bin: tools.compose_bin.clone(),
            availability_timeout: Duration::from_secs(timeouts.probe_secs),
            selection_timeout: Duration::from_secs(timeouts.select_secs),
        }
    }

    /// Try the plugin syntax first, then the standalone tool.
    pub async fn detect(&self) -> Option<RuntimeKind> {
        if self.plugin_responds(self.availability_timeout).await {
            return Some(RuntimeKind::ComposePlugin);
        }
        if self.standalone_responds(self.availability_timeout).await {
            return Some(RuntimeKind::ComposeStandalone);
        }
        tracing::debug!(
            docker_bin = %self.docker_bin,
            compose_bin = %self.compose_bin,
            "No compose tool available"
        );
        None
    }

    /// Pick the command prefix with the short selection timeout. Falls back
    /// to the standalone tool without checking it.
    pub async fn select_command(&self) -> Vec<String> {
        if self.plugin_responds(self.selection_timeout).await {
            self.command_for(RuntimeKind::ComposePlugin)
        } else {
            self.command_for(RuntimeKind::ComposeStandalone)
        }
    }

    pub fn command_for(&self, kind: RuntimeKind) -> Vec<String> {
        match kind {
            RuntimeKind::ComposePlugin => vec![self.docker_bin.clone(), "compose".to_string()],
            RuntimeKind::ComposeStandalone => vec![self.compose_bin.clone()],
        }
    }

    async fn plugin_responds(&self, timeout: Duration) -> bool {
        let args = ["compose".to_string(), "version".to_string()];
        responds(&self.docker_bin, &args, timeout).await
    }

    async fn standalone_responds(&self, timeout: Duration) -> bool {
        responds(&self.compose_bin, &["version".to_string()], timeout).await
    }
}

async fn responds(program: &str, args: &[String], timeout: Duration) -> bool {
    match run_with_timeout(program, args, None, timeout).await {
        Ok(output) => output.success(),
        Err(CommandError::NotFound { .. }) => false,
        Err(e) => {
            tracing::debug!(error = %e, "Compose probe failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(docker_bin: &str, compose_bin: &str) -> RuntimeProbe {
        RuntimeProbe::new(
            &ToolConfig {
                docker_bin: docker_bin.to_string(),
                compose_bin: compose_bin.to_string(),
            },
            &ServiceTimeouts::default(),
        )
    }

    #[tokio::test]
    async fn test_plugin_preferred() {
        let p = probe("true", "true");
        assert_eq!(p.detect().await, Some(RuntimeKind::ComposePlugin));
        assert_eq!(p.select_command().await, vec!["true", "compose"]);
    }

    #[tokio::test]
    async fn test_standalone_fallback() {
        let p = probe("false", "true");
        assert_eq!(p.detect().await, Some(RuntimeKind::ComposeStandalone));
        assert_eq!(p.select_command().await, vec!["true"]);
    }

    #[tokio::test]
    async fn test_unavailable_when_nothing_responds() {
        let p = probe("/nonexistent/docker", "/nonexistent/docker-compose");
        assert_eq!(p.detect().await, None);
        // Repeated calls give the same answer.
        assert_eq!(p.detect().await, None);
    }
}
