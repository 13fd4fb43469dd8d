//! Immutable description of the managed backend.

use std::path::{Path, PathBuf};

use crate::config::ServiceConfig;

/// Host port published for a container port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: &'static str,
    pub host_port: u16,
}

impl PortMapping {
    pub fn tcp(container_port: u16, host_port: u16) -> Self {
        Self {
            container_port,
            protocol: "tcp",
            host_port,
        }
    }

    /// Docker's `<port>/<proto>` key.
    pub fn container_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

/// Host directory bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBinding {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

impl VolumeBinding {
    pub fn read_write(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only: false,
        }
    }

    /// Docker bind string `host:container:mode`.
    pub fn bind_spec(&self) -> String {
        let mode = if self.read_only { "ro" } else { "rw" };
        format!(
            "{}:{}:{}",
            self.host_path.display(),
            self.container_path,
            mode
        )
    }
}

/// Everything a strategy needs to run the backend. Built once at startup.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeBinding>,
    pub compose_file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

impl ServiceSpec {
    /// Resolve the configured service against the working directory.
    pub fn from_config(config: &ServiceConfig, cwd: &Path) -> Self {
        Self {
            name: config.name.clone(),
            image: config.image.clone(),
            ports: vec![
                PortMapping::tcp(22, config.ssh_port),
                PortMapping::tcp(80, config.http_port),
            ],
            volumes: vec![
                VolumeBinding::read_write(cwd, config.mount_target.clone()),
                VolumeBinding::read_write(cwd.join(&config.work_dir), "/root"),
            ],
            compose_file: non_empty(&config.compose_file).map(|p| cwd.join(p)),
            env_file: non_empty(&config.env_file).map(|p| cwd.join(p)),
        }
    }

    /// Container name for the native strategy, unique per port set.
    pub fn container_name(&self) -> String {
        let ports: Vec<String> = self.ports.iter().map(|p| p.host_port.to_string()).collect();
        if ports.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", self.name, ports.join("-"))
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = ServiceConfig::default();
        let spec = ServiceSpec::from_config(&config, Path::new("/srv/app"));

        assert_eq!(spec.container_name(), "sandbox-55022-55080");
        assert_eq!(spec.ports[0].container_key(), "22/tcp");
        assert_eq!(spec.volumes[0].bind_spec(), "/srv/app:/a0:rw");
        assert_eq!(spec.volumes[1].bind_spec(), "/srv/app/work_dir:/root:rw");
        assert_eq!(
            spec.compose_file.as_deref(),
            Some(Path::new("/srv/app/docker-compose.yml"))
        );
    }

    #[test]
    fn test_blank_paths_are_absent() {
        let config = ServiceConfig {
            compose_file: String::new(),
            env_file: "  ".to_string(),
            ..ServiceConfig::default()
        };
        let spec = ServiceSpec::from_config(&config, Path::new("/srv/app"));
        assert!(spec.compose_file.is_none());
        assert!(spec.env_file.is_none());
    }
}
