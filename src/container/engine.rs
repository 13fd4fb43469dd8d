//! Native container control-plane.
//!
//! `ContainerEngine` is the narrow surface the native strategy and the
//! progress notifier need. `BollardEngine` talks to the local Docker API.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::RwLock;

use crate::container::spec::ServiceSpec;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Api(String),
}

/// What the engine knows about a named container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub running: bool,
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn ping(&self) -> Result<(), EngineError>;
    async fn image_exists(&self, image: &str) -> Result<bool, EngineError>;
    async fn pull_image(&self, image: &str) -> Result<(), EngineError>;
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError>;
    /// Create a container named `name` from `spec`, returning its id.
    async fn create_container(&self, name: &str, spec: &ServiceSpec) -> Result<String, EngineError>;
    async fn start_container(&self, id: &str) -> Result<(), EngineError>;
    /// `NotFound` when the container does not exist.
    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;
    /// `NotFound` when the container does not exist.
    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;
}

/// Docker engine over the local socket.
#[derive(Clone, Default)]
pub struct BollardEngine {
    /// Cached connection (created on first use).
    docker: Arc<RwLock<Option<bollard::Docker>>>,
}

impl BollardEngine {
    pub fn new() -> Self {
        Self::default()
    }

    async fn docker(&self) -> Result<bollard::Docker, EngineError> {
        {
            let guard = self.docker.read().await;
            if let Some(ref d) = *guard {
                return Ok(d.clone());
            }
        }
        let docker = bollard::Docker::connect_with_local_defaults().map_err(map_err)?;
        *self.docker.write().await = Some(docker.clone());
        Ok(docker)
    }
}

fn map_err(e: bollard::errors::Error) -> EngineError {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound(message),
        other => EngineError::Api(other.to_string()),
    }
}

/// Docker answers 304 when stopping an already stopped container.
fn is_not_modified(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}

#[async_trait]
impl ContainerEngine for BollardEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.docker().await?.ping().await.map_err(map_err)?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        match self.docker().await?.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) => match map_err(e) {
                EngineError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), EngineError> {
        use bollard::image::CreateImageOptions;

        let docker = self.docker().await?;
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let mut stream = docker.create_image(Some(options), None, None);
        while let Some(item) = stream.next().await {
            let info = item.map_err(map_err)?;
            if let Some(error) = info.error {
                return Err(EngineError::Api(error));
            }
        }
        Ok(())
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError> {
        use bollard::container::InspectContainerOptions;

        match self
            .docker()
            .await?
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(resp) => Ok(Some(ContainerInfo {
                id: resp.id.unwrap_or_else(|| name.to_string()),
                running: resp.state.and_then(|s| s.running).unwrap_or(false),
            })),
            Err(e) => match map_err(e) {
                EngineError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create_container(&self, name: &str, spec: &ServiceSpec) -> Result<String, EngineError> {
        use bollard::container::{Config, CreateContainerOptions};
        use bollard::models::{HostConfig, PortBinding};

        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for port in &spec.ports {
            exposed_ports.insert(port.container_key(), HashMap::new());
            port_bindings.insert(
                port.container_key(),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(port.host_port.to_string()),
                }]),
            );
        }
        let binds: Vec<String> = spec.volumes.iter().map(|v| v.bind_spec()).collect();

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            binds: if binds.is_empty() { None } else { Some(binds) },
            ..Default::default()
        };
        let container_config = Config {
            image: Some(spec.image.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: name.to_string(),
            ..Default::default()
        };

        let response = self
            .docker()
            .await?
            .create_container(Some(options), container_config)
            .await
            .map_err(map_err)?;
        for warning in &response.warnings {
            tracing::warn!(container = name, warning = %warning, "Container created with warning");
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker()
            .await?
            .start_container::<String>(id, None)
            .await
            .map_err(map_err)
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        use bollard::container::StopContainerOptions;

        match self
            .docker()
            .await?
            .stop_container(id, Some(StopContainerOptions { t: 10 }))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_modified(&e) => Ok(()),
            Err(e) => Err(map_err(e)),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        use bollard::container::RemoveContainerOptions;

        self.docker()
            .await?
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(map_err)
    }
}
