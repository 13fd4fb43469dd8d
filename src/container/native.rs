//! Single-container control through the engine API.
//!
//! Fallback for hosts without compose tooling or a definition file. Exactly
//! one container identity per process.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::ServiceTimeouts;
use crate::container::engine::{ContainerEngine, EngineError};
use crate::container::spec::ServiceSpec;
use crate::container::strategy::{
    LifecycleError, ServiceStatus, ServiceStrategy, StrategyHandle, StrategyKind,
};

pub struct NativeApiStrategy {
    engine: Arc<dyn ContainerEngine>,
    container_name: String,
    probe_timeout: Duration,
    start_timeout: Duration,
    stop_timeout: Duration,
    pull_timeout: Duration,
}

impl NativeApiStrategy {
    pub fn new(engine: Arc<dyn ContainerEngine>, timeouts: &ServiceTimeouts, spec: &ServiceSpec) -> Self {
        Self {
            engine,
            container_name: spec.container_name(),
            probe_timeout: Duration::from_secs(timeouts.probe_secs),
            start_timeout: Duration::from_secs(timeouts.start_secs),
            stop_timeout: Duration::from_secs(timeouts.stop_secs),
            pull_timeout: Duration::from_secs(timeouts.pull_secs),
        }
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    async fn ensure_image(&self, image: &str) -> Result<(), LifecycleError> {
        let present = self.engine.image_exists(image).await.map_err(engine_err)?;
        if present {
            return Ok(());
        }

        tracing::warn!(
            image,
            "Image not present locally, pulling; this is a large download and may take a long time"
        );
        bounded("image pull", self.pull_timeout, self.engine.pull_image(image)).await?;
        tracing::info!(image, "Image pulled");
        Ok(())
    }

    /// Reuse, restart, or create the named container.
    async fn launch(&self, spec: &ServiceSpec) -> Result<String, EngineError> {
        let name = &self.container_name;
        match self.engine.inspect_container(name).await? {
            Some(info) if info.running => {
                tracing::info!(container = %name, "Container already running, reusing it");
                Ok(info.id)
            }
            Some(info) => {
                tracing::info!(container = %name, "Starting existing container");
                self.engine.start_container(&info.id).await?;
                Ok(info.id)
            }
            None => {
                tracing::info!(container = %name, image = %spec.image, "Creating container");
                let id = self.engine.create_container(name, spec).await?;
                self.engine.start_container(&id).await?;
                Ok(id)
            }
        }
    }
}

fn engine_err(e: EngineError) -> LifecycleError {
    LifecycleError::Engine(e.to_string())
}

async fn bounded<T, F>(operation: &'static str, timeout: Duration, fut: F) -> Result<T, LifecycleError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    let started = Instant::now();
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(engine_err),
        Err(_) => Err(LifecycleError::Timeout {
            operation,
            elapsed: started.elapsed(),
        }),
    }
}

fn ignore_missing(result: Result<(), EngineError>) -> Result<(), EngineError> {
    match result {
        Err(EngineError::NotFound(_)) => Ok(()),
        other => other,
    }
}

#[async_trait]
impl ServiceStrategy for NativeApiStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NativeApi
    }

    async fn is_available(&self) -> bool {
        matches!(
            tokio::time::timeout(self.probe_timeout, self.engine.ping()).await,
            Ok(Ok(()))
        )
    }

    async fn status(&self) -> ServiceStatus {
        match self.engine.inspect_container(&self.container_name).await {
            Ok(Some(info)) if info.running => ServiceStatus::Running,
            _ => ServiceStatus::Stopped,
        }
    }

    fn adopt_handle(&self, _spec: &ServiceSpec) -> Option<StrategyHandle> {
        None
    }

    async fn start(&self, spec: &ServiceSpec) -> Result<StrategyHandle, LifecycleError> {
        if !self.is_available().await {
            return Err(LifecycleError::Unavailable("container engine".to_string()));
        }

        self.ensure_image(&spec.image).await?;
        let id = bounded("container start", self.start_timeout, self.launch(spec)).await?;
        tracing::info!(container = %self.container_name, id = %id, "Container is ready");

        Ok(StrategyHandle::Container {
            name: self.container_name.clone(),
            id,
        })
    }

    async fn stop(&self, handle: &StrategyHandle) -> Result<(), LifecycleError> {
        let StrategyHandle::Container { name, id } = handle else {
            return Err(LifecycleError::ForeignHandle(handle.clone()));
        };
        if !self.is_available().await {
            tracing::debug!("Container engine unavailable, nothing to stop");
            return Ok(());
        }

        let target = if id.is_empty() { name } else { id };
        tracing::info!(container = %name, "Stopping container");
        bounded("container stop", self.stop_timeout, async {
            ignore_missing(self.engine.stop_container(target).await)?;
            ignore_missing(self.engine.remove_container(target).await)
        })
        .await?;
        tracing::info!(container = %name, "Container removed");
        Ok(())
    }
}
