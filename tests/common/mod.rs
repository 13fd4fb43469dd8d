//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sandbox_gateway::config::{EnvSettings, GatewayConfig};
use sandbox_gateway::container::{
    LifecycleError, ServiceSpec, ServiceStatus, ServiceStrategy, StrategyHandle, StrategyKind,
};
use sandbox_gateway::http::{GitVersion, StaticGitInfo};
use sandbox_gateway::lifecycle::{AutoStart, LifecycleOrchestrator};
use sandbox_gateway::{Gateway, Shutdown};

/// Scripted strategy that counts its calls.
pub struct FakeStrategy {
    kind: StrategyKind,
    available: bool,
    start_fails: bool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeStrategy {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            available: true,
            start_fails: false,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.start_fails = true;
        self
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceStrategy for FakeStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn status(&self) -> ServiceStatus {
        ServiceStatus::Stopped
    }

    fn adopt_handle(&self, _spec: &ServiceSpec) -> Option<StrategyHandle> {
        None
    }

    async fn start(&self, spec: &ServiceSpec) -> Result<StrategyHandle, LifecycleError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.start_fails {
            return Err(LifecycleError::Engine("scripted failure".to_string()));
        }
        Ok(match self.kind {
            StrategyKind::Compose => StrategyHandle::Compose {
                definition: PathBuf::from("docker-compose.yml"),
                env_file: None,
            },
            StrategyKind::NativeApi => StrategyHandle::Container {
                name: spec.container_name(),
                id: "fake".to_string(),
            },
        })
    }

    async fn stop(&self, _handle: &StrategyHandle) -> Result<(), LifecycleError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn spec(cwd: &std::path::Path) -> ServiceSpec {
    ServiceSpec::from_config(&GatewayConfig::default().service, cwd)
}

pub fn orchestrator(
    compose: Arc<FakeStrategy>,
    native: Arc<FakeStrategy>,
) -> Arc<LifecycleOrchestrator> {
    Arc::new(LifecycleOrchestrator::new(
        spec(&std::env::temp_dir()),
        AutoStart {
            enabled: true,
            dockerized: false,
        },
        compose,
        native,
    ))
}

/// A gateway serving on an ephemeral loopback port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub orchestrator: Arc<LifecycleOrchestrator>,
    pub server: JoinHandle<std::io::Result<()>>,
    pub _dir: tempfile::TempDir,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway with the given env-file values and the built-in handlers.
pub async fn spawn_gateway(env: &[(&str, &str)], orchestrator: Arc<LifecycleOrchestrator>) -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("index.html");
    std::fs::write(&template, "<title>{{version_no}}</title>").unwrap();

    let mut config = GatewayConfig::default();
    config.webui.index_template = template.to_string_lossy().into_owned();

    let env = EnvSettings::from_pairs(env.iter().copied());
    let gateway = Gateway::build(
        &config,
        &env,
        orchestrator.clone(),
        false,
        Arc::new(StaticGitInfo(GitVersion::unknown())),
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(gateway.into_server().run(listener, shutdown.subscribe()));

    TestGateway {
        addr,
        shutdown,
        orchestrator,
        server,
        _dir: dir,
    }
}
