//! Backend service lifecycle.
//!
//! # States
//! ```text
//! Idle ──ensure_running──▶ Starting ──compose ok──────────▶ Active
//!                             │                              │
//!                             ├─compose fails/unavailable    │ teardown / stop
//!                             │   └─native ok───────────────▶│
//!                             └─both fail──▶ Idle            ▼
//!                                                        Stopping ──▶ Idle
//! ```
//!
//! The process state (active strategy + handle) sits behind one async
//! mutex. Start runs during startup and teardown during shutdown; a
//! teardown that arrives mid-start waits for the start to finish or time
//! out, then stops whatever it produced.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::config::ServiceConfig;
use crate::container::compose::ComposeStrategy;
use crate::container::engine::{BollardEngine, ContainerEngine};
use crate::container::native::NativeApiStrategy;
use crate::container::probe::RuntimeProbe;
use crate::container::spec::ServiceSpec;
use crate::container::strategy::{
    LifecycleError, ServiceStatus, ServiceStrategy, StrategyHandle, StrategyKind,
};
use crate::lifecycle::progress::ProgressNotifier;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Idle,
    Starting,
    Active,
    Stopping,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Stopping => "stopping",
        }
    }
}

/// Observable view of the orchestrator, readable without the state lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LifecycleSnapshot {
    pub phase: LifecyclePhase,
    pub strategy: Option<StrategyKind>,
    #[serde(skip)]
    pub entered_at: Instant,
}

impl LifecycleSnapshot {
    pub fn new(phase: LifecyclePhase, strategy: Option<StrategyKind>) -> Self {
        Self {
            phase,
            strategy,
            entered_at: Instant::now(),
        }
    }
}

/// Whether startup should bring the backend up at all.
#[derive(Debug, Clone, Copy)]
pub struct AutoStart {
    pub enabled: bool,
    /// This process already runs inside the managed environment.
    pub dockerized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(StrategyKind),
    /// Services were already running and are now tracked for teardown.
    Adopted(StrategyKind),
    AlreadyRunning(StrategyKind),
    Disabled,
    SelfHosted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    NothingActive,
    Stopped(StrategyKind),
    Failed(StrategyKind),
}

struct ActiveService {
    kind: StrategyKind,
    handle: StrategyHandle,
}

#[derive(Default)]
struct ProcessState {
    active: Option<ActiveService>,
    shutting_down: bool,
}

pub struct LifecycleOrchestrator {
    spec: ServiceSpec,
    auto_start: AutoStart,
    compose: Arc<dyn ServiceStrategy>,
    native: Arc<dyn ServiceStrategy>,
    progress: Option<(Arc<dyn ContainerEngine>, Duration)>,
    /// Worst case for one `ensure_running`: compose, then pull and start natively.
    start_budget: Duration,
    state: Mutex<ProcessState>,
    snapshot: watch::Sender<LifecycleSnapshot>,
}

impl LifecycleOrchestrator {
    pub fn new(
        spec: ServiceSpec,
        auto_start: AutoStart,
        compose: Arc<dyn ServiceStrategy>,
        native: Arc<dyn ServiceStrategy>,
    ) -> Self {
        let (snapshot, _) = watch::channel(LifecycleSnapshot::new(LifecyclePhase::Idle, None));
        Self {
            spec,
            auto_start,
            compose,
            native,
            progress: None,
            start_budget: Duration::ZERO,
            state: Mutex::new(ProcessState::default()),
            snapshot,
        }
    }

    pub fn with_start_budget(mut self, budget: Duration) -> Self {
        self.start_budget = budget;
        self
    }

    /// Report image download progress while starting.
    pub fn with_progress(mut self, engine: Arc<dyn ContainerEngine>, interval: Duration) -> Self {
        self.progress = Some((engine, interval));
        self
    }

    /// Wire the real strategies from configuration.
    pub fn from_config(config: &ServiceConfig, cwd: &Path, dockerized: bool) -> Self {
        let spec = ServiceSpec::from_config(config, cwd);
        let engine: Arc<dyn ContainerEngine> = Arc::new(BollardEngine::new());
        let probe = RuntimeProbe::new(&config.tools, &config.timeouts);
        let compose = Arc::new(ComposeStrategy::new(probe, &config.timeouts, &spec));
        let native = Arc::new(NativeApiStrategy::new(engine.clone(), &config.timeouts, &spec));

        Self::new(
            spec,
            AutoStart {
                enabled: config.auto_start,
                dockerized,
            },
            compose,
            native,
        )
        .with_progress(engine, Duration::from_secs(config.progress.interval_secs))
        .with_start_budget(Duration::from_secs(
            config.timeouts.status_secs + config.timeouts.start_secs * 2 + config.timeouts.pull_secs,
        ))
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        *self.snapshot.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleSnapshot> {
        self.snapshot.subscribe()
    }

    /// Time a start in progress may still take before its timeouts fire.
    /// `None` unless the phase is `Starting`.
    pub fn remaining_start_budget(&self) -> Option<Duration> {
        let snapshot = self.snapshot();
        (snapshot.phase == LifecyclePhase::Starting)
            .then(|| self.start_budget.saturating_sub(snapshot.entered_at.elapsed()))
    }

    fn set_phase(&self, phase: LifecyclePhase, strategy: Option<StrategyKind>) {
        self.snapshot.send_replace(LifecycleSnapshot::new(phase, strategy));
        metrics::record_lifecycle_transition(phase.as_str());
        tracing::debug!(phase = phase.as_str(), strategy = ?strategy, "Lifecycle transition");
    }

    /// Bring the backend up unless disabled, self-hosted, or already active.
    pub async fn ensure_running(&self) -> Result<StartOutcome, LifecycleError> {
        if !self.auto_start.enabled {
            tracing::info!("Backend auto-start disabled");
            return Ok(StartOutcome::Disabled);
        }
        if self.auto_start.dockerized {
            tracing::warn!("Running inside the managed environment, refusing to start the backend from here");
            return Ok(StartOutcome::SelfHosted);
        }

        let mut state = self.state.lock().await;
        if state.shutting_down {
            return Err(LifecycleError::ShuttingDown);
        }
        if let Some(active) = &state.active {
            tracing::info!(strategy = %active.kind, "Backend already running");
            return Ok(StartOutcome::AlreadyRunning(active.kind));
        }

        tracing::info!(service = %self.spec.name, "Auto-starting backend service");
        self.set_phase(LifecyclePhase::Starting, None);
        if let Some((engine, interval)) = &self.progress {
            ProgressNotifier::new(engine.clone(), self.spec.image.clone(), *interval)
                .spawn(self.subscribe());
        }

        match self.start_with_fallback().await {
            Ok((outcome, active)) => {
                tracing::info!(strategy = %active.kind, "Backend service is ready");
                self.set_phase(LifecyclePhase::Active, Some(active.kind));
                state.active = Some(active);
                Ok(outcome)
            }
            Err(e) => {
                self.set_phase(LifecyclePhase::Idle, None);
                Err(e)
            }
        }
    }

    /// Compose first; exactly one fallback hop to the native API.
    async fn start_with_fallback(&self) -> Result<(StartOutcome, ActiveService), LifecycleError> {
        let primary_error = if self.compose.is_available().await {
            if self.compose.status().await == ServiceStatus::Running {
                if let Some(handle) = self.compose.adopt_handle(&self.spec) {
                    tracing::info!("Compose services already running, adopting them");
                    return Ok((
                        StartOutcome::Adopted(StrategyKind::Compose),
                        ActiveService {
                            kind: StrategyKind::Compose,
                            handle,
                        },
                    ));
                }
            }

            tracing::info!("Starting backend using compose");
            match self.compose.start(&self.spec).await {
                Ok(handle) => {
                    return Ok((
                        StartOutcome::Started(StrategyKind::Compose),
                        ActiveService {
                            kind: StrategyKind::Compose,
                            handle,
                        },
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Compose start failed, falling back to native API");
                    e
                }
            }
        } else {
            tracing::info!("Compose unavailable, using native container API");
            LifecycleError::Unavailable("compose".to_string())
        };

        match self.native.start(&self.spec).await {
            Ok(handle) => Ok((
                StartOutcome::Started(StrategyKind::NativeApi),
                ActiveService {
                    kind: StrategyKind::NativeApi,
                    handle,
                },
            )),
            Err(fallback) => Err(LifecycleError::BothStrategiesFailed {
                primary: Box::new(primary_error),
                fallback: Box::new(fallback),
            }),
        }
    }

    /// Explicitly stop the active backend. A later `ensure_running` may
    /// start it again.
    pub async fn stop(&self) -> TeardownOutcome {
        let mut state = self.state.lock().await;
        self.stop_active(&mut state).await
    }

    /// Shutdown-path teardown. Never fails; errors are logged. Safe to call
    /// repeatedly, and refuses any later start.
    pub async fn teardown(&self) -> TeardownOutcome {
        let mut state = self.state.lock().await;
        state.shutting_down = true;
        self.stop_active(&mut state).await
    }

    async fn stop_active(&self, state: &mut ProcessState) -> TeardownOutcome {
        let Some(active) = state.active.take() else {
            tracing::debug!("No backend service to stop");
            return TeardownOutcome::NothingActive;
        };

        self.set_phase(LifecyclePhase::Stopping, Some(active.kind));
        tracing::info!(strategy = %active.kind, "Stopping backend service");
        let strategy = match active.kind {
            StrategyKind::Compose => &self.compose,
            StrategyKind::NativeApi => &self.native,
        };
        let result = strategy.stop(&active.handle).await;
        self.set_phase(LifecyclePhase::Idle, None);

        match result {
            Ok(()) => {
                tracing::info!(strategy = %active.kind, "Backend service stopped");
                TeardownOutcome::Stopped(active.kind)
            }
            Err(e) => {
                tracing::error!(strategy = %active.kind, error = %e, "Failed to stop backend service");
                TeardownOutcome::Failed(active.kind)
            }
        }
    }
}
