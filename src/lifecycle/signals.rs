//! OS signal handling.
//!
//! SIGINT and SIGTERM trigger the shutdown coordinator; the caller then
//! drains the server and tears the backend down before exiting 0.
//! SIGHUP runs the reload callback. Repeated signals are logged and
//! otherwise ignored, since teardown is idempotent.
//!
//! A backend start is never interrupted. `spawn_start_notice` reports how
//! long a signal received mid-start may still wait.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::lifecycle::orchestrator::LifecycleOrchestrator;
use crate::lifecycle::shutdown::Shutdown;

/// Spawn the signal listener. `on_reload` runs for every SIGHUP.
pub fn spawn_listener<F>(shutdown: Shutdown, on_reload: F) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(listen(shutdown, on_reload))
}

/// Log the remaining start budget for each shutdown signal that arrives
/// while the backend is still starting.
pub fn spawn_start_notice(
    mut rx: broadcast::Receiver<()>,
    orchestrator: Arc<LifecycleOrchestrator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return,
            }
            if let Some(remaining) = orchestrator.remaining_start_budget() {
                tracing::warn!(
                    remaining_secs = remaining.as_secs(),
                    "Backend start in progress, shutdown continues once it finishes or times out"
                );
            }
        }
    })
}

#[cfg(unix)]
async fn listen<F>(shutdown: Shutdown, on_reload: F)
where
    F: Fn() + Send + 'static,
{
    use tokio::signal::unix::{signal, SignalKind};

    let streams = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    );
    let (mut interrupt, mut terminate, mut hangup) = match streams {
        (Ok(i), Ok(t), Ok(h)) => (i, t, h),
        _ => {
            tracing::error!("Failed to install unix signal handlers, falling back to Ctrl+C only");
            return listen_ctrl_c(shutdown).await;
        }
    };

    let mut received = 0u32;
    loop {
        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = hangup.recv() => {
                tracing::info!(signal = "SIGHUP", "Reload signal received");
                on_reload();
                continue;
            }
        };

        received += 1;
        if received == 1 {
            tracing::info!(signal = name, "Shutdown signal received");
        } else {
            tracing::warn!(signal = name, "Shutdown already in progress");
        }
        shutdown.trigger();
    }
}

#[cfg(not(unix))]
async fn listen<F>(shutdown: Shutdown, _on_reload: F)
where
    F: Fn() + Send + 'static,
{
    listen_ctrl_c(shutdown).await
}

async fn listen_ctrl_c(shutdown: Shutdown) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    }
}

