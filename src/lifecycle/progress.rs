//! Image download progress reporting.
//!
//! Runs as a detached task while the orchestrator is `Starting`. It only
//! logs; nothing waits for it, and it stops on its own once the image is
//! present or the orchestrator settles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::container::engine::ContainerEngine;
use crate::lifecycle::orchestrator::{LifecyclePhase, LifecycleSnapshot};

pub struct ProgressNotifier {
    engine: Arc<dyn ContainerEngine>,
    image: String,
    interval: Duration,
}

impl ProgressNotifier {
    pub fn new(engine: Arc<dyn ContainerEngine>, image: impl Into<String>, interval: Duration) -> Self {
        Self {
            engine,
            image: image.into(),
            interval,
        }
    }

    pub fn spawn(self, phase: watch::Receiver<LifecycleSnapshot>) -> JoinHandle<()> {
        tokio::spawn(self.run(phase))
    }

    async fn run(self, mut phase: watch::Receiver<LifecycleSnapshot>) {
        match self.engine.image_exists(&self.image).await {
            Ok(true) => {
                tracing::info!(image = %self.image, "Image already present locally");
                return;
            }
            Ok(false) => {
                tracing::info!(
                    image = %self.image,
                    "Image not found locally, downloading; this is a large download (several GB), please be patient"
                );
            }
            Err(e) => {
                tracing::warn!(image = %self.image, error = %e, "Cannot check image status, progress reporting disabled");
                return;
            }
        }

        let started = Instant::now();
        let mut last_status = String::new();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = phase.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }

            if phase.borrow().phase != LifecyclePhase::Starting {
                tracing::debug!("Orchestrator settled, stopping download progress");
                return;
            }

            match self.engine.image_exists(&self.image).await {
                Ok(true) => {
                    tracing::info!(
                        image = %self.image,
                        took = %format_elapsed(started.elapsed()),
                        "Image download completed"
                    );
                    return;
                }
                _ => {
                    let status = format_elapsed(started.elapsed());
                    if status != last_status {
                        tracing::info!(elapsed = %status, "Downloading image...");
                        last_status = status;
                    }
                }
            }
        }
    }
}

/// `Xm Ys`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testing::FakeEngine;

    fn starting() -> (watch::Sender<LifecycleSnapshot>, watch::Receiver<LifecycleSnapshot>) {
        watch::channel(LifecycleSnapshot::new(LifecyclePhase::Starting, None))
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0m 0s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
    }

    #[tokio::test]
    async fn test_returns_immediately_when_image_present() {
        let engine = Arc::new(FakeEngine::new().with_image());
        let (_tx, rx) = starting();

        let handle = ProgressNotifier::new(engine.clone(), "img", Duration::from_secs(3600)).spawn(rx);
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(engine.calls(), vec!["image_exists"]);
    }

    #[tokio::test]
    async fn test_stops_when_image_arrives() {
        let engine = Arc::new(FakeEngine::new());
        let (_tx, rx) = starting();

        let handle = ProgressNotifier::new(engine.clone(), "img", Duration::from_millis(20)).spawn(rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        engine.set_image_present();
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_orchestrator_settles() {
        let engine = Arc::new(FakeEngine::new());
        let (tx, rx) = starting();

        let handle = ProgressNotifier::new(engine, "img", Duration::from_secs(3600)).spawn(rx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send_replace(LifecycleSnapshot::new(LifecyclePhase::Idle, None));
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }
}
