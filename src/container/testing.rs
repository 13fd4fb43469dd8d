//! In-memory engine for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::container::engine::{ContainerEngine, ContainerInfo, EngineError};
use crate::container::spec::ServiceSpec;

#[derive(Default)]
struct FakeState {
    unreachable: bool,
    image: bool,
    container: Option<ContainerInfo>,
    calls: Vec<&'static str>,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        let engine = Self::default();
        engine.state.lock().unwrap().unreachable = true;
        engine
    }

    pub fn with_image(self) -> Self {
        self.set_image_present();
        self
    }

    pub fn with_container(self, running: bool) -> Self {
        self.state.lock().unwrap().container = Some(ContainerInfo {
            id: "existing-id".to_string(),
            running,
        });
        self
    }

    pub fn set_image_present(&self) {
        self.state.lock().unwrap().image = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: &'static str) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        if self.record("ping").unreachable {
            return Err(EngineError::Api("connection refused".to_string()));
        }
        Ok(())
    }

    async fn image_exists(&self, _image: &str) -> Result<bool, EngineError> {
        Ok(self.record("image_exists").image)
    }

    async fn pull_image(&self, _image: &str) -> Result<(), EngineError> {
        self.record("pull").image = true;
        Ok(())
    }

    async fn inspect_container(&self, _name: &str) -> Result<Option<ContainerInfo>, EngineError> {
        Ok(self.record("inspect").container.clone())
    }

    async fn create_container(&self, _name: &str, _spec: &ServiceSpec) -> Result<String, EngineError> {
        let mut state = self.record("create");
        state.container = Some(ContainerInfo {
            id: "fake-id".to_string(),
            running: false,
        });
        Ok("fake-id".to_string())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        match self.record("start").container.as_mut() {
            Some(info) => {
                info.running = true;
                Ok(())
            }
            None => Err(EngineError::NotFound(id.to_string())),
        }
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        match self.record("stop").container.as_mut() {
            Some(info) => {
                info.running = false;
                Ok(())
            }
            None => Err(EngineError::NotFound(id.to_string())),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        match self.record("remove").container.take() {
            Some(_) => Ok(()),
            None => Err(EngineError::NotFound(id.to_string())),
        }
    }
}
