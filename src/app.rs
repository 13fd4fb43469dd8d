//! Application wiring shared by the server binary and the integration tests.

use std::sync::Arc;

use crate::config::{EnvSettings, GatewayConfig};
use crate::handlers::{AppServices, HandlerRegistration, HandlerRegistry, RegistryError, BUILTIN_HANDLERS};
use crate::http::{GitInfoSource, HttpServer, IndexPage};
use crate::lifecycle::LifecycleOrchestrator;
use crate::security::{CredentialStore, Credentials, SecurityState, SessionStore};

pub struct Gateway {
    credentials: Arc<CredentialStore>,
    server: HttpServer,
}

impl Gateway {
    /// Build with the built-in handlers.
    pub fn build(
        config: &GatewayConfig,
        env: &EnvSettings,
        orchestrator: Arc<LifecycleOrchestrator>,
        dockerized: bool,
        git: Arc<dyn GitInfoSource>,
    ) -> Result<Self, RegistryError> {
        Self::with_handlers(config, env, orchestrator, dockerized, git, BUILTIN_HANDLERS)
    }

    /// Build with an explicit handler table. Fails on duplicate or invalid
    /// route names, before anything is served.
    pub fn with_handlers(
        config: &GatewayConfig,
        env: &EnvSettings,
        orchestrator: Arc<LifecycleOrchestrator>,
        dockerized: bool,
        git: Arc<dyn GitInfoSource>,
        handlers: &[HandlerRegistration],
    ) -> Result<Self, RegistryError> {
        let credentials = Arc::new(CredentialStore::new(Credentials::from_env(env)));
        let security = SecurityState {
            credentials: credentials.clone(),
            sessions: SessionStore::from_config(&config.session),
            cookie_name: config.session.cookie_name.clone(),
        };
        let services = AppServices {
            orchestrator,
            security: security.clone(),
            dockerized,
        };

        let registry = HandlerRegistry::from_table(handlers, &services)?;
        let index = IndexPage::new(&config.webui.index_template, git);
        let server = HttpServer::new(&config.server, &registry, index, &security);

        Ok(Self {
            credentials,
            server,
        })
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn into_server(self) -> HttpServer {
        self.server
    }
}
