//! Route name → handler table.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::handlers::{csrf, health, status, ApiHandler, AppServices, HandlerFactory};

/// Names the server mounts itself.
const RESERVED: &[&str] = &["mcp"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate route name: {0}")]
    DuplicateRoute(String),

    #[error("invalid route name: {0:?}")]
    InvalidRouteName(String),
}

#[derive(Clone, Copy)]
pub struct HandlerRegistration {
    pub name: &'static str,
    pub factory: HandlerFactory,
}

pub const BUILTIN_HANDLERS: &[HandlerRegistration] = &[
    HandlerRegistration {
        name: "health",
        factory: health::factory,
    },
    HandlerRegistration {
        name: "csrf_token",
        factory: csrf::factory,
    },
    HandlerRegistration {
        name: "service_status",
        factory: status::factory,
    },
    HandlerRegistration {
        name: "api_service_status",
        factory: status::api_factory,
    },
];

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn ApiHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every entry of `table`; the first duplicate or malformed name
    /// aborts.
    pub fn from_table(table: &[HandlerRegistration], services: &AppServices) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for entry in table {
            registry.register(entry.name, (entry.factory)(services))?;
        }
        tracing::info!(routes = ?registry.names(), "Handlers registered");
        Ok(registry)
    }

    pub fn builtin(services: &AppServices) -> Result<Self, RegistryError> {
        Self::from_table(BUILTIN_HANDLERS, services)
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ApiHandler>) -> Result<(), RegistryError> {
        let name = name.into();
        if !is_valid_route_name(&name) {
            return Err(RegistryError::InvalidRouteName(name));
        }
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::DuplicateRoute(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ApiHandler>> {
        self.handlers.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ApiHandler>)> {
        self.handlers.iter().map(|(name, handler)| (name.as_str(), handler))
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

/// One path segment of `[A-Za-z0-9_-]`, not reserved.
fn is_valid_route_name(name: &str) -> bool {
    !name.is_empty()
        && !RESERVED.contains(&name)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;
    use crate::lifecycle::LifecycleOrchestrator;
    use crate::security::{CredentialStore, Credentials, SecurityState, SessionStore};
    use axum::http::Method;

    fn services() -> AppServices {
        let cwd = std::env::temp_dir();
        AppServices {
            orchestrator: Arc::new(LifecycleOrchestrator::from_config(&ServiceConfig::default(), &cwd, false)),
            security: SecurityState {
                credentials: Arc::new(CredentialStore::new(Credentials::default())),
                sessions: SessionStore::new(),
                cookie_name: "session_id".into(),
            },
            dockerized: false,
        }
    }

    #[test]
    fn test_builtin_routes() {
        let registry = HandlerRegistry::builtin(&services()).unwrap();
        assert_eq!(
            registry.names(),
            vec!["api_service_status", "csrf_token", "health", "service_status"]
        );

        let health = registry.get("health").unwrap();
        assert_eq!(health.methods(), vec![Method::GET]);
        assert!(!health.requirements().needs_password_auth);

        let api = registry.get("api_service_status").unwrap();
        assert_eq!(api.methods(), vec![Method::POST]);
        assert!(api.requirements().needs_api_key);
        assert!(!api.requirements().needs_csrf);
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let table = [
            HandlerRegistration {
                name: "health",
                factory: health::factory,
            },
            HandlerRegistration {
                name: "health",
                factory: status::factory,
            },
        ];
        let err = HandlerRegistry::from_table(&table, &services()).err().unwrap();
        assert_eq!(err, RegistryError::DuplicateRoute("health".into()));
    }

    #[test]
    fn test_invalid_route_names() {
        let services = services();
        let mut registry = HandlerRegistry::new();
        for name in ["", "a/b", "mcp", "with space"] {
            assert_eq!(
                registry.register(name, health::factory(&services)).err(),
                Some(RegistryError::InvalidRouteName(name.into()))
            );
        }
        assert!(registry.register("load-settings_2", health::factory(&services)).is_ok());
    }
}
