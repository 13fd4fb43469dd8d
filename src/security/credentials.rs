//! Credentials read from the environment settings.
//!
//! Held behind an `ArcSwap` so a reload (SIGHUP) takes effect for the
//! next request without locking the request path.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::env::{EnvSettings, API_KEY, AUTH_LOGIN, AUTH_PASSWORD};

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub login: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl Credentials {
    pub fn from_env(env: &EnvSettings) -> Self {
        Self {
            login: env.get(AUTH_LOGIN),
            password: env.get(AUTH_PASSWORD),
            api_key: env.get(API_KEY),
        }
    }

    /// Password auth is enforced only when both login and password are set.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (self.login.as_deref(), self.password.as_deref()) {
            (Some(login), Some(password)) => Some((login, password)),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &redact(&self.password))
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

pub struct CredentialStore {
    current: ArcSwap<Credentials>,
}

impl CredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            current: ArcSwap::from_pointee(credentials),
        }
    }

    pub fn load(&self) -> Arc<Credentials> {
        self.current.load_full()
    }

    pub fn replace(&self, credentials: Credentials) {
        self.current.store(Arc::new(credentials));
    }

    /// Re-read the settings file and swap in the result.
    pub fn reload(&self, env: &EnvSettings) {
        let fresh = Credentials::from_env(&env.reread());
        tracing::info!(
            password_auth = fresh.basic_auth().is_some(),
            api_key = fresh.api_key.is_some(),
            "Credentials reloaded"
        );
        self.replace(fresh);
    }
}
