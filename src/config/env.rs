//! Environment-file settings (`.env`).
//!
//! Values come from the process environment first, then from the file.
//! The file is parsed with dotenvy but never written into the process
//! environment, so it can be re-read on SIGHUP without side effects.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::schema::ServerConfig;

pub const AUTH_LOGIN: &str = "AUTH_LOGIN";
pub const AUTH_PASSWORD: &str = "AUTH_PASSWORD";
pub const API_KEY: &str = "API_KEY";
pub const WEB_UI_HOST: &str = "WEB_UI_HOST";
pub const WEB_UI_PORT: &str = "WEB_UI_PORT";

/// Snapshot of an environment file layered under the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    path: Option<PathBuf>,
    values: HashMap<String, String>,
    use_process_env: bool,
}

impl EnvSettings {
    /// Read `path`. A missing file yields an empty snapshot; a malformed
    /// one is logged and treated the same way.
    pub fn read(path: &Path) -> Self {
        let mut values = HashMap::new();
        match dotenvy::from_path_iter(path) {
            Ok(iter) => {
                for item in iter {
                    match item {
                        Ok((key, value)) => {
                            values.insert(key, value);
                        }
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "Skipping malformed env line");
                        }
                    }
                }
                tracing::debug!(path = %path.display(), entries = values.len(), "Environment file loaded");
            }
            Err(e) if e.not_found() => {
                tracing::debug!(path = %path.display(), "No environment file");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read environment file");
            }
        }

        Self {
            path: Some(path.to_path_buf()),
            values,
            use_process_env: true,
        }
    }

    /// Settings from explicit pairs only, ignoring the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            path: None,
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            use_process_env: false,
        }
    }

    /// Re-read the backing file, if any.
    pub fn reread(&self) -> Self {
        match &self.path {
            Some(path) => Self::read(path),
            None => self.clone(),
        }
    }

    /// Look up `key`. Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let from_process = if self.use_process_env {
            std::env::var(key).ok()
        } else {
            None
        };
        from_process
            .or_else(|| self.values.get(key).cloned())
            .filter(|v| !v.is_empty())
    }
}

/// Listen address. Precedence: CLI, then `WEB_UI_HOST` / `WEB_UI_PORT`,
/// then the config file.
pub fn resolve_bind(
    cli_host: Option<&str>,
    cli_port: Option<u16>,
    env: &EnvSettings,
    server: &ServerConfig,
) -> (String, u16) {
    let host = cli_host
        .map(ToString::to_string)
        .or_else(|| env.get(WEB_UI_HOST))
        .unwrap_or_else(|| server.host.clone());

    let env_port = env.get(WEB_UI_PORT).and_then(|raw| match raw.parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            tracing::warn!(value = %raw, "Ignoring invalid WEB_UI_PORT");
            None
        }
    });
    let port = cli_port.or(env_port).unwrap_or(server.port);

    (host, port)
}
