//! Server-side sessions holding CSRF tokens.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::RngCore;

use crate::config::SessionConfig;

#[derive(Debug, Clone)]
pub struct Session {
    pub csrf_token: String,
    pub created_at: Instant,
}

/// Session id → session. Cloning shares the map.
///
/// Sessions expire `ttl` after creation. Expired entries are pruned
/// whenever a session is created, and the store never holds more than
/// `max_sessions`; past that the oldest session is evicted.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::with_limits(Duration::from_secs(config.ttl_secs), config.max_sessions)
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        session.created_at.elapsed() >= self.ttl
    }

    /// Token for the session `id`, if the session exists and is live.
    pub fn csrf_token(&self, id: &str) -> Option<String> {
        let session = self.sessions.get(id)?;
        if !self.is_expired(&session) {
            return Some(session.csrf_token.clone());
        }
        drop(session);
        self.sessions.remove(id);
        None
    }

    /// Return `(session_id, token)`, reusing `existing` when it names a
    /// live session and creating a fresh one otherwise.
    pub fn get_or_create(&self, existing: Option<&str>) -> (String, String) {
        if let Some(id) = existing {
            if let Some(token) = self.csrf_token(id) {
                return (id.to_string(), token);
            }
        }

        self.prune();

        let id = uuid::Uuid::new_v4().simple().to_string();
        let token = generate_token();
        self.sessions.insert(
            id.clone(),
            Session {
                csrf_token: token.clone(),
                created_at: Instant::now(),
            },
        );
        tracing::debug!(sessions = self.sessions.len(), "Session created");
        (id, token)
    }

    /// Drop expired sessions, then evict the oldest until there is room
    /// for one more.
    fn prune(&self) {
        let ttl = self.ttl;
        self.sessions.retain(|_, session| session.created_at.elapsed() < ttl);

        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(id) => {
                    self.sessions.remove(&id);
                    tracing::debug!("Evicted oldest session");
                }
                None => break,
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
