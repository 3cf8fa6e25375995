//! Server-side login sessions
//!
//! A session id is handed to the browser in the session cookie and maps to
//! the logged-in principal. Every successful lookup extends the session by
//! the full TTL.
//!
//! ## Storage Backends
//!
//! - **Redis**: `SET EX` on create, `GETEX` on lookup, so sessions survive
//!   restarts and are shared between replicas.
//! - **Memory**: a map with per-entry deadlines, for single-instance setups
//!   and tests.

use base64::Engine;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::Principal;
use crate::Result;

/// Key prefix appended to the configured Redis namespace
const SESSION_KEY_PREFIX: &str = "session:";
/// Session id length in bytes (256 bits of entropy)
const SESSION_ID_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub principal: Principal,
    /// Unix timestamp of the login
    pub created_at: i64,
}

#[derive(Debug, Clone)]
struct MemorySessionEntry {
    data: SessionData,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct MemorySessionStore {
    sessions: HashMap<String, MemorySessionEntry>,
}

impl MemorySessionStore {
    fn insert(&mut self, id: String, data: SessionData, ttl: Duration) {
        let now = Instant::now();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        self.sessions.insert(
            id,
            MemorySessionEntry {
                data,
                expires_at: now + ttl,
            },
        );
    }

    fn get_and_touch(&mut self, id: &str, ttl: Duration) -> Option<SessionData> {
        let now = Instant::now();
        match self.sessions.get_mut(id) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + ttl;
                Some(entry.data.clone())
            }
            Some(_) => {
                self.sessions.remove(id);
                None
            }
            None => None,
        }
    }

    fn remove(&mut self, id: &str) {
        self.sessions.remove(id);
    }
}

/// Session store backed by Redis, or by process memory when Redis is not
/// configured
#[derive(Clone)]
pub struct SessionStore {
    redis_client: Option<Client>,
    memory_store: Option<Arc<RwLock<MemorySessionStore>>>,
    key_prefix: String,
    ttl: Duration,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("redis_enabled", &self.redis_client.is_some())
            .field("memory_mode", &self.memory_store.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionStore {
    /// Redis-backed store. Keys are `<namespace>session:<id>`.
    #[must_use]
    pub fn with_redis(redis_client: Client, namespace: &str, ttl_secs: u64) -> Self {
        Self {
            redis_client: Some(redis_client),
            memory_store: None,
            key_prefix: format!("{namespace}{SESSION_KEY_PREFIX}"),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// In-memory store
    #[must_use]
    pub fn with_memory(ttl_secs: u64) -> Self {
        Self {
            redis_client: None,
            memory_store: Some(Arc::new(RwLock::new(MemorySessionStore::default()))),
            key_prefix: SESSION_KEY_PREFIX.to_string(),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Session lifetime, also used as the cookie `Max-Age`
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for the principal and return its id
    pub async fn create(&self, principal: &Principal) -> Result<String> {
        let session_id = Self::generate_session_id();
        let data = SessionData {
            principal: principal.clone(),
            created_at: chrono::Utc::now().timestamp(),
        };

        if let Some(ref client) = self.redis_client {
            let key = self.key(&session_id);
            let json = serde_json::to_string(&data)?;
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: () = conn.set_ex(&key, json, self.ttl.as_secs()).await?;

            debug!(user_id = %principal.user_id, mode = "redis", "Session created");
        } else if let Some(ref store) = self.memory_store {
            store
                .write()
                .await
                .insert(session_id.clone(), data, self.ttl);

            debug!(user_id = %principal.user_id, mode = "memory", "Session created");
        }

        Ok(session_id)
    }

    /// Look up a session and extend it by the full TTL
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionData>> {
        if session_id.is_empty() {
            return Ok(None);
        }

        if let Some(ref client) = self.redis_client {
            let key = self.key(session_id);
            let mut conn = client.get_multiplexed_async_connection().await?;
            let json: Option<String> = redis::cmd("GETEX")
                .arg(&key)
                .arg("EX")
                .arg(self.ttl.as_secs())
                .query_async(&mut conn)
                .await?;

            return match json {
                Some(json) => match serde_json::from_str(&json) {
                    Ok(data) => Ok(Some(data)),
                    Err(e) => {
                        warn!(error = %e, "Discarding unreadable session");
                        let _: () = conn.del(&key).await?;
                        Ok(None)
                    }
                },
                None => Ok(None),
            };
        }

        if let Some(ref store) = self.memory_store {
            return Ok(store.write().await.get_and_touch(session_id, self.ttl));
        }

        Ok(None)
    }

    /// End a session. Unknown ids are ignored.
    pub async fn destroy(&self, session_id: &str) -> Result<()> {
        if let Some(ref client) = self.redis_client {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: () = conn.del(self.key(session_id)).await?;
        } else if let Some(ref store) = self.memory_store {
            store.write().await.remove(session_id);
        }

        debug!("Session destroyed");
        Ok(())
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{session_id}", self.key_prefix)
    }

    fn generate_session_id() -> String {
        let bytes: [u8; SESSION_ID_LENGTH] = rand::random();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}
