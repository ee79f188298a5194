//! Session documents and their stores.
//!
//! ARCHITECTURE
//! ============
//! A session is keyed by an opaque random token that travels in a signed
//! cookie. The record itself lives server-side: in the `sessions` table for
//! production, or in a process-local map when `SESSION_STORE=memory`.
//! Handlers never talk to a store directly; they go through the
//! `SessionHandle` the session middleware attaches to each request.
//!
//! TRADE-OFFS
//! ==========
//! Writes are whole-record upserts, so concurrent requests on one session
//! are last-write-wins. Expired rows are filtered on read and removed by a
//! periodic reaper rather than on every request.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use sqlx::Row;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::{ConnectError, ConnectionGuard};

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex session id.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(#[from] ConnectError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Server-side session document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: Option<Uuid>,
    pub is_logged_in: bool,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    /// A new, anonymous session that expires after `ttl`.
    #[must_use]
    pub fn fresh(ttl: time::Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self { id: generate_token(), user_id: None, is_logged_in: false, created_at: now, expires_at: now + ttl }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Mark this session as belonging to `user_id`.
    pub fn log_in(&mut self, user_id: Uuid) {
        self.user_id = Some(user_id);
        self.is_logged_in = true;
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch an unexpired session by id.
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError>;
    /// Insert or replace a session.
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError>;
    /// Remove a session. Removing a missing id is not an error.
    async fn destroy(&self, id: &str) -> Result<(), SessionError>;
    /// Delete every expired session, returning how many were removed.
    async fn reap_expired(&self) -> Result<u64, SessionError>;
}

// =============================================================================
// POSTGRES STORE
// =============================================================================

pub struct PgSessionStore {
    db: Arc<ConnectionGuard>,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(db: Arc<ConnectionGuard>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        let pool = self.db.ensure_connected().await?;
        let row = sqlx::query(
            r"SELECT token, user_id, is_logged_in, created_at, expires_at
              FROM sessions
              WHERE token = $1 AND expires_at > now()",
        )
        .bind(id)
        .fetch_optional(&pool)
        .await?;

        Ok(row.map(|r| SessionRecord {
            id: r.get("token"),
            user_id: r.get("user_id"),
            is_logged_in: r.get("is_logged_in"),
            created_at: r.get("created_at"),
            expires_at: r.get("expires_at"),
        }))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let pool = self.db.ensure_connected().await?;
        sqlx::query(
            r"INSERT INTO sessions (token, user_id, is_logged_in, created_at, expires_at)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (token) DO UPDATE
              SET user_id = EXCLUDED.user_id,
                  is_logged_in = EXCLUDED.is_logged_in,
                  expires_at = EXCLUDED.expires_at",
        )
        .bind(&record.id)
        .bind(record.user_id)
        .bind(record.is_logged_in)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        let pool = self.db.ensure_connected().await?;
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(id)
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn reap_expired(&self) -> Result<u64, SessionError> {
        let pool = self.db.ensure_connected().await?;
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store for development without a database.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        let sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = OffsetDateTime::now_utc();
        Ok(sessions.get(id).filter(|r| !r.is_expired_at(now)).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(id);
        Ok(())
    }

    async fn reap_expired(&self) -> Result<u64, SessionError> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = OffsetDateTime::now_utc();
        let before = sessions.len();
        sessions.retain(|_, r| !r.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}

// =============================================================================
// REAPER
// =============================================================================

/// Spawn the background task that prunes expired sessions.
pub fn spawn_session_reaper(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tracing::info!(interval_secs = interval.as_secs(), "session reaper configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match store.reap_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "reaped expired sessions"),
                Err(e) => tracing::warn!(error = %e, "session reap failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
