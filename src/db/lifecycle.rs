//! Connection lifecycle guard.
//!
//! DESIGN
//! ======
//! One `ConnectionGuard` is built by `main` and shared through `AppState`.
//! The first successful `ensure_connected` memoizes the pool; every later
//! call returns a clone of it without I/O. Attempts are single-flight:
//! concurrent callers wait on the attempt already in progress instead of
//! racing their own. A failed attempt leaves the guard `Disconnected` so the
//! next caller tries again.
//!
//! The connector sits behind a trait so tests can count connects without a
//! live database.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use super::ConnectError;

/// Opens the underlying database pool.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<PgPool, ConnectError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct ConnectionGuard {
    connector: Arc<dyn Connector>,
    pool: OnceCell<PgPool>,
    connecting: AtomicBool,
    attempts: AtomicU64,
}

impl ConnectionGuard {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector, pool: OnceCell::new(), connecting: AtomicBool::new(false), attempts: AtomicU64::new(0) }
    }

    /// Return the shared pool, connecting first if no attempt has succeeded yet.
    ///
    /// # Errors
    ///
    /// Returns the connector's error when this call had to connect and the
    /// attempt failed. The failure is logged here; callers decide whether it
    /// is fatal.
    pub async fn ensure_connected(&self) -> Result<PgPool, ConnectError> {
        self.pool.get_or_try_init(|| self.attempt()).await.cloned()
    }

    /// Current lifecycle state. Never performs I/O.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.pool.initialized() {
            ConnectionState::Connected
        } else if self.connecting.load(Ordering::Acquire) {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Number of real connect attempts made so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    async fn attempt(&self) -> Result<PgPool, ConnectError> {
        let _in_flight = InFlight::enter(&self.connecting);
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;

        match self.connector.connect().await {
            Ok(pool) => {
                tracing::info!(attempt, "connected to database");
                Ok(pool)
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "database connection failed");
                Err(e)
            }
        }
    }
}

/// Clears the in-flight flag on every exit path, including cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
