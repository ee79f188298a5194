//! Database connector and migration runner.
//!
//! SYSTEM CONTEXT
//! ==============
//! The lifecycle guard calls `PgConnector::connect` at most once per
//! successful process lifetime. Migrations run as part of that connect so
//! the schema is in place before any handler touches a table.

pub mod lifecycle;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use lifecycle::{ConnectionGuard, ConnectionState, Connector};

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("no database URL configured (set DATABASE_URL)")]
    MissingUrl,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Production connector: opens a `PostgreSQL` pool and applies migrations.
pub struct PgConnector {
    database_url: Option<String>,
    max_connections: u32,
}

impl PgConnector {
    #[must_use]
    pub fn new(database_url: Option<String>, max_connections: u32) -> Self {
        Self { database_url, max_connections }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self) -> Result<PgPool, ConnectError> {
        let url = self.database_url.as_deref().ok_or(ConnectError::MissingUrl)?;
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(url)
            .await?;

        sqlx::migrate!("src/db/migrations").run(&pool).await?;

        Ok(pool)
    }
}
