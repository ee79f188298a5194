//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and middleware via the `State`
//! extractor. It owns the connection guard (never a global), the session
//! store, the upload store and the cookie-signing key. Clone is required by
//! Axum; all inner fields are Arc-wrapped or cheap to clone.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use sqlx::PgPool;

use crate::config::Settings;
use crate::db::{ConnectError, ConnectionGuard};
use crate::routes::assets::StaticAssets;
use crate::services::session::SessionStore;
use crate::services::upload::{PUBLIC_PREFIX, UploadStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<ConnectionGuard>,
    pub sessions: Arc<dyn SessionStore>,
    pub uploads: UploadStore,
    pub assets: StaticAssets,
    pub cookie_key: Key,
    pub cookie_secure: bool,
    pub session_ttl: time::Duration,
    pub upload_max_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(settings: &Settings, db: Arc<ConnectionGuard>, sessions: Arc<dyn SessionStore>) -> Self {
        let assets = StaticAssets::new()
            .mount(PUBLIC_PREFIX, &settings.upload_dir)
            .mount("/", &settings.public_dir);

        Self {
            db,
            sessions,
            uploads: UploadStore::new(&settings.upload_dir, settings.upload_field.clone()),
            assets,
            cookie_key: cookie_key(&settings.session_secret),
            cookie_secure: settings.cookie_secure,
            session_ttl: time::Duration::hours(settings.session_ttl_hours),
            upload_max_bytes: settings.upload_max_bytes,
        }
    }

    /// Shared database pool, connecting on first use.
    ///
    /// # Errors
    ///
    /// Returns the connection error if the database is unreachable.
    pub async fn pool(&self) -> Result<PgPool, ConnectError> {
        self.db.ensure_connected().await
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive the 64-byte cookie signing key from an arbitrary-length secret.
#[must_use]
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
