mod config;
mod db;
mod routes;
mod services;
mod state;
mod views;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use config::{SessionBackend, Settings};
use db::{ConnectionGuard, PgConnector};
use services::session::{MemorySessionStore, PgSessionStore, SessionStore, spawn_session_reaper};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let connector = PgConnector::new(settings.database_url.clone(), settings.db_max_connections);
    let db = Arc::new(ConnectionGuard::new(Arc::new(connector)));

    // The listener only starts once the database is reachable.
    if let Err(e) = db.ensure_connected().await {
        tracing::error!(error = %e, "database connection failed; not starting listener");
        return ExitCode::FAILURE;
    }
    tracing::info!(attempts = db.attempts(), "database connected");

    let sessions: Arc<dyn SessionStore> = match settings.session_backend {
        SessionBackend::Postgres => Arc::new(PgSessionStore::new(db.clone())),
        SessionBackend::Memory => {
            tracing::warn!("using in-memory session store; sessions are lost on restart");
            Arc::new(MemorySessionStore::new())
        }
    };
    let _reaper = spawn_session_reaper(
        sessions.clone(),
        Duration::from_secs(settings.session_reap_interval_secs),
    );

    if let Err(e) = tokio::fs::create_dir_all(&settings.upload_dir).await {
        tracing::error!(error = %e, dir = %settings.upload_dir.display(), "cannot create upload directory");
        return ExitCode::FAILURE;
    }

    let state = state::AppState::new(&settings, db, sessions);
    tracing::info!(
        dir = %state.uploads.dir().display(),
        field = state.uploads.field(),
        max_bytes = state.upload_max_bytes,
        "uploads enabled"
    );
    let app = routes::app(state);

    let port = settings.port;
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %port, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%port, "homestay listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
