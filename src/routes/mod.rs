//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every request walks the same chain, outermost first: static assets,
//! session loading, auth derivation, the public routers, then the `/host`
//! gate and its protected router. Anything unmatched ends at the not-found
//! fallback. `/healthz` sits beside that chain and never touches sessions.

pub mod assets;
pub mod auth;
pub mod host;
pub mod middleware;
pub mod store;
pub mod upload;

use axum::Router;
use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::db::{ConnectError, ConnectionState};
use crate::services::home::HomeError;
use crate::services::session::SessionError;
use crate::state::AppState;
use crate::views;
use middleware::AuthState;

pub const PROTECTED_PREFIX: &str = "/host";

/// The full application router.
pub fn app(state: AppState) -> Router {
    let protected = host::router(state.upload_max_bytes);
    assemble(state, protected)
}

/// Wrap `protected` in the login gate under `/host` and build the shared
/// middleware chain around it.
pub fn assemble(state: AppState, protected: Router<AppState>) -> Router {
    let protected = protected
        .fallback(not_found)
        .layer(from_fn(middleware::require_login));

    Router::new()
        .merge(auth::router())
        .merge(store::router())
        .nest(PROTECTED_PREFIX, protected)
        .fallback(not_found)
        .layer(from_fn(middleware::derive_auth))
        .layer(from_fn_with_state(state.clone(), middleware::load_session))
        .layer(from_fn_with_state(state.assets.clone(), assets::serve_static))
        // Outside the session layers: health checks never create sessions.
        .merge(Router::new().route("/healthz", get(healthz)))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn connect_error_to_status(err: &ConnectError) -> StatusCode {
    tracing::error!(error = %err, "database unavailable");
    StatusCode::SERVICE_UNAVAILABLE
}

pub(crate) fn session_error_to_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn home_error_to_status(err: &HomeError) -> StatusCode {
    match err {
        HomeError::NotFound(_) => StatusCode::NOT_FOUND,
        HomeError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HomeError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

pub(crate) fn not_found_page(auth: AuthState, path: &str) -> Response {
    (StatusCode::NOT_FOUND, Html(views::render_not_found(auth, path))).into_response()
}

async fn not_found(auth: AuthState, OriginalUri(uri): OriginalUri) -> Response {
    not_found_page(auth, uri.path())
}

async fn healthz(State(state): State<AppState>) -> StatusCode {
    match state.db.state() {
        ConnectionState::Connected => StatusCode::OK,
        ConnectionState::Disconnected | ConnectionState::Connecting => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
