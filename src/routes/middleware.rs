//! Session loading, auth-state derivation and the protected-prefix gate.
//!
//! ORDERING
//! ========
//! The stack must run `load_session` → `derive_auth` → `require_login`.
//! The gate only reads `AuthState`; if it ran before the session layer it
//! would see `Anonymous` for every request and redirect everyone.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use uuid::Uuid;

use crate::services::session::{SessionError, SessionRecord, SessionStore};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sid";
pub const LOGIN_PATH: &str = "/login";

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

// =============================================================================
// SESSION
// =============================================================================

/// The current request's session, attached by `load_session`.
#[derive(Clone)]
pub struct SessionHandle {
    record: SessionRecord,
    store: Arc<dyn SessionStore>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(record: SessionRecord, store: Arc<dyn SessionStore>) -> Self {
        Self { record, store }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    #[must_use]
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Start an authenticated session for `user_id` under a new id and drop
    /// this one. The caller must send the returned record's cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the new session cannot be stored.
    pub async fn log_in(&self, user_id: Uuid, ttl: time::Duration) -> Result<SessionRecord, SessionError> {
        let mut rotated = SessionRecord::fresh(ttl);
        rotated.log_in(user_id);
        self.store.save(&rotated).await?;
        if let Err(e) = self.store.destroy(&self.record.id).await {
            tracing::warn!(error = %e, "failed to drop pre-login session");
        }
        Ok(rotated)
    }

    /// Remove this session from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        self.store.destroy(&self.record.id).await
    }
}

/// Handlers that write to the session get `503` when none was attached.
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

impl<S> OptionalFromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned())
    }
}

pub(crate) fn session_cookie(record: &SessionRecord, state: &AppState) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, record.id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .max_age(state.session_ttl)
        .build()
}

/// Middleware: resolve the signed `sid` cookie to a session, creating one
/// for clients that have none.
///
/// Store failures are logged and the request continues without a session,
/// which downstream stages treat as anonymous.
pub async fn load_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let jar = SignedCookieJar::from_headers(request.headers(), state.cookie_key.clone());
    let presented = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned());

    let existing = match presented.as_deref() {
        Some(id) => match state.sessions.load(id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "session load failed; continuing anonymously");
                return next.run(request).await;
            }
        },
        None => None,
    };

    let (record, created) = match existing {
        Some(record) => (record, false),
        None => {
            let record = SessionRecord::fresh(state.session_ttl);
            if let Err(e) = state.sessions.save(&record).await {
                tracing::warn!(error = %e, "session create failed; continuing anonymously");
                return next.run(request).await;
            }
            (record, true)
        }
    };

    let cookie = created.then(|| session_cookie(&record, &state));
    request
        .extensions_mut()
        .insert(SessionHandle::new(record, state.sessions.clone()));

    let response = next.run(request).await;
    match cookie {
        Some(cookie) if !sets_session_cookie(&response) => (jar.add(cookie), response).into_response(),
        _ => response,
    }
}

/// Whether a handler already wrote (or cleared) the session cookie.
fn sets_session_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|c| c.split_once('=').is_some_and(|(name, _)| name.trim() == SESSION_COOKIE))
}

// =============================================================================
// AUTH STATE
// =============================================================================

/// Per-request authentication, derived once from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    Authenticated {
        user_id: Uuid,
    },
    #[default]
    Anonymous,
}

impl AuthState {
    /// A session counts as authenticated only with both the flag and a user.
    #[must_use]
    pub fn from_session(record: Option<&SessionRecord>) -> Self {
        match record {
            Some(SessionRecord { is_logged_in: true, user_id: Some(user_id), .. }) => {
                Self::Authenticated { user_id: *user_id }
            }
            _ => Self::Anonymous,
        }
    }

    #[must_use]
    pub fn is_logged_in(self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub fn user_id(self) -> Option<Uuid> {
        match self {
            Self::Authenticated { user_id } => Some(user_id),
            Self::Anonymous => None,
        }
    }
}

impl<S> FromRequestParts<S> for AuthState
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().copied().unwrap_or_default())
    }
}

/// Middleware: attach `AuthState` for every later stage. Never fails.
pub async fn derive_auth(mut request: Request, next: Next) -> Response {
    let auth = AuthState::from_session(request.extensions().get::<SessionHandle>().map(SessionHandle::record));
    request.extensions_mut().insert(auth);
    next.run(request).await
}

// =============================================================================
// GATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Denied,
}

#[must_use]
pub fn gate(auth: AuthState) -> GateDecision {
    if auth.is_logged_in() { GateDecision::Allowed } else { GateDecision::Denied }
}

/// Middleware for the protected prefix: forward logged-in requests,
/// redirect everyone else to the login page.
pub async fn require_login(request: Request, next: Next) -> Response {
    let auth = request.extensions().get::<AuthState>().copied().unwrap_or_default();
    match gate(auth) {
        GateDecision::Allowed => next.run(request).await,
        GateDecision::Denied => {
            tracing::debug!(path = %request.uri().path(), "anonymous request to protected path");
            found(LOGIN_PATH)
        }
    }
}

/// Handler parameter for pages that need a user outside the protected prefix.
pub struct LoggedIn {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for LoggedIn
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthState>().copied().unwrap_or_default() {
            AuthState::Authenticated { user_id } => Ok(Self { user_id }),
            AuthState::Anonymous => Err(found(LOGIN_PATH)),
        }
    }
}

#[cfg(test)]
#[path = "middleware_test.rs"]
mod tests;
