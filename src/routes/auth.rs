//! Auth routes: login, logout and signup pages.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use serde::Deserialize;
use uuid::Uuid;

use super::middleware::{AuthState, LOGIN_PATH, SESSION_COOKIE, SessionHandle, found, session_cookie};
use super::{connect_error_to_status, session_error_to_status};
use crate::services::user::{self, SignupForm, UserError};
use crate::state::AppState;
use crate::views;

const LOGIN_FAILED: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email is already registered";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/signup", get(signup_page).post(signup))
}

pub(crate) fn user_error_to_status(err: &UserError) -> StatusCode {
    match err {
        UserError::Invalid(_) | UserError::EmailTaken => StatusCode::UNPROCESSABLE_ENTITY,
        UserError::Hash(_) | UserError::Join(_) | UserError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `GET /login`
pub async fn login_page(auth: AuthState) -> Html<String> {
    Html(views::render_login(auth, "", &[]))
}

/// `POST /login`: verify credentials and mark the session logged in.
pub async fn login(
    State(state): State<AppState>,
    auth: AuthState,
    jar: SignedCookieJar,
    session: SessionHandle,
    Form(form): Form<LoginForm>,
) -> Response {
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => return connect_error_to_status(&e).into_response(),
    };

    match user::authenticate(&pool, &form.email, &form.password).await {
        Ok(Some(user)) => complete_login(&state, jar, &session, user.id).await,
        Ok(None) => {
            let html = views::render_login(auth, &form.email, &[LOGIN_FAILED.to_owned()]);
            (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "login lookup failed");
            user_error_to_status(&e).into_response()
        }
    }
}

/// Move the user onto a freshly issued session id and send its cookie. The
/// pre-login id is dropped so a planted cookie never becomes authenticated.
pub(crate) async fn complete_login(
    state: &AppState,
    jar: SignedCookieJar,
    session: &SessionHandle,
    user_id: Uuid,
) -> Response {
    match session.log_in(user_id, state.session_ttl).await {
        Ok(record) => {
            tracing::info!(%user_id, "user logged in");
            (jar.add(session_cookie(&record, state)), found("/")).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to store login");
            session_error_to_status(&e).into_response()
        }
    }
}

/// `POST /logout`: destroy the session and clear its cookie.
pub async fn logout(jar: SignedCookieJar, session: Option<SessionHandle>) -> Response {
    if let Some(session) = session {
        if let Err(e) = session.destroy().await {
            tracing::warn!(error = %e, "session destroy failed");
        }
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, found(LOGIN_PATH)).into_response()
}

/// `GET /signup`
pub async fn signup_page(auth: AuthState) -> Html<String> {
    Html(views::render_signup(auth, &SignupForm::default(), &[]))
}

/// `POST /signup`: validate, hash and insert a new user.
pub async fn signup(State(state): State<AppState>, auth: AuthState, Form(form): Form<SignupForm>) -> Response {
    let rejected = |errors: &[String]| {
        let html = views::render_signup(auth, &form, errors);
        (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
    };

    let new_user = match user::validate_signup(&form) {
        Ok(new_user) => new_user,
        Err(UserError::Invalid(errors)) => return rejected(&errors),
        Err(e) => return user_error_to_status(&e).into_response(),
    };

    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => return connect_error_to_status(&e).into_response(),
    };

    match user::create_user(&pool, new_user).await {
        Ok(user_id) => {
            tracing::info!(%user_id, "user signed up");
            found(LOGIN_PATH)
        }
        Err(UserError::EmailTaken) => rejected(&[EMAIL_TAKEN.to_owned()]),
        Err(e) => {
            tracing::error!(error = %e, "signup failed");
            user_error_to_status(&e).into_response()
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
