//! Host routes: listing management, mounted under `/host` behind the login
//! gate. Every query is scoped to the logged-in host's own homes.

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use super::middleware::{LoggedIn, found};
use super::upload::UploadForm;
use super::{connect_error_to_status, home_error_to_status};
use crate::services::home::{self, HomeError, HomeInput, HomeRow};
use crate::state::AppState;

const HOMES_PATH: &str = "/host/homes";

pub fn router(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/homes", get(list_homes).post(create_home))
        .route("/homes/{id}", get(edit_home).post(update_home))
        .route("/homes/{id}/delete", post(delete_home))
        .layer(DefaultBodyLimit::max(upload_max_bytes))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub count: usize,
    pub homes: Vec<HomeRow>,
}

#[derive(Debug, Serialize)]
struct InvalidHome<'a> {
    errors: &'a [String],
}

fn home_error_response(err: &HomeError) -> Response {
    match err {
        HomeError::Invalid(errors) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(InvalidHome { errors })).into_response()
        }
        HomeError::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
        HomeError::Database(e) => {
            tracing::error!(error = %e, "host home query failed");
            home_error_to_status(err).into_response()
        }
    }
}

/// `GET /host/dashboard`
pub async fn dashboard(State(state): State<AppState>, host: LoggedIn) -> Response {
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => return connect_error_to_status(&e).into_response(),
    };
    match home::list_host_homes(&pool, host.user_id).await {
        Ok(homes) => Json(DashboardResponse { count: homes.len(), homes }).into_response(),
        Err(e) => home_error_response(&e),
    }
}

/// `GET /host/homes`
pub async fn list_homes(State(state): State<AppState>, host: LoggedIn) -> Response {
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => return connect_error_to_status(&e).into_response(),
    };
    match home::list_host_homes(&pool, host.user_id).await {
        Ok(homes) => Json(homes).into_response(),
        Err(e) => home_error_response(&e),
    }
}

/// `GET /host/homes/{id}`
pub async fn edit_home(State(state): State<AppState>, host: LoggedIn, Path(home_id): Path<Uuid>) -> Response {
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => return connect_error_to_status(&e).into_response(),
    };
    match home::get_host_home(&pool, host.user_id, home_id).await {
        Ok(home) => Json(home).into_response(),
        Err(e) => home_error_response(&e),
    }
}

/// `POST /host/homes`: the stored photo is discarded if the insert fails.
pub async fn create_home(State(state): State<AppState>, host: LoggedIn, form: UploadForm) -> Response {
    let input = match HomeInput::from_fields(&form.fields) {
        Ok(input) => input,
        Err(e) => {
            form.discard(&state).await;
            return home_error_response(&e);
        }
    };
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => {
            form.discard(&state).await;
            return connect_error_to_status(&e).into_response();
        }
    };

    match home::create_home(&pool, host.user_id, &input, form.photo_url()).await {
        Ok(_) => found(HOMES_PATH),
        Err(e) => {
            form.discard(&state).await;
            home_error_response(&e)
        }
    }
}

/// `POST /host/homes/{id}`: a new photo replaces and removes the old file.
pub async fn update_home(
    State(state): State<AppState>,
    host: LoggedIn,
    Path(home_id): Path<Uuid>,
    form: UploadForm,
) -> Response {
    let input = match HomeInput::from_fields(&form.fields) {
        Ok(input) => input,
        Err(e) => {
            form.discard(&state).await;
            return home_error_response(&e);
        }
    };
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => {
            form.discard(&state).await;
            return connect_error_to_status(&e).into_response();
        }
    };

    match home::update_home(&pool, host.user_id, home_id, &input, form.photo_url()).await {
        Ok(updated) => {
            if let Some(old) = updated.replaced_photo {
                state.uploads.remove(&old).await;
            }
            tracing::info!(home_id = %updated.home.id, host_id = %host.user_id, "home updated");
            found(HOMES_PATH)
        }
        Err(e) => {
            form.discard(&state).await;
            home_error_response(&e)
        }
    }
}

/// `POST /host/homes/{id}/delete`
pub async fn delete_home(State(state): State<AppState>, host: LoggedIn, Path(home_id): Path<Uuid>) -> Response {
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => return connect_error_to_status(&e).into_response(),
    };
    match home::delete_home(&pool, host.user_id, home_id).await {
        Ok(photo) => {
            if let Some(photo) = photo {
                state.uploads.remove(&photo).await;
            }
            tracing::info!(%home_id, host_id = %host.user_id, "home deleted");
            found(HOMES_PATH)
        }
        Err(e) => home_error_response(&e),
    }
}

#[cfg(test)]
#[path = "host_test.rs"]
mod tests;
