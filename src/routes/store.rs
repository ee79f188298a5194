//! Store routes: browsing homes and managing favourites.

use axum::extract::{OriginalUri, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::middleware::{AuthState, LoggedIn, found};
use super::{connect_error_to_status, home_error_to_status, not_found_page};
use crate::services::home::{self, HomeError, HomeRow};
use crate::services::favourite;
use crate::state::AppState;

const FAVOURITES_PATH: &str = "/favourites";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/homes", get(list_homes))
        .route("/homes/{id}", get(home_detail))
        .route(FAVOURITES_PATH, get(list_favourites).post(add_favourite))
        .route("/favourites/delete/{home_id}", post(remove_favourite))
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub is_logged_in: bool,
    pub homes: Vec<HomeRow>,
}

#[derive(Debug, Deserialize)]
pub struct FavouriteForm {
    pub home_id: Uuid,
}

fn log_home_error(err: &HomeError) -> StatusCode {
    if let HomeError::Database(e) = err {
        tracing::error!(error = %e, "home query failed");
    }
    home_error_to_status(err)
}

/// `GET /`
pub async fn index(State(state): State<AppState>, auth: AuthState) -> Result<Json<IndexResponse>, StatusCode> {
    let pool = state.pool().await.map_err(|e| connect_error_to_status(&e))?;
    let homes = home::list_homes(&pool).await.map_err(|e| log_home_error(&e))?;
    Ok(Json(IndexResponse { is_logged_in: auth.is_logged_in(), homes }))
}

/// `GET /homes`
pub async fn list_homes(State(state): State<AppState>) -> Result<Json<Vec<HomeRow>>, StatusCode> {
    let pool = state.pool().await.map_err(|e| connect_error_to_status(&e))?;
    let homes = home::list_homes(&pool).await.map_err(|e| log_home_error(&e))?;
    Ok(Json(homes))
}

/// `GET /homes/{id}`: unknown or malformed ids get the not-found page.
pub async fn home_detail(
    State(state): State<AppState>,
    auth: AuthState,
    Path(raw_id): Path<String>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let Ok(home_id) = Uuid::parse_str(&raw_id) else {
        return not_found_page(auth, uri.path());
    };
    let pool = match state.pool().await {
        Ok(pool) => pool,
        Err(e) => return connect_error_to_status(&e).into_response(),
    };
    match home::get_home(&pool, home_id).await {
        Ok(home) => Json(home).into_response(),
        Err(HomeError::NotFound(_)) => not_found_page(auth, uri.path()),
        Err(e) => log_home_error(&e).into_response(),
    }
}

/// `GET /favourites`
pub async fn list_favourites(State(state): State<AppState>, user: LoggedIn) -> Result<Json<Vec<HomeRow>>, StatusCode> {
    let pool = state.pool().await.map_err(|e| connect_error_to_status(&e))?;
    let homes = favourite::list_favourites(&pool, user.user_id)
        .await
        .map_err(|e| log_home_error(&e))?;
    Ok(Json(homes))
}

/// `POST /favourites`
pub async fn add_favourite(
    State(state): State<AppState>,
    user: LoggedIn,
    Form(form): Form<FavouriteForm>,
) -> Result<Response, StatusCode> {
    let pool = state.pool().await.map_err(|e| connect_error_to_status(&e))?;
    favourite::add_favourite(&pool, user.user_id, form.home_id)
        .await
        .map_err(|e| log_home_error(&e))?;
    Ok(found(FAVOURITES_PATH))
}

/// `POST /favourites/delete/{home_id}`
pub async fn remove_favourite(
    State(state): State<AppState>,
    user: LoggedIn,
    Path(home_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let pool = state.pool().await.map_err(|e| connect_error_to_status(&e))?;
    favourite::remove_favourite(&pool, user.user_id, home_id)
        .await
        .map_err(|e| log_home_error(&e))?;
    Ok(found(FAVOURITES_PATH))
}
