//! Home listings: form parsing and CRUD.
//!
//! DESIGN
//! ======
//! Browsing reads every listing; mutations are scoped to the owning host
//! (`host_id`). A home owned by someone else is reported as not found so
//! listing ids do not leak ownership.

use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const MAX_RATING: f64 = 5.0;
const HOME_COLUMNS: &str = "id, host_id, house_name, price, location, rating, photo, description";
const RETURNING_COLUMNS: &str = "homes.id, homes.host_id, homes.house_name, homes.price, homes.location, \
     homes.rating, homes.photo, homes.description";

#[derive(Debug, thiserror::Error)]
pub enum HomeError {
    #[error("home not found: {0}")]
    NotFound(Uuid),
    #[error("invalid home: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HomeRow {
    pub id: Uuid,
    pub host_id: Option<Uuid>,
    pub house_name: String,
    pub price: f64,
    pub location: String,
    pub rating: f64,
    pub photo: Option<String>,
    pub description: String,
}

/// Validated listing fields, without the photo.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeInput {
    pub house_name: String,
    pub price: f64,
    pub location: String,
    pub rating: f64,
    pub description: String,
}

fn text_field(fields: &HashMap<String, String>, key: &str) -> String {
    fields.get(key).map(|v| v.trim().to_owned()).unwrap_or_default()
}

fn number_field(fields: &HashMap<String, String>, key: &str) -> Option<f64> {
    fields
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl HomeInput {
    /// Parse submitted form fields.
    ///
    /// # Errors
    ///
    /// Returns `HomeError::Invalid` listing every missing or malformed field.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, HomeError> {
        let mut errors = Vec::new();

        let house_name = text_field(fields, "house_name");
        if house_name.is_empty() {
            errors.push("House name is required".to_owned());
        }
        let location = text_field(fields, "location");
        if location.is_empty() {
            errors.push("Location is required".to_owned());
        }

        let price = number_field(fields, "price");
        if price.is_none_or(|p| p < 0.0) {
            errors.push("Price must be a non-negative number".to_owned());
        }

        // An omitted rating means "not rated yet".
        let rating = match fields.get("rating").map(|v| v.trim()) {
            None | Some("") => Some(0.0),
            Some(_) => number_field(fields, "rating"),
        };
        if rating.is_none_or(|r| !(0.0..=MAX_RATING).contains(&r)) {
            errors.push("Rating must be between 0 and 5".to_owned());
        }

        match (price, rating) {
            (Some(price), Some(rating)) if errors.is_empty() => Ok(Self {
                house_name,
                price,
                location,
                rating,
                description: text_field(fields, "description"),
            }),
            _ => Err(HomeError::Invalid(errors)),
        }
    }
}

fn home_from_row(r: &PgRow) -> HomeRow {
    HomeRow {
        id: r.get("id"),
        host_id: r.get("host_id"),
        house_name: r.get("house_name"),
        price: r.get("price"),
        location: r.get("location"),
        rating: r.get("rating"),
        photo: r.get("photo"),
        description: r.get("description"),
    }
}

// =============================================================================
// BROWSING
// =============================================================================

/// List every home, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_homes(pool: &PgPool) -> Result<Vec<HomeRow>, HomeError> {
    let rows = sqlx::query(&format!("SELECT {HOME_COLUMNS} FROM homes ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(home_from_row).collect())
}

/// Fetch one home by id.
///
/// # Errors
///
/// Returns `NotFound` if no such home exists.
pub async fn get_home(pool: &PgPool, home_id: Uuid) -> Result<HomeRow, HomeError> {
    let row = sqlx::query(&format!("SELECT {HOME_COLUMNS} FROM homes WHERE id = $1"))
        .bind(home_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HomeError::NotFound(home_id))?;
    Ok(home_from_row(&row))
}

// =============================================================================
// HOSTING
// =============================================================================

/// List the homes owned by `host_id`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_host_homes(pool: &PgPool, host_id: Uuid) -> Result<Vec<HomeRow>, HomeError> {
    let rows = sqlx::query(&format!(
        "SELECT {HOME_COLUMNS} FROM homes WHERE host_id = $1 ORDER BY created_at DESC"
    ))
    .bind(host_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(home_from_row).collect())
}

/// Fetch a home only if `host_id` owns it.
///
/// # Errors
///
/// Returns `NotFound` if the home is missing or owned by another host.
pub async fn get_host_home(pool: &PgPool, host_id: Uuid, home_id: Uuid) -> Result<HomeRow, HomeError> {
    let row = sqlx::query(&format!("SELECT {HOME_COLUMNS} FROM homes WHERE id = $1 AND host_id = $2"))
        .bind(home_id)
        .bind(host_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HomeError::NotFound(home_id))?;
    Ok(home_from_row(&row))
}

/// Insert a listing for `host_id`.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_home(
    pool: &PgPool,
    host_id: Uuid,
    input: &HomeInput,
    photo: Option<&str>,
) -> Result<HomeRow, HomeError> {
    let row = sqlx::query(&format!(
        r"INSERT INTO homes (host_id, house_name, price, location, rating, photo, description)
          VALUES ($1, $2, $3, $4, $5, $6, $7)
          RETURNING {HOME_COLUMNS}"
    ))
    .bind(host_id)
    .bind(&input.house_name)
    .bind(input.price)
    .bind(&input.location)
    .bind(input.rating)
    .bind(photo)
    .bind(&input.description)
    .fetch_one(pool)
    .await?;

    let home = home_from_row(&row);
    tracing::info!(home_id = %home.id, %host_id, "home created");
    Ok(home)
}

/// Result of an edit: the new row and the photo URL it replaced, if any.
#[derive(Debug)]
pub struct UpdatedHome {
    pub home: HomeRow,
    pub replaced_photo: Option<String>,
}

/// Update a listing owned by `host_id`. `photo = None` keeps the current photo.
///
/// # Errors
///
/// Returns `NotFound` if the home is missing or owned by another host.
pub async fn update_home(
    pool: &PgPool,
    host_id: Uuid,
    home_id: Uuid,
    input: &HomeInput,
    photo: Option<&str>,
) -> Result<UpdatedHome, HomeError> {
    // Old photo is read under the row lock taken by this same statement.
    let row = sqlx::query(&format!(
        r"WITH old AS (
              SELECT photo FROM homes WHERE id = $1 AND host_id = $2 FOR UPDATE
          )
          UPDATE homes
          SET house_name = $3, price = $4, location = $5, rating = $6,
              photo = COALESCE($7, homes.photo), description = $8
          FROM old
          WHERE homes.id = $1 AND homes.host_id = $2
          RETURNING {RETURNING_COLUMNS}, old.photo AS old_photo"
    ))
    .bind(home_id)
    .bind(host_id)
    .bind(&input.house_name)
    .bind(input.price)
    .bind(&input.location)
    .bind(input.rating)
    .bind(photo)
    .bind(&input.description)
    .fetch_optional(pool)
    .await?
    .ok_or(HomeError::NotFound(home_id))?;

    let old_photo: Option<String> = row.get("old_photo");
    let replaced_photo = match (photo, old_photo) {
        (Some(new), Some(old)) if new != old => Some(old),
        _ => None,
    };

    Ok(UpdatedHome { home: home_from_row(&row), replaced_photo })
}

/// Delete a listing owned by `host_id`, returning its photo URL.
///
/// # Errors
///
/// Returns `NotFound` if the home is missing or owned by another host.
pub async fn delete_home(pool: &PgPool, host_id: Uuid, home_id: Uuid) -> Result<Option<String>, HomeError> {
    let row = sqlx::query("DELETE FROM homes WHERE id = $1 AND host_id = $2 RETURNING photo")
        .bind(home_id)
        .bind(host_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HomeError::NotFound(home_id))?;

    tracing::info!(%home_id, %host_id, "home deleted");
    Ok(row.get("photo"))
}

#[cfg(test)]
#[path = "home_test.rs"]
mod tests;
