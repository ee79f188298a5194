//! Per-user favourite homes.

use sqlx::PgPool;
use uuid::Uuid;

use super::home::{HomeError, HomeRow, get_home};

/// Homes the user marked as favourite, most recent first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_favourites(pool: &PgPool, user_id: Uuid) -> Result<Vec<HomeRow>, HomeError> {
    let rows = sqlx::query_as::<_, (Uuid, Option<Uuid>, String, f64, String, f64, Option<String>, String)>(
        r"SELECT h.id, h.host_id, h.house_name, h.price, h.location, h.rating, h.photo, h.description
          FROM favourites f
          JOIN homes h ON h.id = f.home_id
          WHERE f.user_id = $1
          ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, host_id, house_name, price, location, rating, photo, description)| HomeRow {
            id,
            host_id,
            house_name,
            price,
            location,
            rating,
            photo,
            description,
        })
        .collect())
}

/// Mark a home as favourite. Adding an existing favourite is a no-op.
///
/// # Errors
///
/// Returns `NotFound` if the home does not exist.
pub async fn add_favourite(pool: &PgPool, user_id: Uuid, home_id: Uuid) -> Result<(), HomeError> {
    get_home(pool, home_id).await?;
    sqlx::query("INSERT INTO favourites (user_id, home_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .bind(home_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove a favourite. Removing a missing favourite is a no-op.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn remove_favourite(pool: &PgPool, user_id: Uuid, home_id: Uuid) -> Result<(), HomeError> {
    sqlx::query("DELETE FROM favourites WHERE user_id = $1 AND home_id = $2")
        .bind(user_id)
        .bind(home_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "favourite_test.rs"]
mod tests;
