//! Accounts: signup validation, password hashing, credential checks.

use serde::Deserialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const PASSWORD_COST: u32 = 12;
const MIN_PASSWORD_LEN: usize = 8;
const MIN_FIRST_NAME_LEN: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("invalid signup: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("email already registered")]
    EmailTaken,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    Guest,
    Host,
}

impl UserType {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "host" => Some(Self::Host),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Host => "host",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub user_type: String,
    pub terms: Option<String>,
}

/// A signup that passed validation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

/// User row returned from lookups.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_type: String,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return None;
    }
    if domain.starts_with('.') || domain.ends_with('.') || normalized.chars().any(char::is_whitespace) {
        return None;
    }
    Some(normalized)
}

fn is_name(value: &str) -> bool {
    value.chars().all(|c| c.is_alphabetic() || c == ' ')
}

/// Check every signup rule, collecting all failures.
///
/// # Errors
///
/// Returns `UserError::Invalid` with one message per failed rule.
pub fn validate_signup(form: &SignupForm) -> Result<NewUser, UserError> {
    let mut errors = Vec::new();

    let first_name = form.first_name.trim();
    if first_name.chars().count() < MIN_FIRST_NAME_LEN {
        errors.push("First name must be at least 2 characters long".to_owned());
    } else if !is_name(first_name) {
        errors.push("First name can only contain letters".to_owned());
    }

    let last_name = form.last_name.trim();
    if !is_name(last_name) {
        errors.push("Last name can only contain letters".to_owned());
    }

    let email = normalize_email(&form.email);
    if email.is_none() {
        errors.push("Please enter a valid email".to_owned());
    }

    let password = &form.password;
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("Password must be at least 8 characters long".to_owned());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_owned());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_owned());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_owned());
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        errors.push("Password must contain at least one special character".to_owned());
    }
    if form.confirm_password != form.password {
        errors.push("Passwords do not match".to_owned());
    }

    let user_type = UserType::parse(&form.user_type);
    if user_type.is_none() {
        errors.push("Please select a user type".to_owned());
    }

    if form.terms.as_deref().is_none_or(str::is_empty) {
        errors.push("Please accept the terms and conditions".to_owned());
    }

    match (email, user_type) {
        (Some(email), Some(user_type)) if errors.is_empty() => Ok(NewUser {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email,
            password: form.password.clone(),
            user_type,
        }),
        _ => Err(UserError::Invalid(errors)),
    }
}

/// Hash off the async executor; bcrypt is deliberately slow.
async fn hash_password(password: String) -> Result<String, UserError> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_COST)).await??)
}

async fn verify_password(password: String, hash: String) -> Result<bool, UserError> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

/// Insert a validated user, returning the new id.
///
/// # Errors
///
/// Returns `EmailTaken` on a duplicate email, or a hashing/database error.
pub async fn create_user(pool: &PgPool, user: NewUser) -> Result<Uuid, UserError> {
    let password_hash = hash_password(user.password).await?;

    let row = sqlx::query(
        r"INSERT INTO users (first_name, last_name, email, password_hash, user_type)
          VALUES ($1, $2, $3, $4, $5)
          RETURNING id",
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(password_hash)
    .bind(user.user_type.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => UserError::EmailTaken,
        other => UserError::Db(other),
    })?;

    let id: Uuid = row.get("id");
    tracing::info!(user_id = %id, user_type = user.user_type.as_str(), "user registered");
    Ok(id)
}

/// Check credentials, returning the user when they match.
///
/// # Errors
///
/// Returns an error if the lookup or hash verification fails.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<Option<UserRow>, UserError> {
    let Some(email) = normalize_email(email) else {
        return Ok(None);
    };

    let row = sqlx::query(
        "SELECT id, first_name, last_name, email, user_type, password_hash FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let hash: String = row.get("password_hash");
    if !verify_password(password.to_owned(), hash).await? {
        return Ok(None);
    }

    Ok(Some(UserRow {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        user_type: row.get("user_type"),
    }))
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
