//! Process settings parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` (if present) and builds one `Settings` value before
//! anything else starts. Only presence and parse checks happen here; a
//! missing database URL is not rejected and surfaces later as a connection
//! failure from the lifecycle guard.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_SECRET: &str = "fallback_secret";
pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_UPLOAD_DIR: &str = "public/uploads";
pub const DEFAULT_UPLOAD_FIELD: &str = "photo";
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 336;
pub const DEFAULT_SESSION_REAP_INTERVAL_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Which backend keeps session documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Connection string; `None` defers the failure to the first connect.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub session_secret: String,
    pub session_backend: SessionBackend,
    pub session_ttl_hours: i64,
    pub session_reap_interval_secs: u64,
    pub cookie_secure: bool,
    pub port: u16,
    pub public_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub upload_field: String,
    pub upload_max_bytes: usize,
}

impl Settings {
    /// Build settings from the process environment.
    ///
    /// `DATABASE_URL` is preferred; `MONGO_URI` is still honored for older
    /// deployment manifests.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` or `SESSION_STORE` is set to something that
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("MONGO_URI"))
            .ok()
            .filter(|v| !v.trim().is_empty());

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("SESSION_SECRET not set; using the built-in fallback secret");
                DEFAULT_SESSION_SECRET.to_owned()
            }
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => parse_port(&raw)?,
            Err(_) => DEFAULT_PORT,
        };

        let session_backend = parse_session_backend(std::env::var("SESSION_STORE").ok().as_deref())?;

        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            session_secret,
            session_backend,
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS),
            session_reap_interval_secs: env_parse("SESSION_REAP_INTERVAL_SECS", DEFAULT_SESSION_REAP_INTERVAL_SECS),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            port,
            public_dir: env_path("PUBLIC_DIR", DEFAULT_PUBLIC_DIR),
            upload_dir: env_path("UPLOAD_DIR", DEFAULT_UPLOAD_DIR),
            upload_field: std::env::var("UPLOAD_FIELD").unwrap_or_else(|_| DEFAULT_UPLOAD_FIELD.to_owned()),
            upload_max_bytes: env_parse("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES),
        })
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw.to_owned() })
}

fn parse_session_backend(raw: Option<&str>) -> Result<SessionBackend, ConfigError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "postgres") => Ok(SessionBackend::Postgres),
        Some("memory") => Ok(SessionBackend::Memory),
        Some(other) => Err(ConfigError::Invalid { var: "SESSION_STORE", value: other.to_owned() }),
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map_or_else(|_| PathBuf::from(default), PathBuf::from)
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
