// src/config/env.rs
// DOCUMENTATION: Environment variable management
// PURPOSE: Load and validate configuration from .env files

use crate::errors::BackendError;
use sqlx::postgres::PgSslMode;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Log filter used when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "info,actix_web=info,sqlx=warn";

/// PostgreSQL connection parameters
/// DOCUMENTATION: Mirrors the PG_* variables; unset values fall back to
/// libpq-style defaults
#[derive(Clone)]
pub struct PgSettings {
    pub user: String,
    pub host: String,
    pub database: String,
    pub password: String,
    pub port: u16,

    /// TLS policy. `require` encrypts without verifying the server
    /// certificate, which is what Cloud SQL deployments use.
    pub ssl_mode: PgSslMode,

    /// Maximum connections in pool
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl std::fmt::Debug for PgSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSettings")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl PgSettings {
    /// Whether the configured mode validates the server certificate
    pub fn verifies_certificate(&self) -> bool {
        matches!(self.ssl_mode, PgSslMode::VerifyCa | PgSslMode::VerifyFull)
    }
}

/// Application configuration loaded from environment variables
/// DOCUMENTATION: Centralizes all configuration in one struct
/// Load with Config::from_env() at application startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,

    /// Server listen port (default 8080)
    pub port: u16,

    /// Firestore project, required
    pub firebase_project_id: String,

    /// `host:port` of a local Firestore emulator
    pub firestore_emulator_host: Option<String>,

    /// Explicit GOOGLE_APPLICATION_CREDENTIALS key file
    pub google_credentials_path: Option<PathBuf>,

    pub pg: PgSettings,
}

impl Config {
    /// Load configuration from environment variables
    /// DOCUMENTATION: Reads the process environment; main loads .env first
    /// Called once at application startup
    pub fn from_env() -> Result<Self, BackendError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BackendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let firebase_project_id = var("FIREBASE_PROJECT_ID")
            .ok_or_else(|| BackendError::MissingConfig("FIREBASE_PROJECT_ID".to_string()))?;

        let user = var("PG_USER").unwrap_or_else(|| "postgres".to_string());
        let database = var("PG_DATABASE").unwrap_or_else(|| user.clone());

        Ok(Config {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var("PORT"), "PORT", 8080)?,
            firebase_project_id,
            firestore_emulator_host: var("FIRESTORE_EMULATOR_HOST"),
            google_credentials_path: var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            pg: PgSettings {
                user,
                host: var("PG_HOST").unwrap_or_else(|| "localhost".to_string()),
                database,
                password: var("PG_PASSWORD").unwrap_or_default(),
                port: parse_or(var("PG_PORT"), "PG_PORT", 5432)?,
                ssl_mode: parse_or(var("PG_SSL_MODE"), "PG_SSL_MODE", PgSslMode::Require)?,
                max_connections: parse_or(var("PG_MAX_CONNECTIONS"), "PG_MAX_CONNECTIONS", 10)?,
                acquire_timeout_secs: parse_or(
                    var("PG_ACQUIRE_TIMEOUT_SECS"),
                    "PG_ACQUIRE_TIMEOUT_SECS",
                    30,
                )?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, BackendError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BackendError::InvalidConfig(format!("{}={:?}", key, raw))),
        None => Ok(default),
    }
}
