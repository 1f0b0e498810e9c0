// src/config/db.rs
// DOCUMENTATION: Database connection pool initialization
// PURPOSE: Setup and manage PostgreSQL connection pool

use crate::config::PgSettings;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

/// Build the connect options for the configured server
pub fn connect_options(settings: &PgSettings) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .database(&settings.database)
        .ssl_mode(settings.ssl_mode);

    if settings.password.is_empty() {
        options
    } else {
        options.password(&settings.password)
    }
}

/// Initialize PostgreSQL connection pool
/// DOCUMENTATION: Called once during application startup in main.rs.
/// Connections are opened on first use, so an unreachable server fails
/// requests instead of startup.
pub fn init_db_pool(settings: &PgSettings) -> PgPool {
    log::info!(
        "Initializing database pool: {}@{}:{}/{} (sslmode={:?})",
        settings.user,
        settings.host,
        settings.port,
        settings.database,
        settings.ssl_mode
    );

    if !settings.verifies_certificate() {
        log::warn!(
            "PG_SSL_MODE={:?} does not verify the server certificate",
            settings.ssl_mode
        );
    }

    PgPoolOptions::new()
        // Maximum concurrent connections
        .max_connections(settings.max_connections)
        // Timeout waiting for connection from pool
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        // Connection idle timeout (5 minutes)
        .idle_timeout(Duration::from_secs(300))
        // Connection lifetime (30 minutes before recycle)
        .max_lifetime(Duration::from_secs(1800))
        .connect_lazy_with(connect_options(settings))
}
