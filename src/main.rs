// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, store clients, and start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use config::{Config, DEFAULT_LOG_FILTER};
use db::UserRepository;
use dotenv::dotenv;
use services::{CredentialSource, FirestoreClient, TokenProvider, UserStores};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", DEFAULT_LOG_FILTER);
    }
    env_logger::init();

    // 3. Load configuration; a missing project id aborts before binding
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}. Set FIREBASE_PROJECT_ID and GOOGLE_APPLICATION_CREDENTIALS.", e);
            std::process::exit(1);
        }
    };

    log::info!("Starting FRAME backend...");
    log::info!("Firestore project: {}", config.firebase_project_id);

    // 4. Build store clients
    let firestore = build_firestore_client(&config);
    let pool = config::init_db_pool(&config.pg);
    let stores = web::Data::new(UserStores::new(
        Arc::new(firestore),
        Arc::new(UserRepository::new(pool)),
    ));

    // 5. Start HTTP server
    let server_addr = config.server_address();
    log::info!("🚀 FRAME backend running on http://{}", server_addr);

    HttpServer::new(move || {
        App::new()
            // Application state (store clients)
            .app_data(stores.clone())
            .app_data(handlers::json_config())
            // Middleware
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::users_config)
    })
    .bind(&server_addr)?
    .run()
    .await
}

/// Firestore client against the emulator when configured, otherwise
/// production with Application Default Credentials
fn build_firestore_client(config: &Config) -> FirestoreClient {
    let http = reqwest::Client::new();

    match &config.firestore_emulator_host {
        Some(host) => {
            log::info!("Using Firestore emulator at {}", host);
            let auth = TokenProvider::new(http.clone(), CredentialSource::Static("owner".to_string()));
            FirestoreClient::with_base_url(
                http,
                format!("http://{}", host),
                config.firebase_project_id.clone(),
                auth,
            )
        }
        None => {
            let home = std::env::var_os("HOME").map(PathBuf::from);
            let source = CredentialSource::resolve(config.google_credentials_path.clone(), home);
            log::info!("Google credentials source: {:?}", source);
            let auth = TokenProvider::new(http.clone(), source);
            FirestoreClient::new(http, config.firebase_project_id.clone(), auth)
        }
    }
}
