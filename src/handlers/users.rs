// src/handlers/users.rs
// DOCUMENTATION: HTTP handlers for user listings
// PURPOSE: Call the injected stores, wrap results in the response envelope

use crate::errors::BackendError;
use crate::models::ApiResponse;
use crate::services::{UserStore, UserStores};
use actix_web::{error::InternalError, web, HttpResponse};

/// Body size accepted by the JSON extractor
const JSON_LIMIT_BYTES: usize = 100 * 1024;

/// GET /api/firestore-users
/// Every document of the Firestore `users` collection
pub async fn firestore_users(stores: web::Data<UserStores>) -> Result<HttpResponse, BackendError> {
    list_from(stores.documents.as_ref()).await
}

/// GET /api/sql-users
/// First 10 rows of the PostgreSQL `users` table
pub async fn sql_users(stores: web::Data<UserStores>) -> Result<HttpResponse, BackendError> {
    list_from(stores.relational.as_ref()).await
}

async fn list_from(store: &dyn UserStore) -> Result<HttpResponse, BackendError> {
    let users = store.list_users().await.map_err(|err| {
        log::error!("❌ {} error: {}", store.name(), err);
        err
    })?;

    log::debug!("{} returned {} users", store.name(), users.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success(users)))
}

/// JSON body parsing for any route that extracts `web::Json`. The listing
/// routes read no body; a malformed body elsewhere gets the failure
/// envelope with status 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| {
            let body = ApiResponse::<()>::failure(err.to_string());
            InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        })
}

/// Configuration for user routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/firestore-users", web::get().to(firestore_users))
            .route("/sql-users", web::get().to(sql_users)),
    );
}
