// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use crate::models::ApiResponse;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Startup failures are fatal, store failures are per request.
/// Every variant renders the same `{success:false, error}` envelope.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Carries the raw message of the underlying store failure
    #[error("{0}")]
    StoreUnavailable(String),
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        BackendError::StoreUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::StoreUnavailable(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for BackendError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        BackendError::StoreUnavailable(format!("failed to sign credentials assertion: {}", err))
    }
}

/// Convert BackendError to HTTP response
impl ResponseError for BackendError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::failure(self.to_string()))
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn test_store_unavailable_renders_envelope() {
        let err = BackendError::StoreUnavailable("connection refused".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "connection refused"}));
    }

    #[test]
    fn test_store_unavailable_keeps_raw_message() {
        let err = BackendError::StoreUnavailable("relation \"users\" does not exist".to_string());
        assert_eq!(err.to_string(), "relation \"users\" does not exist");
    }

    #[test]
    fn test_sqlx_error_maps_to_store_unavailable() {
        let err: BackendError = sqlx::Error::PoolTimedOut.into();
        match err {
            BackendError::StoreUnavailable(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
