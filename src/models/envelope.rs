// src/models/envelope.rs
// DOCUMENTATION: Uniform JSON wrapper for API responses
// PURPOSE: `{success, data}` on success, `{success, error}` on failure

use serde::Serialize;

/// API response envelope
/// DOCUMENTATION: `data` is only present when `success` is true,
/// `error` only when it is false
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
