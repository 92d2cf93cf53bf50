//! API response envelope.
//!
//! Every body, success or failure, has the same shape:
//! ```json
//! { "code": "OK", "message": "Success", "data": { ... } }
//! ```

use axum::Json;
use serde::{Deserialize, Serialize};

/// Response code for successful requests.
pub const CODE_OK: &str = "OK";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// `OK`, or an error code such as `NOT_FOUND`
    pub code: String,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::ok_with_message(data, "Success")
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            code: CODE_OK.to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiResponse {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }
}

/// `Json(ApiResponse::ok(data))`
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

/// `Json(ApiResponse::ok_with_message(data, message))`
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok_with_message(data, message))
}
