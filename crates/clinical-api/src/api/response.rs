//! API response envelope
//!
//! Every endpoint answers with the same JSON wrapper:
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Job retrieved successfully",
//!   "data": { "id": "..." },
//!   "timestamp": "2026-01-18T09:30:00.000Z"
//! }
//! ```
//!
//! Failures set `success` to `false`, omit `data` and may carry an `error`
//! detail string.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Standard response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// ISO-8601 UTC, millisecond precision
    pub timestamp: String,
}

pub(crate) fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new success response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
            timestamp: now_iso8601(),
        }
    }
}

impl ApiResponse<()> {
    /// Create a failure response without a payload
    pub fn failure(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error,
            timestamp: now_iso8601(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
