//! Error handling for the API.
//!
//! Two layers, kept deliberately small:
//!
//! 1. Internal, per-concern errors (`ValidationError`, `HashingError`,
//!    plus `StoreError` and `NotifyError` owned by their modules) carrying
//!    detail for server-side logs.
//! 2. The public `ApiError` contract: the `{status, message}` JSON body and
//!    HTTP status code a client actually sees. Server faults are reported
//!    generically, never with internal detail.

use axum::{http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::db::store::StoreError;

/// Field validation failures, in the order the validator applies them.
/// The `Display` strings are the exact user-facing messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required.")]
    MissingFields,
    #[error("Invalid email address.")]
    InvalidEmail,
    #[error("Invalid phone number.")]
    InvalidPhone,
    #[error("Password must be at least 6 characters long.")]
    PasswordTooShort,
}

/// Password hashing failure. Always fatal to the request; a plaintext
/// password must never reach the store.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(pub String);

/// API error response structure.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_error")
    pub status: String,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Creates a validation error (400 Bad Request).
    pub fn validation_error(msg: &str) -> Self {
        ApiError {
            status: "validation_error".to_string(),
            message: msg.to_string(),
        }
    }

    /// Creates an internal server error (500 Internal Server Error).
    pub fn internal_error(msg: &str) -> Self {
        ApiError {
            status: "internal_error".to_string(),
            message: msg.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => ApiError::validation_error("Email already registered."),
            // Transport/query detail stays in the server log
            StoreError::Pool(_) | StoreError::Query(_) => {
                ApiError::internal_error("Failed to read from the database.")
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.status.as_str() {
            "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::to_string(&self).unwrap_or_else(|_| {
            r#"{"status":"internal_error","message":"Server error."}"#.to_string()
        });
        axum::response::Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(axum::body::boxed(axum::body::Body::from(body)))
            .expect("static response parts are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::MissingFields.to_string(),
            "All fields are required."
        );
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "Password must be at least 6 characters long."
        );
    }

    #[test]
    fn test_store_error_mapping_hides_internal_detail() {
        let api: ApiError = StoreError::Query("SQLITE_BUSY at row 7".to_string()).into();
        assert_eq!(api.status, "internal_error");
        assert!(!api.message.contains("SQLITE_BUSY"));

        let dup: ApiError = StoreError::DuplicateEmail.into();
        assert_eq!(dup.status, "validation_error");
        assert_eq!(dup.message, "Email already registered.");
    }
}
