//! API error types with IntoResponse
//!
//! Errors are converted to `{"error": <code>, "message": <text>}` JSON
//! bodies. Internal details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::DbError;
use crate::models::ValidationError;
use crate::storage::{SignatureError, StorageError};

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Input failed domain validation (422)
    Validation(ValidationError),

    /// Malformed request: bad JSON, path, or multipart (400)
    BadRequest { message: String },

    /// Missing or invalid credentials (401)
    Unauthorized { message: String },

    /// Authenticated but not allowed (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Request contradicts current state (409)
    Conflict { message: String },

    /// Operation deadline exceeded (504)
    Timeout { operation: &'static str },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::BadRequest { .. } => "bad_request",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Timeout { .. } => "timeout",
            Self::Database(_) | Self::Internal { .. } => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Conflict { message } => message.clone(),
            Self::Forbidden { reason } => reason.clone(),
            Self::NotFound { resource, id } => format!("{} '{}' not found", resource, id),
            Self::Timeout { operation } => format!("{} timed out", operation),
            Self::Database(_) | Self::Internal { .. } => "an internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => tracing::error!("Database error: {}", e),
            Self::Internal { message } => tracing::error!("Internal error: {}", message),
            _ => {}
        }

        let body = json!({
            "error": self.code(),
            "message": self.message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict(message) => Self::Conflict { message },
            DbError::Forbidden(reason) => Self::Forbidden { reason },
            DbError::Timeout { operation, .. } => Self::Timeout { operation },
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => Self::NotFound {
                resource: "object",
                id: key,
            },
            StorageError::InvalidKey(key) => Self::bad_request(format!("invalid object key '{}'", key)),
            StorageError::Io(e) => Self::internal(format!("storage IO: {}", e)),
        }
    }
}

impl From<SignatureError> for ApiError {
    fn from(e: SignatureError) -> Self {
        match e {
            SignatureError::OutOfRange => Self::internal(e.to_string()),
            SignatureError::Expired | SignatureError::Invalid => Self::Forbidden {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_is_422() {
        let (status, body) =
            body_json(ApiError::Validation(ValidationError::Empty { field: "name" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "name is required");
    }

    #[tokio::test]
    async fn db_errors_map_to_statuses() {
        let cases = [
            (DbError::not_found("recipe", 4), StatusCode::NOT_FOUND, "not_found"),
            (DbError::Conflict("dup".into()), StatusCode::CONFLICT, "conflict"),
            (DbError::Forbidden("nope".into()), StatusCode::FORBIDDEN, "forbidden"),
            (
                DbError::Timeout {
                    operation: "update_recipe",
                    after: Duration::from_secs(5),
                },
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
            ),
            (
                DbError::Sqlx(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (db, status, code) in cases {
            let (got_status, body) = body_json(ApiError::from(db)).await;
            assert_eq!(got_status, status);
            assert_eq!(body["error"], code);
        }
    }

    #[tokio::test]
    async fn not_found_message_names_resource() {
        let (_, body) = body_json(DbError::not_found("recipe", 4).into()).await;
        assert_eq!(body["message"], "recipe '4' not found");
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, body) = body_json(ApiError::internal("disk on fire")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "an internal error occurred");
    }

    #[tokio::test]
    async fn bad_signature_is_403() {
        let (status, _) = body_json(SignatureError::Expired.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = body_json(SignatureError::OutOfRange.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unauthorized_is_401() {
        let (status, body) = body_json(ApiError::unauthorized("login required")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }
}
