// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::CommentError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (e.g., editing someone else's comment)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., stored reply chain forms a cycle)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Maps service failures onto HTTP semantics so handlers can use `?`.
impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::ThreadNotFound { .. }
            | CommentError::ParentNotFound { .. }
            | CommentError::CommentNotFound { .. } => AppError::NotFound(err.to_string()),
            CommentError::CycleDetected { .. } => AppError::Conflict(err.to_string()),
            CommentError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
            CommentError::EmptyBody | CommentError::BodyTooLong { .. } => {
                AppError::BadRequest(err.to_string())
            }
            CommentError::Internal(e) => AppError::InternalServerError(format!("{:#}", e)),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_http_statuses() {
        let cases = [
            (CommentError::ThreadNotFound { thread_id: 1 }, StatusCode::NOT_FOUND),
            (CommentError::ParentNotFound { parent_id: 999 }, StatusCode::NOT_FOUND),
            (CommentError::CommentNotFound { comment_id: 3 }, StatusCode::NOT_FOUND),
            (CommentError::CycleDetected { comment_id: 3 }, StatusCode::CONFLICT),
            (
                CommentError::Forbidden {
                    comment_id: 3,
                    actor: "mallory".to_string(),
                },
                StatusCode::FORBIDDEN,
            ),
            (CommentError::EmptyBody, StatusCode::BAD_REQUEST),
            (CommentError::BodyTooLong { max: 1000 }, StatusCode::BAD_REQUEST),
            (
                CommentError::Internal(anyhow::anyhow!("pool timed out")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
