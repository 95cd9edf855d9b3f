//! HTTP error handling
//!
//! Every failure leaves the server as the same JSON shape:
//! `{ "message": ..., "code": ..., "details"?: ... }`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use nodetree_core::models::ValidationError;
use nodetree_core::services::{ErrorKind, TreeServiceError};
use serde::{Deserialize, Serialize};

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const NODE_NOT_FOUND: &str = "NODE_NOT_FOUND";
pub const CONFLICT: &str = "CONFLICT";
pub const TREE_TOO_DEEP: &str = "TREE_TOO_DEEP";
pub const DATABASE_ERROR: &str = "DATABASE_ERROR";

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            NODE_NOT_FOUND => StatusCode::NOT_FOUND,
            CONFLICT => StatusCode::CONFLICT,
            TREE_TOO_DEEP => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<TreeServiceError> for HttpError {
    fn from(err: TreeServiceError) -> Self {
        match err.kind() {
            ErrorKind::Validation => HttpError::new(err.to_string(), VALIDATION_ERROR),
            ErrorKind::NotFound => HttpError::new(err.to_string(), NODE_NOT_FOUND),
            ErrorKind::Conflict => HttpError::new(err.to_string(), CONFLICT),
            ErrorKind::Limit => HttpError::new(err.to_string(), TREE_TOO_DEEP),
            ErrorKind::Storage => {
                tracing::error!("❌ Storage failure: {:?}", err);
                HttpError::with_details("Database operation failed", DATABASE_ERROR, err.to_string())
            }
        }
    }
}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        TreeServiceError::from(err).into()
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::InvalidBody(rejection.body_text()).into()
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        ValidationError::InvalidId(rejection.body_text()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodetree_core::models::DepthLimitExceeded;

    #[test]
    fn test_service_errors_map_to_status() {
        let cases = [
            (
                TreeServiceError::from(ValidationError::EmptyTitle),
                StatusCode::BAD_REQUEST,
            ),
            (TreeServiceError::not_found(3), StatusCode::NOT_FOUND),
            (TreeServiceError::root_exists(), StatusCode::CONFLICT),
            (TreeServiceError::has_children(2), StatusCode::CONFLICT),
            (
                TreeServiceError::from(DepthLimitExceeded { max_depth: 8 }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(HttpError::from(err).status(), status);
        }
    }

    #[test]
    fn test_invalid_id_message() {
        let err = HttpError::from(ValidationError::InvalidId("abc".to_string()));
        assert_eq!(err.code, VALIDATION_ERROR);
        assert_eq!(err.message, "Validation failed: Invalid node ID: abc");
    }

    #[test]
    fn test_unknown_code_is_internal_error() {
        let err = HttpError::new("boom", "SOMETHING_ELSE");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
