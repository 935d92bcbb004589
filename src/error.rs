//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Fatal configuration problems. Raised while building the binding table, never per request.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("model listed more than once: {0}")]
    DuplicateModel(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("invalid path segment for model {model}: '{segment}'")]
    InvalidPathSegment { model: String, segment: String },
    #[error("path segment '{0}' is taken by a common route; set a prefix or rename it")]
    ReservedPathSegment(String),
    #[error("invalid prefix: '{0}'")]
    InvalidPrefix(String),
    #[error("config load: {0}")]
    Load(String),
}

/// A query-string value that could not be decoded. Carries the offending pair for diagnostics.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed query parameter {key}={value}: {reason}")]
pub struct MalformedQuery {
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Category declared by the model layer for a failure. Drives the response status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unavailable,
    Internal,
}

/// Failure surfaced by a model-layer operation.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        ModelError {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Internal, message)
    }
}

impl From<sqlx::Error> for ModelError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => ModelError::not_found("row not found"),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                ModelError::conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ModelError::new(ModelErrorKind::Unavailable, e.to_string())
            }
            _ => ModelError::internal(e.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    MalformedQuery(#[from] MalformedQuery),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Status and machine-readable code for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::MalformedQuery(_) => (StatusCode::BAD_REQUEST, "malformed_query"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Model(e) => match e.kind {
                ModelErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error"),
                ModelErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                ModelErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
                ModelErrorKind::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
                ModelErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let message = if status.is_server_error() {
            // Log the real error, return a generic message
            tracing::error!(error = %self, code, "request failed");
            "an error occurred while processing the request".to_string()
        } else {
            self.to_string()
        };
        let details = match &self {
            AppError::MalformedQuery(q) => Some(serde_json::json!({
                "key": q.key,
                "value": q.value,
                "reason": q.reason,
            })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_kinds_map_to_nearest_status() {
        let cases = [
            (ModelErrorKind::Validation, StatusCode::BAD_REQUEST),
            (ModelErrorKind::NotFound, StatusCode::NOT_FOUND),
            (ModelErrorKind::Conflict, StatusCode::CONFLICT),
            (ModelErrorKind::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (ModelErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (kind, expected) in cases {
            let err = AppError::Model(ModelError::new(kind, "boom"));
            assert_eq!(err.status().0, expected, "{:?}", kind);
        }
    }

    #[test]
    fn malformed_query_is_bad_request_and_names_the_pair() {
        let err = AppError::from(MalformedQuery {
            key: "foo".into(),
            value: "not-json".into(),
            reason: "expected value".into(),
        });
        assert_eq!(err.status().0, StatusCode::BAD_REQUEST);
        let msg = err.to_string();
        assert!(msg.contains("foo=not-json"), "{}", msg);
    }

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = ModelError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, ModelErrorKind::Unavailable);
    }
}
