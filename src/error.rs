//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup-time and bind-time failures. These abort registration before the
/// server starts serving; they are never retried and never reach a client.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("method is required")]
    MissingMethod,
    #[error("invalid http method: '{0}'")]
    InvalidMethod(String),
    #[error("path is required and must start with '/': '{0}'")]
    InvalidPath(String),
    #[error("handler is required for {method} {path}")]
    MissingHandler { method: String, path: String },
    #[error("route already registered: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("invalid base path: {0}")]
    InvalidBasePath(String),
    #[error("database is not configured (set AppConfig.database)")]
    DatabaseNotConfigured,
    #[error("openapi: {0}")]
    OpenApi(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Facade-level runtime errors (construction, listen).
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request failure, rendered as the JSON error envelope
/// `{"error": <message>, "code": <status>}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Handler-level failure: always 500 regardless of underlying cause.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<crate::collection::StoreError> for AppError {
    fn from(err: crate::collection::StoreError) -> Self {
        match err {
            crate::collection::StoreError::Db(e) => AppError::Db(e),
            other => AppError::Config(ConfigError::Validation(other.to_string())),
        }
    }
}

impl From<crate::collection::StoreError> for ApiError {
    fn from(err: crate::collection::StoreError) -> Self {
        ApiError::internal(err.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}
