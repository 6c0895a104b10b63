//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto HTTP responses.

use crate::config::ConfigError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docsum_core::{AuthError, PipelineError, PortError, StageError, SummarizeError};
use serde_json::json;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Bad input shape, type or size.
    #[error("{0}")]
    Validation(String),

    /// Wrong email or password on login.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Malformed or mistyped JSON bodies are reported like any other bad input.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// The detail of an internal error, attached to the response so that the
/// development-mode middleware can expose it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

const INTERNAL_MESSAGE: &str = "Internal server error";

impl ApiError {
    /// The status code and public message for this error. `None` as the message
    /// means the details are hidden behind a generic internal error.
    fn status_and_message(&self) -> (StatusCode, Option<String>) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, Some(self.to_string())),
            ApiError::Auth(AuthError::Store(_)) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            ApiError::Auth(e) => (StatusCode::UNAUTHORIZED, Some(e.to_string())),
            ApiError::Port(e) | ApiError::Pipeline(PipelineError::Store(e)) => port_status(e),
            ApiError::Pipeline(e) => pipeline_status(e),
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        }
    }
}

fn port_status(err: &PortError) -> (StatusCode, Option<String>) {
    match err {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
        // Duplicate emails are reported as a plain bad request.
        PortError::Conflict(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
        PortError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
    }
}

fn pipeline_status(err: &PipelineError) -> (StatusCode, Option<String>) {
    match err {
        PipelineError::Validation(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
        PipelineError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
        PipelineError::Forbidden => (StatusCode::FORBIDDEN, Some("Access denied".to_string())),
        PipelineError::FileMissing(_) => (
            StatusCode::NOT_FOUND,
            Some("Document file not found on the server".to_string()),
        ),
        PipelineError::Stage(StageError::Io(_)) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        PipelineError::Stage(e) => (StatusCode::BAD_REQUEST, Some(e.to_string())),
        PipelineError::Summarization { source, .. } => match source {
            SummarizeError::FileMissing(_) => (
                StatusCode::NOT_FOUND,
                Some("Document file not found on the server".to_string()),
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(format!("Error while generating the summary: {}", other)),
            ),
        },
        PipelineError::Store(e) => port_status(e),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed with {}: {:?}", status, self);
        }

        match message {
            Some(message) => (status, Json(json!({ "message": message }))).into_response(),
            None => {
                let mut response =
                    (status, Json(json!({ "message": INTERNAL_MESSAGE }))).into_response();
                response
                    .extensions_mut()
                    .insert(ErrorDetail(self.to_string()));
                response
            }
        }
    }
}
