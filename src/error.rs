//! Error handling and custom error types
//!
//! Provides unified error handling across the relay using thiserror. Every
//! variant maps onto an HTTP status so handlers can return `Result` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("File {0} processing failed")]
    ProcessingFailed(String),

    #[error("File {name} processing timed out after {attempts} status checks")]
    ProcessingTimeout { name: String, attempts: usize },

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingField(_) | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to browser clients. Upstream failures can carry
    /// provider error bodies, so they only reach the log.
    pub fn public_message(&self) -> String {
        match self {
            Error::Http(_) | Error::AiProvider(_) | Error::Serialization(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
