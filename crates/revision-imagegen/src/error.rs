use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImageGenError>;

/// Everything that can go wrong while serving a generation request
///
/// Input problems map to 400. Every other failure maps to 500 and carries
/// its display string to the caller.
#[derive(Debug, Error)]
pub enum ImageGenError {
    /// The `image` file part or the `prompt` field is absent
    #[error("Missing image or prompt")]
    MissingField,

    /// The `image` part carries an empty (or unusable) filename
    #[error("No selected file")]
    EmptyFilename,

    /// The request body could not be read as a multipart form
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The `strength` field is not a finite float
    #[error("could not convert strength to float: '{value}' ({reason})")]
    InvalidStrength { value: String, reason: String },

    /// Writing or re-reading the uploaded file failed
    #[error("Upload storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Missing, invalid, or rejected API token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Provider API returned a non-success status
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The prediction reached a failed or canceled state
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// The prediction did not reach a terminal state in time
    #[error("Prediction did not finish within {0:?}")]
    Timeout(Duration),

    /// The provider answered with something we could not interpret
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ImageGenError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField | Self::EmptyFilename | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidStrength { .. }
            | Self::Storage(_)
            | Self::AuthenticationFailed(_)
            | Self::ProviderApiError { .. }
            | Self::ConnectionError(_)
            | Self::PredictionFailed(_)
            | Self::Timeout(_)
            | Self::InvalidResponse(_)
            | Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body: `{"error": "<message>"}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ImageGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody { error: self.to_string() };

        (status, Json(body)).into_response()
    }
}
