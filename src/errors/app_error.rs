//! HTTP-facing errors of the credential broker.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// Errors returned by broker handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// `OPENAI_API_KEY` is not configured
    #[error("Missing OpenAI API key")]
    MissingApiKey,

    /// Provider answered with a non-2xx status; passed through as-is
    #[error("Upstream returned {status}")]
    Upstream { status: StatusCode, body: Value },

    /// Provider unreachable or answered with something unparsable
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MissingApiKey => {
                error!("Token requested but OPENAI_API_KEY is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Missing OpenAI API key. Please configure OPENAI_API_KEY."
                    })),
                )
                    .into_response()
            }
            AppError::Upstream { status, body } => {
                error!(%status, "OpenAI rejected session request");
                (status, Json(body)).into_response()
            }
            AppError::TokenGeneration(reason) => {
                error!(reason = %reason, "Failed to generate token");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to generate token" })),
                )
                    .into_response()
            }
        }
    }
}
