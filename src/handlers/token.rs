//! `GET /token`: exchanges the server's API key for a short-lived session
//! credential.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    model: &'a str,
    voice: &'a str,
}

/// Mint a realtime session and return the provider response unchanged.
///
/// The body carries `client_secret.value`, the ephemeral key the client uses
/// for signaling.
pub async fn generate_token(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let api_key = state
        .config
        .openai_api_key
        .as_deref()
        .ok_or(AppError::MissingApiKey)?;

    let url = state.config.realtime_sessions_url();
    info!(
        model = %state.config.realtime_model,
        voice = %state.config.realtime_voice,
        "Requesting realtime session credential"
    );

    let response = state
        .http
        .post(&url)
        .bearer_auth(api_key)
        .json(&SessionRequest {
            model: &state.config.realtime_model,
            voice: &state.config.realtime_voice,
        })
        .send()
        .await
        .map_err(|e| AppError::TokenGeneration(e.to_string()))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| AppError::TokenGeneration(format!("invalid upstream body: {e}")))?;

    if !status.is_success() {
        return Err(AppError::Upstream { status, body });
    }

    debug!(
        has_client_secret = body.pointer("/client_secret/value").is_some(),
        "Realtime session created"
    );
    Ok(Json(body))
}
