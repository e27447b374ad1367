//! SDP offer/answer exchange with the provider.

use std::time::Duration;

use tracing::{debug, error};

use super::base::{RealtimeError, RealtimeResult};
use super::credential::EphemeralKey;

const SIGNALING_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts a local offer and returns the remote answer.
#[derive(Debug, Clone)]
pub struct SignalingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl SignalingClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `POST {endpoint}?model={model}` with the offer SDP as body.
    pub async fn exchange(&self, key: &EphemeralKey, offer_sdp: String) -> RealtimeResult<String> {
        debug!(endpoint = %self.endpoint, model = %self.model, "Posting SDP offer");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("model", self.model.as_str())])
            .bearer_auth(key.expose())
            .header(reqwest::header::CONTENT_TYPE, "application/sdp")
            .timeout(SIGNALING_TIMEOUT)
            .body(offer_sdp)
            .send()
            .await
            .map_err(|e| RealtimeError::Signaling(format!("signaling endpoint unreachable: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RealtimeError::Signaling(format!("failed to read answer: {e}")))?;

        if !status.is_success() {
            error!(status = %status, "Signaling endpoint rejected offer");
            return Err(RealtimeError::Signaling(format!("{status}: {body}")));
        }
        if body.trim().is_empty() {
            return Err(RealtimeError::Signaling("empty SDP answer".to_string()));
        }

        debug!(bytes = body.len(), "Received SDP answer");
        Ok(body)
    }
}
