//! Short-lived credential retrieval from the broker.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error};
use zeroize::Zeroize;

use super::base::{RealtimeError, RealtimeResult};

const CREDENTIAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Ephemeral session key. Zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct EphemeralKey(String);

impl EphemeralKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EphemeralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EphemeralKey([REDACTED])")
    }
}

impl Drop for EphemeralKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Pull the secret out of a broker response.
///
/// Accepts `{"client_secret": {"value": ...}}` and falls back to a top-level
/// `{"token": ...}`.
pub fn extract_secret(body: &Value) -> Option<EphemeralKey> {
    body.pointer("/client_secret/value")
        .and_then(Value::as_str)
        .or_else(|| body.get("token").and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(EphemeralKey::new)
}

/// HTTP client for the broker's `GET /token`.
#[derive(Debug, Clone)]
pub struct CredentialClient {
    client: reqwest::Client,
    broker_url: String,
}

impl CredentialClient {
    pub fn new(client: reqwest::Client, broker_url: impl Into<String>) -> Self {
        Self {
            client,
            broker_url: broker_url.into(),
        }
    }

    pub fn broker_url(&self) -> &str {
        &self.broker_url
    }

    /// Fetch a fresh ephemeral key.
    pub async fn fetch(&self) -> RealtimeResult<EphemeralKey> {
        debug!(url = %self.broker_url, "Requesting session credential");

        let response = self
            .client
            .get(&self.broker_url)
            .timeout(CREDENTIAL_TIMEOUT)
            .send()
            .await
            .map_err(|e| RealtimeError::Credential(format!("broker unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Broker rejected credential request");
            return Err(RealtimeError::Credential(format!(
                "broker returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RealtimeError::Credential(format!("invalid broker response: {e}")))?;

        extract_secret(&body).ok_or_else(|| {
            RealtimeError::Credential("broker response has no client secret".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_client_secret() {
        let key = extract_secret(&json!({"client_secret": {"value": "ek_123"}})).unwrap();
        assert_eq!(key.expose(), "ek_123");
    }

    #[test]
    fn test_extract_token_fallback() {
        let key = extract_secret(&json!({"token": "tok"})).unwrap();
        assert_eq!(key.expose(), "tok");
    }

    #[test]
    fn test_extract_missing_or_empty() {
        assert!(extract_secret(&json!({"client_secret": {}})).is_none());
        assert!(extract_secret(&json!({"client_secret": {"value": ""}})).is_none());
        assert!(extract_secret(&json!({"token": 42})).is_none());
    }

    #[tokio::test]
    async fn test_fetch_non_success() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let client = CredentialClient::new(reqwest::Client::new(), server.uri());
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, RealtimeError::Credential(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        let client = CredentialClient::new(reqwest::Client::new(), "http://127.0.0.1:1/token");
        assert!(matches!(
            client.fetch().await,
            Err(RealtimeError::Credential(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = EphemeralKey::new("super-secret");
        assert!(!format!("{key:?}").contains("super-secret"));
    }
}
