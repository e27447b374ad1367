use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state of the broker server.
pub struct AppState {
    pub config: ServerConfig,
    /// Client for provider requests
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Arc::new(Self { config, http })
    }
}
