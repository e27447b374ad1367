//! Base types for realtime sessions.
//!
//! This module defines the error taxonomy, session and channel state machines,
//! and the client-side configuration shared by the negotiator, the session
//! channel and the tool dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::core::tools::ToolProfile;

/// Provider base URL used for credential minting and signaling.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com";

/// Default signaling endpoint for WebRTC offer/answer exchange.
pub const OPENAI_REALTIME_SIGNALING_URL: &str = "https://api.openai.com/v1/realtime";

/// Default realtime model requested at negotiation.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";

/// Default voice requested when minting a credential.
pub const DEFAULT_REALTIME_VOICE: &str = "verse";

/// Label of the structured-event data channel expected by the provider.
pub const EVENT_CHANNEL_LABEL: &str = "oai-events";

/// Default bound on the retained event log.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 500;

/// Default upper bound on how long tool registration waits for the channel.
pub const DEFAULT_REGISTRATION_RETRY_MS: u64 = 2000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during a realtime session.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Short-lived credential could not be obtained from the broker
    #[error("Credential error: {0}")]
    Credential(String),

    /// Local audio capture could not be acquired
    #[error("Media error: {0}")]
    Media(String),

    /// Provider rejected the offer or was unreachable
    #[error("Signaling error: {0}")]
    Signaling(String),

    /// Peer transport failure outside of signaling
    #[error("Transport error: {0}")]
    Transport(String),

    /// Attempted to send before the channel opened (or after it closed)
    #[error("Channel not open")]
    ChannelNotOpen,

    /// Inbound message could not be decoded
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Function call arguments were not valid JSON
    #[error("Argument parse error: {0}")]
    ArgumentParse(String),

    /// Function call arguments failed handler validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tool handler failed internally. The built-in tools only report
    /// `Validation`; this is for custom [`ToolHandler`](crate::core::tools::ToolHandler)
    /// implementations.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Two tools were registered under the same name
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// A negotiation is already in progress
    #[error("Session busy: negotiation already in progress")]
    SessionBusy,

    /// Negotiation was aborted by a concurrent stop
    #[error("Negotiation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RealtimeError {
    /// Whether this error belongs to the negotiation phase.
    pub fn is_negotiation_error(&self) -> bool {
        matches!(
            self,
            Self::Credential(_) | Self::Media(_) | Self::Signaling(_) | Self::Transport(_)
        )
    }

    /// Whether this error is isolated to a single message or tool call.
    pub fn is_per_call_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedEvent(_) | Self::ArgumentParse(_) | Self::Validation(_) | Self::Handler(_)
        )
    }
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// State Machines
// =============================================================================

/// Lifecycle state of the single client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session; ready to start
    #[default]
    Idle,
    /// Offer/answer exchange in flight
    Negotiating,
    /// Transport established
    Open,
    /// Transport closed by the remote side or a fatal error
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Negotiating => write!(f, "Negotiating"),
            SessionState::Open => write!(f, "Open"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// State of the structured-event channel.
///
/// Transitions only move forward: `Connecting -> Open -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "Connecting"),
            ChannelState::Open => write!(f, "Open"),
            ChannelState::Closed => write!(f, "Closed"),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the client side of a realtime session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Credential broker endpoint (e.g. `http://localhost:3000/token`)
    pub broker_url: String,

    /// Provider signaling endpoint receiving the SDP offer
    #[serde(default = "default_signaling_url")]
    pub signaling_url: String,

    /// Realtime model appended to the signaling URL
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum number of events retained in the log
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// Upper bound on deferred tool registration (milliseconds)
    #[serde(default = "default_registration_retry_ms")]
    pub registration_retry_ms: u64,

    /// Tool set exposed to the model
    #[serde(default)]
    pub tool_profile: ToolProfile,

    /// Optional knowledge base JSON file for the attendant tool
    #[serde(default)]
    pub knowledge_base_path: Option<std::path::PathBuf>,
}

fn default_signaling_url() -> String {
    OPENAI_REALTIME_SIGNALING_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_REALTIME_MODEL.to_string()
}

fn default_event_log_capacity() -> usize {
    DEFAULT_EVENT_LOG_CAPACITY
}

fn default_registration_retry_ms() -> u64 {
    DEFAULT_REGISTRATION_RETRY_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            broker_url: "http://127.0.0.1:3000/token".to_string(),
            signaling_url: default_signaling_url(),
            model: default_model(),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            registration_retry_ms: DEFAULT_REGISTRATION_RETRY_MS,
            tool_profile: ToolProfile::default(),
            knowledge_base_path: None,
        }
    }
}

impl ClientConfig {
    /// Registration retry bound as a `Duration`.
    pub fn registration_retry(&self) -> Duration {
        Duration::from_millis(self.registration_retry_ms)
    }

    /// Validate URLs and bounds.
    pub fn validate(&self) -> RealtimeResult<()> {
        url::Url::parse(&self.broker_url).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!("broker_url '{}': {e}", self.broker_url))
        })?;
        url::Url::parse(&self.signaling_url).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!(
                "signaling_url '{}': {e}",
                self.signaling_url
            ))
        })?;
        if self.model.trim().is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "model must not be empty".to_string(),
            ));
        }
        if self.event_log_capacity == 0 {
            return Err(RealtimeError::InvalidConfiguration(
                "event_log_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Negotiating.to_string(), "Negotiating");
        assert_eq!(SessionState::Open.to_string(), "Open");
        assert_eq!(SessionState::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_channel_state_default() {
        assert_eq!(ChannelState::default(), ChannelState::Connecting);
    }

    #[test]
    fn test_error_classification() {
        assert!(RealtimeError::Credential("x".into()).is_negotiation_error());
        assert!(RealtimeError::Signaling("x".into()).is_negotiation_error());
        assert!(!RealtimeError::ChannelNotOpen.is_negotiation_error());
        assert!(RealtimeError::Validation("x".into()).is_per_call_error());
        assert!(!RealtimeError::Cancelled.is_per_call_error());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(RealtimeError::ChannelNotOpen.to_string(), "Channel not open");
        let err = RealtimeError::Signaling("status 401".to_string());
        assert!(err.to_string().contains("Signaling error"));
    }

    #[test]
    fn test_default_client_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registration_retry(), Duration::from_millis(2000));
    }

    #[test]
    fn test_client_config_rejects_bad_url() {
        let config = ClientConfig {
            broker_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RealtimeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_client_config_rejects_zero_capacity() {
        let config = ClientConfig {
            event_log_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
