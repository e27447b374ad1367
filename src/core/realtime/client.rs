//! Client facade consumed by the UI: session control, event sending and the
//! event log.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::base::{ClientConfig, RealtimeError, RealtimeResult, SessionState};
use super::channel::{ChannelNotice, LoggedEvent};
use super::events::{RealtimeEvent, ToolChoice};
use super::negotiator::{Session, TransportNegotiator};
use super::transport::{MediaSource, PeerConnector};
use crate::core::tools::{DispatchOutcome, KnowledgeBase, ToolRegistry};

/// Realtime client holding at most one session.
pub struct RealtimeClient {
    negotiator: TransportNegotiator,
}

impl RealtimeClient {
    /// Build a client from its config: the tool profile selects the registry
    /// and tool choice, the knowledge base is loaded from its path if set.
    pub fn new(
        config: ClientConfig,
        media: Arc<dyn MediaSource>,
        connector: Arc<dyn PeerConnector>,
    ) -> RealtimeResult<Self> {
        let knowledge_base = match &config.knowledge_base_path {
            Some(path) => KnowledgeBase::from_file(path)?,
            None => KnowledgeBase::default(),
        };
        let registry = config.tool_profile.build_registry(knowledge_base)?;
        let tool_choice = config.tool_profile.tool_choice();

        info!(
            profile = %config.tool_profile,
            tools = ?registry.names(),
            "Realtime client configured"
        );
        Self::with_registry(config, registry, tool_choice, media, connector)
    }

    /// Build a client with a custom tool set.
    pub fn with_registry(
        config: ClientConfig,
        registry: ToolRegistry,
        tool_choice: ToolChoice,
        media: Arc<dyn MediaSource>,
        connector: Arc<dyn PeerConnector>,
    ) -> RealtimeResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("HTTP client: {e}")))?;
        let negotiator =
            TransportNegotiator::new(&config, http, media, connector, registry, tool_choice)?;
        Ok(Self { negotiator })
    }

    pub async fn start_session(&self) -> RealtimeResult<Arc<Session>> {
        self.negotiator.start_session().await
    }

    pub async fn stop_session(&self) {
        self.negotiator.stop_session().await
    }

    pub fn is_session_active(&self) -> bool {
        self.negotiator.is_session_active()
    }

    pub fn session_state(&self) -> SessionState {
        self.negotiator.state()
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.negotiator.current_session()
    }

    fn open_session(&self) -> RealtimeResult<Arc<Session>> {
        self.negotiator
            .current_session()
            .ok_or(RealtimeError::ChannelNotOpen)
    }

    /// Send an arbitrary client event. Returns its event id.
    pub fn send_client_event(&self, event: RealtimeEvent) -> RealtimeResult<String> {
        self.open_session()?.channel().send(event)
    }

    /// Send a user text message and ask the model to respond.
    pub fn send_text_message(&self, text: impl Into<String>) -> RealtimeResult<String> {
        let session = self.open_session()?;
        let channel = session.channel();
        let event_id = channel.send(RealtimeEvent::user_text(text))?;
        channel.send(RealtimeEvent::response_create(None))?;
        debug!(event_id = %event_id, "Sent text message");
        Ok(event_id)
    }

    /// Newest-first event log of the current session, empty without one.
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.negotiator
            .current_session()
            .map(|s| s.channel().events())
            .unwrap_or_default()
    }

    /// Subscribe to the current session's channel notifications.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ChannelNotice>> {
        self.negotiator
            .current_session()
            .map(|s| s.channel().subscribe())
    }

    /// Latest tool outcome of the current session.
    pub fn last_tool_outcome(&self) -> Option<DispatchOutcome> {
        self.negotiator
            .current_session()
            .and_then(|s| s.dispatcher().last_outcome())
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        self.negotiator.registry()
    }
}
