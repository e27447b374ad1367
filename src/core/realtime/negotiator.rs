//! Session lifecycle: negotiation, the session driver task and teardown.
//!
//! # Concurrency
//!
//! The session slot (state, generation, current session) sits behind one
//! mutex that is never held across an await. Every `stop_session` bumps the
//! generation; an in-flight `start_session` re-checks it after each await
//! point and, once superseded, releases what it acquired and returns
//! [`RealtimeError::Cancelled`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::base::{
    ClientConfig, EVENT_CHANNEL_LABEL, RealtimeError, RealtimeResult, SessionState,
};
use super::channel::SessionChannel;
use super::credential::{CredentialClient, EphemeralKey};
use super::events::ToolChoice;
use super::signaling::SignalingClient;
use super::transport::{LocalAudioTrack, MediaSource, PeerConnector, PeerTransport, TransportEvent};
use crate::core::tools::{ToolDispatcher, ToolRegistry};

/// One live session: channel, dispatcher and the resources backing them.
pub struct Session {
    id: String,
    channel: Arc<SessionChannel>,
    dispatcher: Arc<ToolDispatcher>,
    transport: Arc<dyn PeerTransport>,
    track: Arc<dyn LocalAudioTrack>,
    cancel: CancellationToken,
    released: AtomicBool,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn channel(&self) -> &Arc<SessionChannel> {
        &self.channel
    }

    pub fn dispatcher(&self) -> &Arc<ToolDispatcher> {
        &self.dispatcher
    }

    /// Close the channel, stop local audio and close the transport. Idempotent.
    pub async fn shutdown(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(session_id = %self.id, "Releasing session resources");
        self.cancel.cancel();
        self.dispatcher.cancel_pending();
        self.channel.mark_closed();
        self.transport.close().await;
        self.track.stop().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("channel_state", &self.channel.state())
            .field("track", &self.track.id())
            .finish()
    }
}

#[derive(Default)]
struct SessionSlot {
    state: SessionState,
    generation: u64,
    session: Option<Arc<Session>>,
}

/// Owns the single session of a client.
pub struct TransportNegotiator {
    credentials: CredentialClient,
    signaling: SignalingClient,
    media: Arc<dyn MediaSource>,
    connector: Arc<dyn PeerConnector>,
    registry: Arc<ToolRegistry>,
    tool_choice: ToolChoice,
    log_capacity: usize,
    retry_delay: Duration,
    slot: Arc<Mutex<SessionSlot>>,
}

impl TransportNegotiator {
    /// Create a negotiator. Fails on invalid configuration or a tool choice
    /// that forces an unregistered tool.
    pub fn new(
        config: &ClientConfig,
        http: reqwest::Client,
        media: Arc<dyn MediaSource>,
        connector: Arc<dyn PeerConnector>,
        registry: ToolRegistry,
        tool_choice: ToolChoice,
    ) -> RealtimeResult<Self> {
        config.validate()?;
        registry.session_update(&tool_choice)?;

        Ok(Self {
            credentials: CredentialClient::new(http.clone(), config.broker_url.clone()),
            signaling: SignalingClient::new(http, config.signaling_url.clone(), config.model.clone()),
            media,
            connector,
            registry: Arc::new(registry),
            tool_choice,
            log_capacity: config.event_log_capacity,
            retry_delay: config.registration_retry(),
            slot: Arc::new(Mutex::new(SessionSlot::default())),
        })
    }

    pub fn state(&self) -> SessionState {
        self.slot.lock().state
    }

    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.slot.lock().session.clone()
    }

    /// Session negotiated and its event channel open.
    pub fn is_session_active(&self) -> bool {
        let slot = self.slot.lock();
        slot.state == SessionState::Open
            && slot.session.as_ref().is_some_and(|s| s.channel.is_open())
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Negotiate a new session.
    ///
    /// Returns the existing session when one is open and
    /// [`RealtimeError::SessionBusy`] while another start is negotiating. On
    /// failure the state is back to `Idle` and nothing acquired is left open.
    pub async fn start_session(&self) -> RealtimeResult<Arc<Session>> {
        let generation = {
            let mut slot = self.slot.lock();
            match slot.state {
                SessionState::Negotiating => {
                    warn!("Session negotiation already in progress");
                    return Err(RealtimeError::SessionBusy);
                }
                SessionState::Open => {
                    if let Some(session) = &slot.session {
                        info!(session_id = %session.id, "Session already active, skipping start");
                        return Ok(session.clone());
                    }
                }
                SessionState::Idle | SessionState::Closed => {}
            }
            slot.generation += 1;
            slot.state = SessionState::Negotiating;
            slot.generation
        };

        info!(generation, "Starting realtime session");
        match self.negotiate(generation).await {
            Ok(session) => {
                info!(session_id = %session.id, "Realtime session negotiated");
                Ok(session)
            }
            Err(e) => {
                let mut slot = self.slot.lock();
                if slot.generation == generation {
                    slot.state = SessionState::Idle;
                    slot.session = None;
                }
                drop(slot);
                match &e {
                    RealtimeError::Cancelled => info!("Session start cancelled by stop"),
                    other => error!(error = %other, "Failed to start session"),
                }
                Err(e)
            }
        }
    }

    /// Tear down the current session, if any, and reset to `Idle`.
    ///
    /// Also aborts an in-flight `start_session`. Safe to call repeatedly.
    pub async fn stop_session(&self) {
        let session = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            slot.state = SessionState::Idle;
            slot.session.take()
        };

        match session {
            Some(session) => {
                info!(session_id = %session.id, "Stopping realtime session");
                session.shutdown().await;
            }
            None => debug!("Stop requested with no active session"),
        }
    }

    fn ensure_current(&self, generation: u64) -> RealtimeResult<()> {
        if self.slot.lock().generation == generation {
            Ok(())
        } else {
            Err(RealtimeError::Cancelled)
        }
    }

    async fn negotiate(&self, generation: u64) -> RealtimeResult<Arc<Session>> {
        let key = self.credentials.fetch().await?;
        self.ensure_current(generation)?;

        let track = self.media.acquire_audio().await?;
        if let Err(e) = self.ensure_current(generation) {
            track.stop().await;
            return Err(e);
        }

        let (transport, transport_events) =
            match self.connector.connect(track.clone(), EVENT_CHANNEL_LABEL).await {
                Ok(pair) => pair,
                Err(e) => {
                    track.stop().await;
                    return Err(e);
                }
            };

        if let Err(e) = self.exchange(generation, &key, transport.as_ref()).await {
            transport.close().await;
            track.stop().await;
            return Err(e);
        }
        drop(key);

        let (channel, outbound_rx) = SessionChannel::new(self.log_capacity);
        let dispatcher = Arc::new(ToolDispatcher::new(
            self.registry.clone(),
            self.tool_choice.clone(),
            self.retry_delay,
        ));
        let session = Arc::new(Session {
            id: uuid::Uuid::new_v4().to_string(),
            channel,
            dispatcher,
            transport,
            track,
            cancel: CancellationToken::new(),
            released: AtomicBool::new(false),
        });

        let installed = {
            let mut slot = self.slot.lock();
            if slot.generation == generation {
                slot.state = SessionState::Open;
                slot.session = Some(session.clone());
                true
            } else {
                false
            }
        };
        if !installed {
            session.shutdown().await;
            return Err(RealtimeError::Cancelled);
        }

        tokio::spawn(drive_session(
            session.clone(),
            outbound_rx,
            transport_events,
            self.slot.clone(),
            generation,
        ));
        Ok(session)
    }

    async fn exchange(
        &self,
        generation: u64,
        key: &EphemeralKey,
        transport: &dyn PeerTransport,
    ) -> RealtimeResult<()> {
        let offer = transport.create_offer().await?;
        self.ensure_current(generation)?;

        let answer = self.signaling.exchange(key, offer).await?;
        self.ensure_current(generation)?;

        transport.apply_answer(answer).await?;
        self.ensure_current(generation)
    }
}

/// Session driver: forwards outbound messages to the transport and feeds
/// transport notifications into the channel and dispatcher.
async fn drive_session(
    session: Arc<Session>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut transport_events: mpsc::Receiver<TransportEvent>,
    slot: Arc<Mutex<SessionSlot>>,
    generation: u64,
) {
    let channel = session.channel.clone();
    let dispatcher = session.dispatcher.clone();

    let reason = loop {
        tokio::select! {
            _ = session.cancel.cancelled() => {
                debug!(session_id = %session.id, "Session driver cancelled");
                return;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = session.transport.send_text(text).await {
                    warn!(error = %e, "Failed to send event on transport");
                }
            }
            event = transport_events.recv() => match event {
                Some(TransportEvent::ChannelOpen) => {
                    if channel.mark_open() {
                        match dispatcher.register_tools(&channel) {
                            Ok(status) => debug!(?status, "Tool registration on open"),
                            Err(e) => warn!(error = %e, "Tool registration failed"),
                        }
                    }
                }
                Some(TransportEvent::Message(text)) => {
                    if let Ok(event) = channel.receive(&text) {
                        dispatcher.dispatch(&event, &channel).await;
                    }
                }
                Some(TransportEvent::ChannelClosed) => break "event channel closed".to_string(),
                Some(TransportEvent::Failed(reason)) => break reason,
                None => break "transport dropped".to_string(),
            }
        }
    };

    warn!(session_id = %session.id, reason = %reason, "Session transport closed");
    let current = {
        let mut slot = slot.lock();
        if slot.generation == generation && slot.state == SessionState::Open {
            slot.state = SessionState::Closed;
            slot.session = None;
            true
        } else {
            false
        }
    };
    if current {
        session.shutdown().await;
    }
}
