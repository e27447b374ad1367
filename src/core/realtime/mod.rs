//! Realtime session module.
//!
//! A client holds one voice/text session with a hosted realtime model over a
//! peer connection carrying local audio and a JSON event channel.
//!
//! # Architecture
//!
//! - [`TransportNegotiator`] runs credential fetch, media acquisition and the
//!   SDP offer/answer exchange, and owns the session state machine
//! - [`SessionChannel`] is the structured-event stream with its bounded log
//! - [`RealtimeEvent`] models the wire events as closed tagged variants
//! - [`RealtimeClient`] is the facade used by a UI or the CLI
//!
//! The peer connection is abstracted by [`PeerConnector`] and [`MediaSource`];
//! the native implementation is in `webrtc` behind the `webrtc-transport`
//! feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use realtime_portal::core::realtime::{ClientConfig, RealtimeClient};
//! use realtime_portal::core::realtime::webrtc::{SampleMediaSource, WebRtcConnector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = RealtimeClient::new(
//!         ClientConfig::default(),
//!         Arc::new(SampleMediaSource),
//!         Arc::new(WebRtcConnector::default()),
//!     )
//!     .unwrap();
//!
//!     client.start_session().await.unwrap();
//!     client.send_text_message("Give me an ocean color palette").unwrap();
//! }
//! ```

mod base;
mod channel;
mod client;
mod credential;
mod events;
mod negotiator;
mod signaling;
mod transport;
#[cfg(feature = "webrtc-transport")]
pub mod webrtc;

pub use base::{
    ChannelState, ClientConfig, DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_REALTIME_MODEL,
    DEFAULT_REALTIME_VOICE, DEFAULT_REGISTRATION_RETRY_MS, EVENT_CHANNEL_LABEL,
    OPENAI_API_BASE_URL, OPENAI_REALTIME_SIGNALING_URL, RealtimeError, RealtimeResult,
    SessionState,
};
pub use channel::{ChannelNotice, EventDirection, EventLog, LoggedEvent, SessionChannel};
pub use client::RealtimeClient;
pub use credential::{CredentialClient, EphemeralKey, extract_secret};
pub use events::{
    CONVERSATION_ITEM_CREATE, ContentPart, ConversationItem, ConversationItemCreateEvent,
    FunctionCall, FunctionChoice, RESPONSE_CREATE, RESPONSE_DONE, RealtimeEvent, Response,
    ResponseConfig, ResponseCreateEvent, ResponseDoneEvent, SESSION_UPDATE, SessionConfig,
    SessionUpdateEvent, ToolChoice, ToolChoiceMode, ToolDef,
};
pub use negotiator::{Session, TransportNegotiator};
pub use signaling::SignalingClient;
pub use transport::{
    LocalAudioTrack, MediaSource, PeerConnector, PeerTransport, TRANSPORT_EVENT_CAPACITY,
    TransportEvent,
};
