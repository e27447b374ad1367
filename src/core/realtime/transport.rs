//! Peer transport abstractions.
//!
//! The negotiator drives the offer/answer exchange through these traits so the
//! session lifecycle does not depend on a particular WebRTC stack. The native
//! implementation lives in [`super::webrtc`] behind the `webrtc-transport`
//! feature; tests use in-memory fakes.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::base::RealtimeResult;

/// Channel capacity for transport notifications.
pub const TRANSPORT_EVENT_CAPACITY: usize = 256;

/// Notifications pushed by the transport for the event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The data channel finished opening
    ChannelOpen,
    /// One text message arrived on the data channel
    Message(String),
    /// The data channel closed (either endpoint)
    ChannelClosed,
    /// The peer connection failed
    Failed(String),
}

/// A captured local audio track.
#[async_trait]
pub trait LocalAudioTrack: Send + Sync {
    /// Track identifier.
    fn id(&self) -> &str;

    /// Stop capturing. Must be idempotent.
    async fn stop(&self);

    /// Downcast support for connectors that need their concrete track type.
    fn as_any(&self) -> &dyn Any;
}

/// Source of local audio capture.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Acquire one audio track.
    ///
    /// Fails with [`RealtimeError::Media`](super::RealtimeError::Media) when
    /// permission is denied or no device exists.
    async fn acquire_audio(&self) -> RealtimeResult<Arc<dyn LocalAudioTrack>>;
}

/// An established (or establishing) peer connection with one event channel.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Build the local offer and return its SDP.
    async fn create_offer(&self) -> RealtimeResult<String>;

    /// Apply the remote answer SDP.
    async fn apply_answer(&self, sdp: String) -> RealtimeResult<()>;

    /// Send one text message on the event channel.
    async fn send_text(&self, text: String) -> RealtimeResult<()>;

    /// Close the event channel and the peer connection. Must be idempotent.
    async fn close(&self);
}

/// Factory for peer transports.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    /// Create a peer connection with `track` attached and an event channel
    /// named `label` in the connecting state.
    ///
    /// Channel lifecycle and inbound messages are delivered on the returned
    /// receiver.
    async fn connect(
        &self,
        track: Arc<dyn LocalAudioTrack>,
        label: &str,
    ) -> RealtimeResult<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)>;
}
