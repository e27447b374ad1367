//! Native peer connector on webrtc-rs.
//!
//! Audio is an Opus sample track fed by the caller through
//! [`SampleAudioTrack::write_sample`]; device capture stays outside the crate.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MediaEngine};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use super::base::{RealtimeError, RealtimeResult};
use super::transport::{
    LocalAudioTrack, MediaSource, PeerConnector, PeerTransport, TRANSPORT_EVENT_CAPACITY,
    TransportEvent,
};

const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

fn transport_err(e: impl std::fmt::Display) -> RealtimeError {
    RealtimeError::Transport(e.to_string())
}

/// Opus track written to by the caller.
pub struct SampleAudioTrack {
    track: Arc<TrackLocalStaticSample>,
    stopped: AtomicBool,
}

impl SampleAudioTrack {
    pub fn new(stream_id: &str) -> Self {
        let track = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.to_owned(),
        );
        Self {
            track: Arc::new(track),
            stopped: AtomicBool::new(false),
        }
    }

    /// Push one encoded Opus frame. Ignored once stopped.
    pub async fn write_sample(&self, sample: &Sample) -> RealtimeResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.track.write_sample(sample).await.map_err(transport_err)
    }

    fn rtc_track(&self) -> Arc<TrackLocalStaticSample> {
        self.track.clone()
    }
}

#[async_trait]
impl LocalAudioTrack for SampleAudioTrack {
    fn id(&self) -> &str {
        self.track.id()
    }

    async fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(track = %self.track.id(), "Audio track stopped");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Media source handing out [`SampleAudioTrack`]s.
#[derive(Debug, Clone, Default)]
pub struct SampleMediaSource;

#[async_trait]
impl MediaSource for SampleMediaSource {
    async fn acquire_audio(&self) -> RealtimeResult<Arc<dyn LocalAudioTrack>> {
        Ok(Arc::new(SampleAudioTrack::new("realtime-portal")))
    }
}

/// Creates webrtc-rs peer connections.
#[derive(Debug, Clone)]
pub struct WebRtcConnector {
    ice_servers: Vec<String>,
}

impl Default for WebRtcConnector {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }
}

impl WebRtcConnector {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }

    async fn peer_connection(&self) -> RealtimeResult<Arc<RTCPeerConnection>> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(transport_err)?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(transport_err)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let pc = api.new_peer_connection(config).await.map_err(transport_err)?;
        Ok(Arc::new(pc))
    }
}

fn wire_data_channel(dc: &Arc<RTCDataChannel>, events: mpsc::Sender<TransportEvent>) {
    let on_open = events.clone();
    dc.on_open(Box::new(move || {
        let events = on_open.clone();
        Box::pin(async move {
            let _ = events.send(TransportEvent::ChannelOpen).await;
        })
    }));

    let on_message = events.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let events = on_message.clone();
        Box::pin(async move {
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let _ = events.send(TransportEvent::Message(text)).await;
                }
                Err(_) => warn!(bytes = msg.data.len(), "Dropping non-UTF-8 data channel message"),
            }
        })
    }));

    let on_close = events;
    dc.on_close(Box::new(move || {
        let events = on_close.clone();
        Box::pin(async move {
            let _ = events.send(TransportEvent::ChannelClosed).await;
        })
    }));
}

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(
        &self,
        track: Arc<dyn LocalAudioTrack>,
        label: &str,
    ) -> RealtimeResult<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)> {
        let audio = track
            .as_any()
            .downcast_ref::<SampleAudioTrack>()
            .ok_or_else(|| RealtimeError::Media("unsupported audio track type".to_string()))?
            .rtc_track();

        let pc = self.peer_connection().await?;
        let (events_tx, events_rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);

        if let Err(e) = pc
            .add_track(audio as Arc<dyn TrackLocal + Send + Sync>)
            .await
        {
            let _ = pc.close().await;
            return Err(RealtimeError::Media(e.to_string()));
        }

        let dc = match pc.create_data_channel(label, None).await {
            Ok(dc) => dc,
            Err(e) => {
                let _ = pc.close().await;
                return Err(transport_err(e));
            }
        };
        wire_data_channel(&dc, events_tx.clone());

        let on_state = events_tx;
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let events = on_state.clone();
            Box::pin(async move {
                debug!(%state, "Peer connection state changed");
                if state == RTCPeerConnectionState::Failed {
                    let _ = events
                        .send(TransportEvent::Failed("peer connection failed".to_string()))
                        .await;
                }
            })
        }));

        info!(label, "Peer connection created");
        let transport: Arc<dyn PeerTransport> = Arc::new(WebRtcTransport {
            pc,
            dc,
            closed: AtomicBool::new(false),
        });
        Ok((transport, events_rx))
    }
}

/// A webrtc-rs peer connection with its event data channel.
pub struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
    dc: Arc<RTCDataChannel>,
    closed: AtomicBool,
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> RealtimeResult<String> {
        let offer = self.pc.create_offer(None).await.map_err(transport_err)?;
        let mut gathering = self.pc.gathering_complete_promise().await;
        self.pc
            .set_local_description(offer)
            .await
            .map_err(transport_err)?;
        let _ = gathering.recv().await;

        self.pc
            .local_description()
            .await
            .map(|desc| desc.sdp)
            .ok_or_else(|| RealtimeError::Transport("no local description".to_string()))
    }

    async fn apply_answer(&self, sdp: String) -> RealtimeResult<()> {
        let answer = RTCSessionDescription::answer(sdp)
            .map_err(|e| RealtimeError::Signaling(format!("invalid SDP answer: {e}")))?;
        self.pc
            .set_remote_description(answer)
            .await
            .map_err(|e| RealtimeError::Signaling(format!("remote description rejected: {e}")))
    }

    async fn send_text(&self, text: String) -> RealtimeResult<()> {
        self.dc.send_text(text).await.map_err(transport_err)?;
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.dc.close().await {
            debug!(error = %e, "Data channel close failed");
        }
        if let Err(e) = self.pc.close().await {
            debug!(error = %e, "Peer connection close failed");
        }
    }
}
