//! In-memory media and peer-connection fakes shared by integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use realtime_portal::core::realtime::{
    ClientConfig, LocalAudioTrack, MediaSource, PeerConnector, PeerTransport, RealtimeError,
    RealtimeResult, TRANSPORT_EVENT_CAPACITY, TransportEvent,
};

pub const TEST_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
pub const TEST_EPHEMERAL_KEY: &str = "ek_test_123";
pub const FAKE_OFFER: &str = "v=0\r\no=- fake-offer\r\n";
pub const FAKE_ANSWER: &str = "v=0\r\no=- fake-answer\r\n";

pub struct FakeTrack {
    id: String,
    stopped: AtomicBool,
}

impl FakeTrack {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalAudioTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct FakeMedia {
    pub deny: AtomicBool,
    tracks: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakeMedia {
    pub fn denying() -> Self {
        let media = Self::default();
        media.deny.store(true, Ordering::SeqCst);
        media
    }

    pub fn tracks(&self) -> Vec<Arc<FakeTrack>> {
        self.tracks.lock().clone()
    }
}

#[async_trait]
impl MediaSource for FakeMedia {
    async fn acquire_audio(&self) -> RealtimeResult<Arc<dyn LocalAudioTrack>> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(RealtimeError::Media("permission denied".to_string()));
        }
        let mut tracks = self.tracks.lock();
        let track = Arc::new(FakeTrack {
            id: format!("track-{}", tracks.len()),
            stopped: AtomicBool::new(false),
        });
        tracks.push(track.clone());
        Ok(track)
    }
}

#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<String>>,
    answer: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl FakeTransport {
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    pub fn answer(&self) -> Option<String> {
        self.answer.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn create_offer(&self) -> RealtimeResult<String> {
        Ok(FAKE_OFFER.to_string())
    }

    async fn apply_answer(&self, sdp: String) -> RealtimeResult<()> {
        *self.answer.lock() = Some(sdp);
        Ok(())
    }

    async fn send_text(&self, text: String) -> RealtimeResult<()> {
        if self.is_closed() {
            return Err(RealtimeError::ChannelNotOpen);
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out [`FakeTransport`]s and keeps the sender side of their event
/// streams so tests can play the remote peer.
#[derive(Default)]
pub struct FakeConnector {
    peers: Mutex<Vec<(Arc<FakeTransport>, mpsc::Sender<TransportEvent>)>>,
    pub connects: AtomicUsize,
    pub delay: Mutex<Option<Duration>>,
}

impl FakeConnector {
    pub fn with_delay(delay: Duration) -> Self {
        let connector = Self::default();
        *connector.delay.lock() = Some(delay);
        connector
    }

    pub fn last(&self) -> (Arc<FakeTransport>, mpsc::Sender<TransportEvent>) {
        self.peers.lock().last().cloned().unwrap()
    }

    pub fn transports(&self) -> Vec<Arc<FakeTransport>> {
        self.peers.lock().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl PeerConnector for FakeConnector {
    async fn connect(
        &self,
        _track: Arc<dyn LocalAudioTrack>,
        label: &str,
    ) -> RealtimeResult<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)> {
        assert_eq!(label, "oai-events");
        self.connects.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (tx, rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);
        let transport = Arc::new(FakeTransport::default());
        self.peers.lock().push((transport.clone(), tx));
        Ok((transport, rx))
    }
}

/// Mount a broker `/token` and a signaling endpoint on `server`.
pub async fn mount_provider(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sess_123",
            "client_secret": { "value": TEST_EPHEMERAL_KEY, "expires_at": 1_700_000_000 }
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/realtime"))
        .and(query_param("model", TEST_MODEL))
        .and(header("authorization", format!("Bearer {TEST_EPHEMERAL_KEY}").as_str()))
        .and(header("content-type", "application/sdp"))
        .respond_with(ResponseTemplate::new(201).set_body_string(FAKE_ANSWER))
        .mount(server)
        .await;
}

pub fn client_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        broker_url: format!("{}/token", server.uri()),
        signaling_url: format!("{}/v1/realtime", server.uri()),
        model: TEST_MODEL.to_string(),
        registration_retry_ms: 200,
        ..Default::default()
    }
}

/// Poll `check` until it holds or one second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
