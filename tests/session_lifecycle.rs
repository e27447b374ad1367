//! Session lifecycle tests.
//!
//! The broker and signaling endpoints are served by wiremock; the peer
//! connection is an in-memory fake driven by the test.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    FAKE_ANSWER, FakeConnector, FakeMedia, client_config, eventually, mount_provider,
};
use realtime_portal::core::realtime::{
    EventDirection, RealtimeClient, RealtimeError, RealtimeEvent, SessionState, TransportEvent,
};
use realtime_portal::core::tools::DispatchOutcome;

struct Harness {
    client: Arc<RealtimeClient>,
    media: Arc<FakeMedia>,
    connector: Arc<FakeConnector>,
    _server: MockServer,
}

async fn harness_with(connector: FakeConnector) -> Harness {
    let server = MockServer::start().await;
    mount_provider(&server).await;

    let media = Arc::new(FakeMedia::default());
    let connector = Arc::new(connector);
    let client = RealtimeClient::new(client_config(&server), media.clone(), connector.clone())
        .unwrap();

    Harness {
        client: Arc::new(client),
        media,
        connector,
        _server: server,
    }
}

async fn harness() -> Harness {
    harness_with(FakeConnector::default()).await
}

/// Start a session and open its event channel.
async fn open_session(h: &Harness) {
    h.client.start_session().await.unwrap();
    let (_, events) = h.connector.last();
    events.send(TransportEvent::ChannelOpen).await.unwrap();
    assert!(eventually(|| h.client.is_session_active()).await);
}

#[tokio::test]
async fn test_start_session_negotiates_and_registers_tools() {
    let h = harness().await;

    let session = h.client.start_session().await.unwrap();
    assert_eq!(h.client.session_state(), SessionState::Open);
    assert!(!h.client.is_session_active());

    let (transport, events) = h.connector.last();
    assert_eq!(transport.answer().as_deref(), Some(FAKE_ANSWER));

    events.send(TransportEvent::ChannelOpen).await.unwrap();
    assert!(eventually(|| h.client.is_session_active()).await);
    assert!(eventually(|| transport.sent().len() == 1).await);

    let sent = transport.sent();
    assert_eq!(sent[0]["type"], "session.update");
    assert_eq!(sent[0]["session"]["tools"][0]["name"], "display_color_palette");
    assert!(session.dispatcher().is_registered());
}

#[tokio::test]
async fn test_start_when_open_returns_existing_session() {
    let h = harness().await;

    let first = h.client.start_session().await.unwrap();
    let second = h.client.start_session().await.unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_start_while_negotiating_is_busy() {
    let h = harness_with(FakeConnector::with_delay(Duration::from_millis(200))).await;

    let pending = {
        let client = h.client.clone();
        tokio::spawn(async move { client.start_session().await })
    };
    assert!(eventually(|| h.client.session_state() == SessionState::Negotiating).await);

    let busy = h.client.start_session().await;
    assert!(matches!(busy, Err(RealtimeError::SessionBusy)));

    pending.await.unwrap().unwrap();
    assert_eq!(h.client.session_state(), SessionState::Open);
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_session_twice_is_idle() {
    let h = harness().await;
    open_session(&h).await;

    h.client.stop_session().await;
    assert_eq!(h.client.session_state(), SessionState::Idle);
    h.client.stop_session().await;
    assert_eq!(h.client.session_state(), SessionState::Idle);

    let (transport, _) = h.connector.last();
    assert!(transport.is_closed());
    assert!(h.media.tracks().iter().all(|t| t.is_stopped()));
    assert!(!h.client.is_session_active());
}

#[tokio::test]
async fn test_stop_without_session_is_noop() {
    let h = harness().await;
    h.client.stop_session().await;
    assert_eq!(h.client.session_state(), SessionState::Idle);
}

#[tokio::test]
async fn test_stop_during_negotiation_cancels_start() {
    let h = harness_with(FakeConnector::with_delay(Duration::from_millis(150))).await;

    let pending = {
        let client = h.client.clone();
        tokio::spawn(async move { client.start_session().await })
    };
    assert!(eventually(|| h.connector.connects.load(Ordering::SeqCst) == 1).await);

    h.client.stop_session().await;
    let result = pending.await.unwrap();

    assert!(matches!(result, Err(RealtimeError::Cancelled)));
    assert_eq!(h.client.session_state(), SessionState::Idle);
    assert!(h.client.session().is_none());
    assert!(h.connector.transports().iter().all(|t| t.is_closed()));
    assert!(h.media.tracks().iter().all(|t| t.is_stopped()));
}

#[tokio::test]
async fn test_credential_failure_leaves_idle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;

    let media = Arc::new(FakeMedia::default());
    let connector = Arc::new(FakeConnector::default());
    let client =
        RealtimeClient::new(client_config(&server), media.clone(), connector.clone()).unwrap();

    let result = client.start_session().await;
    assert!(matches!(result, Err(RealtimeError::Credential(_))));
    assert_eq!(client.session_state(), SessionState::Idle);
    assert!(media.tracks().is_empty());
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_client_secret_is_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sess_1"})))
        .mount(&server)
        .await;

    let client = RealtimeClient::new(
        client_config(&server),
        Arc::new(FakeMedia::default()),
        Arc::new(FakeConnector::default()),
    )
    .unwrap();

    let result = client.start_session().await;
    assert!(matches!(result, Err(RealtimeError::Credential(msg)) if msg.contains("client secret")));
}

#[tokio::test]
async fn test_token_fallback_field_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": common::TEST_EPHEMERAL_KEY})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FAKE_ANSWER))
        .mount(&server)
        .await;

    let client = RealtimeClient::new(
        client_config(&server),
        Arc::new(FakeMedia::default()),
        Arc::new(FakeConnector::default()),
    )
    .unwrap();

    client.start_session().await.unwrap();
    assert_eq!(client.session_state(), SessionState::Open);
}

#[tokio::test]
async fn test_media_denied_leaves_idle() {
    let server = MockServer::start().await;
    mount_provider(&server).await;

    let connector = Arc::new(FakeConnector::default());
    let client = RealtimeClient::new(
        client_config(&server),
        Arc::new(FakeMedia::denying()),
        connector.clone(),
    )
    .unwrap();

    let result = client.start_session().await;
    assert!(matches!(result, Err(RealtimeError::Media(_))));
    assert_eq!(client.session_state(), SessionState::Idle);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_signaling_rejection_releases_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"client_secret": {"value": "ek_expired"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let media = Arc::new(FakeMedia::default());
    let connector = Arc::new(FakeConnector::default());
    let client =
        RealtimeClient::new(client_config(&server), media.clone(), connector.clone()).unwrap();

    let result = client.start_session().await;
    assert!(matches!(result, Err(RealtimeError::Signaling(msg)) if msg.contains("401")));
    assert_eq!(client.session_state(), SessionState::Idle);

    let (transport, _) = connector.last();
    assert!(transport.is_closed());
    assert!(media.tracks()[0].is_stopped());
}

#[tokio::test]
async fn test_remote_close_ends_session() {
    let h = harness().await;
    open_session(&h).await;

    let (transport, events) = h.connector.last();
    events.send(TransportEvent::ChannelClosed).await.unwrap();

    assert!(eventually(|| h.client.session_state() == SessionState::Closed).await);
    assert!(eventually(|| transport.is_closed()).await);
    assert!(!h.client.is_session_active());
    assert!(matches!(
        h.client.send_text_message("anyone there?"),
        Err(RealtimeError::ChannelNotOpen)
    ));

    // A fresh start negotiates a new session
    h.client.start_session().await.unwrap();
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_send_before_open_fails() {
    let h = harness().await;
    assert!(matches!(
        h.client.send_text_message("hi"),
        Err(RealtimeError::ChannelNotOpen)
    ));

    h.client.start_session().await.unwrap();
    assert!(matches!(
        h.client.send_client_event(RealtimeEvent::response_create(None)),
        Err(RealtimeError::ChannelNotOpen)
    ));
}

#[tokio::test]
async fn test_text_message_echo_lands_at_head() {
    let h = harness().await;
    open_session(&h).await;
    let (transport, events) = h.connector.last();
    assert!(eventually(|| transport.sent().len() == 1).await);

    let event_id = h.client.send_text_message("hello").unwrap();
    assert!(eventually(|| transport.sent().len() == 3).await);

    let sent = transport.sent();
    assert_eq!(sent[1]["type"], "conversation.item.create");
    assert_eq!(sent[1]["event_id"], event_id.as_str());
    assert_eq!(sent[2]["type"], "response.create");

    events
        .send(TransportEvent::Message(sent[1].to_string()))
        .await
        .unwrap();
    assert!(
        eventually(|| {
            h.client
                .events()
                .first()
                .is_some_and(|e| e.direction == EventDirection::Inbound)
        })
        .await
    );

    let log = h.client.events();
    assert_eq!(log[0].event.event_id(), Some(event_id.as_str()));
    let occurrences = log
        .iter()
        .filter(|e| e.direction == EventDirection::Inbound)
        .count();
    assert_eq!(occurrences, 1);
}

#[tokio::test]
async fn test_malformed_inbound_is_dropped() {
    let h = harness().await;
    open_session(&h).await;
    let (_, events) = h.connector.last();
    let before = h.client.events().len();

    events
        .send(TransportEvent::Message("{not json".to_string()))
        .await
        .unwrap();
    events
        .send(TransportEvent::Message(
            json!({"type": "rate_limits.updated", "rate_limits": []}).to_string(),
        ))
        .await
        .unwrap();

    assert!(eventually(|| h.client.events().len() == before + 1).await);
    assert!(h.client.is_session_active());
    assert_eq!(h.client.events()[0].event.event_type(), "rate_limits.updated");
}

#[tokio::test]
async fn test_function_call_round_trip() {
    let h = harness().await;
    open_session(&h).await;
    let (transport, events) = h.connector.last();
    assert!(eventually(|| transport.sent().len() == 1).await);

    let done = json!({
        "type": "response.done",
        "event_id": "evt_srv_1",
        "response": {
            "id": "resp_1",
            "status": "completed",
            "output": [{
                "type": "function_call",
                "name": "display_color_palette",
                "call_id": "call_ocean",
                "arguments": json!({
                    "theme": "ocean",
                    "colors": ["#003f5c", "#2f4b7c", "#665191", "#a05195", "#d45087"]
                }).to_string()
            }]
        }
    });
    events
        .send(TransportEvent::Message(done.to_string()))
        .await
        .unwrap();

    assert!(eventually(|| transport.sent().len() == 3).await);
    let sent = transport.sent();
    assert_eq!(sent[1]["item"]["type"], "function_call_output");
    assert_eq!(sent[1]["item"]["call_id"], "call_ocean");
    let output_text = sent[1]["item"]["output"].as_str().unwrap();
    for color in ["#003f5c", "#2f4b7c", "#665191", "#a05195", "#d45087"] {
        assert!(output_text.contains(color), "missing {color}");
    }
    assert_eq!(sent[2]["type"], "response.create");

    match h.client.last_tool_outcome() {
        Some(DispatchOutcome::Completed { tool, output, .. }) => {
            assert_eq!(tool, "display_color_palette");
            assert!(output.display_text.contains("ocean"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_function_call_sends_nothing() {
    let h = harness().await;
    open_session(&h).await;
    let (transport, events) = h.connector.last();
    assert!(eventually(|| transport.sent().len() == 1).await);

    let done = json!({
        "type": "response.done",
        "response": {
            "output": [{
                "type": "function_call",
                "name": "provide_chat_sites_info",
                "call_id": "call_kb",
                "arguments": "{\"topic\":\"pricing\"}"
            }]
        }
    });
    events
        .send(TransportEvent::Message(done.to_string()))
        .await
        .unwrap();

    assert!(eventually(|| h.client.last_tool_outcome().is_some()).await);
    assert!(matches!(
        h.client.last_tool_outcome(),
        Some(DispatchOutcome::Ignored { .. })
    ));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.sent().len(), 1);
}
