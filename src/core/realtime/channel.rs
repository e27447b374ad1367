//! Session channel: the structured-event stream of one session.
//!
//! The channel owns its state machine (`Connecting -> Open -> Closed`) and a
//! bounded, newest-first event log. All mutation goes through a single mutex.
//! Outbound messages are queued for the session driver, which forwards them
//! to the peer transport.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::base::{ChannelState, RealtimeError, RealtimeResult};
use super::events::RealtimeEvent;

/// Capacity of the notification broadcast used by observers.
const NOTICE_CHANNEL_CAPACITY: usize = 256;

/// Direction of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventDirection {
    /// Client to model
    Outbound,
    /// Model to client
    Inbound,
}

/// One entry of the event log.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    pub direction: EventDirection,
    pub event: RealtimeEvent,
    pub at: DateTime<Utc>,
}

/// Bounded newest-first event log.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<LoggedEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Insert at the head, evicting the oldest entry when full.
    pub fn push(&mut self, entry: LoggedEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent entry.
    pub fn head(&self) -> Option<&LoggedEvent> {
        self.entries.front()
    }

    /// Newest-first copy of the log.
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.entries.iter().cloned().collect()
    }
}

/// Change notifications for observers (UI, CLI).
#[derive(Debug, Clone)]
pub enum ChannelNotice {
    Opened,
    Logged(LoggedEvent),
    Closed,
}

struct ChannelInner {
    state: ChannelState,
    log: EventLog,
}

/// The structured-event channel of one session.
pub struct SessionChannel {
    inner: Mutex<ChannelInner>,
    outbound: mpsc::UnboundedSender<String>,
    state_tx: watch::Sender<ChannelState>,
    notices: broadcast::Sender<ChannelNotice>,
}

impl SessionChannel {
    /// Create a channel in the `Connecting` state.
    ///
    /// Returns the channel and the queue of encoded outbound messages the
    /// session driver must forward to the transport.
    pub fn new(log_capacity: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ChannelState::Connecting);
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);

        let channel = Arc::new(Self {
            inner: Mutex::new(ChannelInner {
                state: ChannelState::Connecting,
                log: EventLog::new(log_capacity),
            }),
            outbound,
            state_tx,
            notices,
        });
        (channel, outbound_rx)
    }

    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Handle the transport's open signal.
    ///
    /// Resets the event log and wakes anyone waiting in [`wait_open`](Self::wait_open).
    /// Returns `false` if the channel was not `Connecting`.
    pub fn mark_open(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state != ChannelState::Connecting {
                debug!(state = %inner.state, "Ignoring open signal");
                return false;
            }
            inner.state = ChannelState::Open;
            inner.log.clear();
        }

        info!("Event channel open");
        self.state_tx.send_replace(ChannelState::Open);
        let _ = self.notices.send(ChannelNotice::Opened);
        true
    }

    /// Move to the terminal `Closed` state. Returns `false` if already closed.
    pub fn mark_closed(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state == ChannelState::Closed {
                return false;
            }
            inner.state = ChannelState::Closed;
        }

        info!("Event channel closed");
        self.state_tx.send_replace(ChannelState::Closed);
        let _ = self.notices.send(ChannelNotice::Closed);
        true
    }

    /// Wait until the channel leaves `Connecting`. Returns whether it is open.
    pub async fn wait_open(&self) -> bool {
        let mut rx = self.state_tx.subscribe();
        match rx.wait_for(|state| *state != ChannelState::Connecting).await {
            Ok(state) => *state == ChannelState::Open,
            Err(_) => false,
        }
    }

    /// Send one event.
    ///
    /// Assigns an `event_id` if absent, queues the encoded event for the
    /// transport and appends it to the log. Returns the event id.
    pub fn send(&self, mut event: RealtimeEvent) -> RealtimeResult<String> {
        let mut inner = self.inner.lock();
        if inner.state != ChannelState::Open {
            return Err(RealtimeError::ChannelNotOpen);
        }

        let event_id = event.ensure_event_id();
        let json = event.to_json()?;
        self.outbound
            .send(json)
            .map_err(|_| RealtimeError::ChannelNotOpen)?;

        debug!(event_type = event.event_type(), event_id = %event_id, "Sent client event");
        let entry = LoggedEvent {
            direction: EventDirection::Outbound,
            event,
            at: Utc::now(),
        };
        inner.log.push(entry.clone());
        drop(inner);

        let _ = self.notices.send(ChannelNotice::Logged(entry));
        Ok(event_id)
    }

    /// Handle one inbound wire message.
    ///
    /// Malformed messages are logged and returned as an error for the caller to
    /// drop; the channel state is never affected by them.
    pub fn receive(&self, text: &str) -> RealtimeResult<RealtimeEvent> {
        let event = match RealtimeEvent::from_json(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, bytes = text.len(), "Dropping malformed inbound event");
                return Err(e);
            }
        };

        let entry = {
            let mut inner = self.inner.lock();
            if inner.state == ChannelState::Closed {
                debug!("Dropping inbound event after close");
                return Err(RealtimeError::ChannelNotOpen);
            }
            let entry = LoggedEvent {
                direction: EventDirection::Inbound,
                event: event.clone(),
                at: Utc::now(),
            };
            inner.log.push(entry.clone());
            entry
        };

        debug!(event_type = event.event_type(), "Received server event");
        let _ = self.notices.send(ChannelNotice::Logged(entry));
        Ok(event)
    }

    /// Newest-first snapshot of the event log.
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.inner.lock().log.snapshot()
    }

    /// Number of retained events.
    pub fn event_count(&self) -> usize {
        self.inner.lock().log.len()
    }

    /// Subscribe to channel notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelNotice> {
        self.notices.subscribe()
    }
}
