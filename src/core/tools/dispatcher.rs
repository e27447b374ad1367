//! Tool registration and function-call routing for one session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ToolOutput, ToolRegistry};
use crate::core::realtime::{
    FunctionCall, RealtimeError, RealtimeEvent, RealtimeResult, SessionChannel, ToolChoice,
};

/// Result of a [`ToolDispatcher::register_tools`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// `session.update` was sent now
    Sent,
    /// A previous call already sent it
    AlreadyRegistered,
    /// Channel not open yet; a retry is waiting for it
    Deferred,
}

/// What happened to one function call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DispatchOutcome {
    /// No handler registered under the name
    Ignored { tool: String, call_id: String },
    /// Handler ran; result injected
    Completed {
        tool: String,
        call_id: String,
        output: ToolOutput,
    },
    /// Per-call error; error result injected
    Failed {
        tool: String,
        call_id: String,
        error: String,
    },
}

impl DispatchOutcome {
    pub fn call_id(&self) -> &str {
        match self {
            Self::Ignored { call_id, .. }
            | Self::Completed { call_id, .. }
            | Self::Failed { call_id, .. } => call_id,
        }
    }
}

/// Per-session tool dispatcher.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    tool_choice: ToolChoice,
    retry_delay: Duration,
    registered: AtomicBool,
    retry_pending: AtomicBool,
    cancel: CancellationToken,
    last_outcome: Mutex<Option<DispatchOutcome>>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, tool_choice: ToolChoice, retry_delay: Duration) -> Self {
        Self {
            registry,
            tool_choice,
            retry_delay,
            registered: AtomicBool::new(false),
            retry_pending: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            last_outcome: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Most recent dispatch outcome, for UI rendering.
    pub fn last_outcome(&self) -> Option<DispatchOutcome> {
        self.last_outcome.lock().clone()
    }

    /// Abort a pending registration retry. Called when the session stops.
    pub fn cancel_pending(&self) {
        self.cancel.cancel();
    }

    /// Send the `session.update` registering every tool, at most once.
    ///
    /// When the channel is still connecting, a task waits for it to open,
    /// bounded by the retry delay, and registers then.
    pub fn register_tools(
        self: &Arc<Self>,
        channel: &Arc<SessionChannel>,
    ) -> RealtimeResult<RegistrationStatus> {
        if self.is_registered() {
            return Ok(RegistrationStatus::AlreadyRegistered);
        }

        if !channel.is_open() {
            self.schedule_retry(channel);
            return Ok(RegistrationStatus::Deferred);
        }

        self.send_registration(channel)
    }

    fn send_registration(&self, channel: &SessionChannel) -> RealtimeResult<RegistrationStatus> {
        let update = self.registry.session_update(&self.tool_choice)?;

        if self.registered.swap(true, Ordering::SeqCst) {
            return Ok(RegistrationStatus::AlreadyRegistered);
        }

        match channel.send(update) {
            Ok(event_id) => {
                info!(
                    event_id = %event_id,
                    tools = ?self.registry.names(),
                    "Registered tools with session"
                );
                Ok(RegistrationStatus::Sent)
            }
            Err(e) => {
                self.registered.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, channel: &Arc<SessionChannel>) {
        if self.retry_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!(
            delay_ms = self.retry_delay.as_millis() as u64,
            "Event channel not open yet, deferring tool registration"
        );

        let dispatcher = Arc::clone(self);
        let channel = Arc::clone(channel);
        tokio::spawn(async move {
            let opened = tokio::select! {
                _ = dispatcher.cancel.cancelled() => {
                    debug!("Tool registration retry cancelled");
                    None
                }
                result = tokio::time::timeout(dispatcher.retry_delay, channel.wait_open()) => {
                    Some(matches!(result, Ok(true)))
                }
            };
            dispatcher.retry_pending.store(false, Ordering::SeqCst);

            match opened {
                Some(true) => {
                    if let Err(e) = dispatcher.send_registration(&channel) {
                        warn!(error = %e, "Deferred tool registration failed");
                    }
                }
                Some(false) => {
                    warn!("Event channel still not open, tool registration skipped");
                }
                None => {}
            }
        });
    }

    /// Route every `function_call` item of a `response.done` event.
    ///
    /// Other events produce no outcomes. Per-call errors are injected into the
    /// conversation and never returned.
    pub async fn dispatch(
        &self,
        event: &RealtimeEvent,
        channel: &SessionChannel,
    ) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        for call in event.function_calls() {
            let outcome = self.dispatch_call(call, channel).await;
            *self.last_outcome.lock() = Some(outcome.clone());
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn dispatch_call(&self, call: FunctionCall, channel: &SessionChannel) -> DispatchOutcome {
        let Some(handler) = self.registry.get(&call.name) else {
            debug!(tool = %call.name, call_id = %call.call_id, "No handler for function call");
            return DispatchOutcome::Ignored {
                tool: call.name,
                call_id: call.call_id,
            };
        };

        info!(tool = %call.name, call_id = %call.call_id, "Dispatching function call");
        let result = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(arguments) => handler.handle(arguments).await,
            Err(e) => Err(RealtimeError::ArgumentParse(e.to_string())),
        };

        match result {
            Ok(output) => {
                inject(
                    channel,
                    &call.call_id,
                    output.display_text.clone(),
                    output.follow_up_instructions.clone(),
                );
                DispatchOutcome::Completed {
                    tool: call.name,
                    call_id: call.call_id,
                    output,
                }
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.call_id, error = %e, "Function call failed");
                let error = e.to_string();
                inject(
                    channel,
                    &call.call_id,
                    json!({ "error": error }).to_string(),
                    None,
                );
                DispatchOutcome::Failed {
                    tool: call.name,
                    call_id: call.call_id,
                    error,
                }
            }
        }
    }
}

/// Send the `function_call_output` item and the follow-up `response.create`.
fn inject(channel: &SessionChannel, call_id: &str, output: String, instructions: Option<String>) {
    if let Err(e) = channel.send(RealtimeEvent::function_call_output(call_id, output)) {
        warn!(call_id = %call_id, error = %e, "Failed to send function call output");
        return;
    }
    if let Err(e) = channel.send(RealtimeEvent::response_create(instructions)) {
        warn!(call_id = %call_id, error = %e, "Failed to request follow-up response");
    }
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("registry", &self.registry)
            .field("tool_choice", &self.tool_choice)
            .field("registered", &self.is_registered())
            .finish()
    }
}
