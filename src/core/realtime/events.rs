//! Realtime structured-event wire types.
//!
//! Every message on the `oai-events` data channel is a single JSON object
//! tagged by its `type` field. The variants below cover the events this
//! client builds or reacts to:
//!
//! Client events (sent to the model):
//! - session.update - Register tools and the tool-choice policy
//! - conversation.item.create - Add a user message or a function call output
//! - response.create - Ask the model to generate a response
//!
//! Server events (received from the model):
//! - response.done - Completed response, possibly carrying `function_call` items
//!
//! Anything else is kept verbatim as [`RealtimeEvent::Unknown`] so it can be
//! logged and rendered without loss.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::base::{RealtimeError, RealtimeResult};

pub const SESSION_UPDATE: &str = "session.update";
pub const CONVERSATION_ITEM_CREATE: &str = "conversation.item.create";
pub const RESPONSE_CREATE: &str = "response.create";
pub const RESPONSE_DONE: &str = "response.done";

const KNOWN_TYPES: &[&str] = &[
    SESSION_UPDATE,
    CONVERSATION_ITEM_CREATE,
    RESPONSE_CREATE,
    RESPONSE_DONE,
];

// =============================================================================
// Session Configuration
// =============================================================================

/// Session fields sent with `session.update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,

    /// Tool choice strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Temperature for response generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Fields not modelled above, kept for the wire
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tool definition as the provider expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters JSON schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Built-in tool selection modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    /// The model decides whether to call a tool
    Auto,
    /// The model never calls tools
    None,
    /// The model must call some tool
    Required,
}

/// Forced selection of one specific function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionChoice {
    #[serde(rename = "type")]
    pub choice_type: String,
    pub name: String,
}

/// Tool-selection policy: `"auto"` or `{"type": "function", "name": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Function(FunctionChoice),
}

impl ToolChoice {
    /// Let the model decide.
    pub fn auto() -> Self {
        ToolChoice::Mode(ToolChoiceMode::Auto)
    }

    /// Always call the named function.
    pub fn function(name: impl Into<String>) -> Self {
        ToolChoice::Function(FunctionChoice {
            choice_type: "function".to_string(),
            name: name.into(),
        })
    }

    /// Name of the forced function, if any.
    pub fn forced_function(&self) -> Option<&str> {
        match self {
            ToolChoice::Function(choice) => Some(choice.name.as_str()),
            ToolChoice::Mode(_) => None,
        }
    }
}

impl Default for ToolChoice {
    fn default() -> Self {
        Self::auto()
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type (message, function_call, function_call_output)
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Item role (user, assistant, system)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    /// Call ID for function call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Function name for function call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function arguments for function call (JSON-encoded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Function output for function call result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationItem {
    fn empty(item_type: &str) -> Self {
        Self {
            id: None,
            item_type: item_type.to_string(),
            status: None,
            role: None,
            content: None,
            call_id: None,
            name: None,
            arguments: None,
            output: None,
            extra: Map::new(),
        }
    }

    /// A user text message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            content: Some(vec![ContentPart::input_text(text)]),
            ..Self::empty("message")
        }
    }

    /// The result of a function call, keyed by `call_id`.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: Some(call_id.into()),
            output: Some(output.into()),
            ..Self::empty("function_call_output")
        }
    }
}

/// Content part within a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, input_audio, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Transcript of audio content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    pub fn input_text(text: impl Into<String>) -> Self {
        Self {
            content_type: "input_text".to_string(),
            text: Some(text.into()),
            transcript: None,
            extra: Map::new(),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Options for `response.create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Response modalities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    /// Instructions for this response only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response body carried by `response.done`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Output items
    #[serde(default)]
    pub output: Vec<ConversationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, parsed by the dispatcher
    pub arguments: String,
    pub call_id: String,
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdateEvent {
    pub session: SessionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItemCreateEvent {
    pub item: ConversationItem,
    /// Previous item ID to insert after
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCreateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDoneEvent {
    pub response: Response,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One structured event, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    SessionUpdate(SessionUpdateEvent),
    ConversationItemCreate(ConversationItemCreateEvent),
    ResponseCreate(ResponseCreateEvent),
    ResponseDone(ResponseDoneEvent),
    /// Unrecognised `type`, preserved verbatim
    Unknown(Value),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum TaggedRef<'a> {
    #[serde(rename = "session.update")]
    SessionUpdate(&'a SessionUpdateEvent),
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate(&'a ConversationItemCreateEvent),
    #[serde(rename = "response.create")]
    ResponseCreate(&'a ResponseCreateEvent),
    #[serde(rename = "response.done")]
    ResponseDone(&'a ResponseDoneEvent),
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Tagged {
    #[serde(rename = "session.update")]
    SessionUpdate(SessionUpdateEvent),
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate(ConversationItemCreateEvent),
    #[serde(rename = "response.create")]
    ResponseCreate(ResponseCreateEvent),
    #[serde(rename = "response.done")]
    ResponseDone(ResponseDoneEvent),
}

impl From<Tagged> for RealtimeEvent {
    fn from(tagged: Tagged) -> Self {
        match tagged {
            Tagged::SessionUpdate(e) => RealtimeEvent::SessionUpdate(e),
            Tagged::ConversationItemCreate(e) => RealtimeEvent::ConversationItemCreate(e),
            Tagged::ResponseCreate(e) => RealtimeEvent::ResponseCreate(e),
            Tagged::ResponseDone(e) => RealtimeEvent::ResponseDone(e),
        }
    }
}

impl Serialize for RealtimeEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RealtimeEvent::SessionUpdate(e) => TaggedRef::SessionUpdate(e).serialize(serializer),
            RealtimeEvent::ConversationItemCreate(e) => {
                TaggedRef::ConversationItemCreate(e).serialize(serializer)
            }
            RealtimeEvent::ResponseCreate(e) => TaggedRef::ResponseCreate(e).serialize(serializer),
            RealtimeEvent::ResponseDone(e) => TaggedRef::ResponseDone(e).serialize(serializer),
            RealtimeEvent::Unknown(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RealtimeEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl RealtimeEvent {
    /// Decode a wire message.
    pub fn from_json(text: &str) -> RealtimeResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| RealtimeError::MalformedEvent(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: Value) -> RealtimeResult<Self> {
        let Some(event_type) = value.get("type").and_then(Value::as_str) else {
            return Err(RealtimeError::MalformedEvent(
                "event is not an object with a string `type` field".to_string(),
            ));
        };

        if !KNOWN_TYPES.contains(&event_type) {
            return Ok(RealtimeEvent::Unknown(value));
        }

        let event_type = event_type.to_string();
        serde_json::from_value::<Tagged>(value)
            .map(RealtimeEvent::from)
            .map_err(|e| RealtimeError::MalformedEvent(format!("{event_type}: {e}")))
    }

    /// Encode for the wire.
    pub fn to_json(&self) -> RealtimeResult<String> {
        serde_json::to_string(self).map_err(|e| RealtimeError::MalformedEvent(e.to_string()))
    }

    /// The `type` tag.
    pub fn event_type(&self) -> &str {
        match self {
            RealtimeEvent::SessionUpdate(_) => SESSION_UPDATE,
            RealtimeEvent::ConversationItemCreate(_) => CONVERSATION_ITEM_CREATE,
            RealtimeEvent::ResponseCreate(_) => RESPONSE_CREATE,
            RealtimeEvent::ResponseDone(_) => RESPONSE_DONE,
            RealtimeEvent::Unknown(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            RealtimeEvent::SessionUpdate(e) => e.event_id.as_deref(),
            RealtimeEvent::ConversationItemCreate(e) => e.event_id.as_deref(),
            RealtimeEvent::ResponseCreate(e) => e.event_id.as_deref(),
            RealtimeEvent::ResponseDone(e) => e.event_id.as_deref(),
            RealtimeEvent::Unknown(value) => value.get("event_id").and_then(Value::as_str),
        }
    }

    /// Assign a fresh UUID as `event_id` unless one is already present and non-empty.
    ///
    /// Returns the event's id after assignment.
    pub fn ensure_event_id(&mut self) -> String {
        if let Some(existing) = self.event_id().filter(|id| !id.is_empty()) {
            return existing.to_string();
        }

        let id = uuid::Uuid::new_v4().to_string();
        match self {
            RealtimeEvent::SessionUpdate(e) => e.event_id = Some(id.clone()),
            RealtimeEvent::ConversationItemCreate(e) => e.event_id = Some(id.clone()),
            RealtimeEvent::ResponseCreate(e) => e.event_id = Some(id.clone()),
            RealtimeEvent::ResponseDone(e) => e.event_id = Some(id.clone()),
            RealtimeEvent::Unknown(value) => {
                if let Some(map) = value.as_object_mut() {
                    map.insert("event_id".to_string(), Value::String(id.clone()));
                }
            }
        }
        id
    }

    /// Function calls carried as `function_call` output items of a completed response.
    ///
    /// Items missing a name, call id or arguments are skipped.
    pub fn function_calls(&self) -> Vec<FunctionCall> {
        let RealtimeEvent::ResponseDone(done) = self else {
            return Vec::new();
        };

        done.response
            .output
            .iter()
            .filter(|item| item.item_type == "function_call")
            .filter_map(|item| {
                Some(FunctionCall {
                    name: item.name.clone()?,
                    arguments: item.arguments.clone()?,
                    call_id: item.call_id.clone()?,
                })
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    /// `session.update` registering a tool set.
    pub fn session_update(tools: Vec<ToolDef>, tool_choice: ToolChoice) -> Self {
        RealtimeEvent::SessionUpdate(SessionUpdateEvent {
            session: SessionConfig {
                tools: Some(tools),
                tool_choice: Some(tool_choice),
                ..Default::default()
            },
            event_id: None,
            extra: Map::new(),
        })
    }

    /// `conversation.item.create` for an arbitrary item.
    pub fn conversation_item(item: ConversationItem) -> Self {
        RealtimeEvent::ConversationItemCreate(ConversationItemCreateEvent {
            item,
            previous_item_id: None,
            event_id: None,
            extra: Map::new(),
        })
    }

    /// `conversation.item.create` carrying a user text message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::conversation_item(ConversationItem::user_text(text))
    }

    /// `conversation.item.create` carrying a function call result.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::conversation_item(ConversationItem::function_call_output(call_id, output))
    }

    /// `response.create`, optionally with per-response instructions.
    pub fn response_create(instructions: Option<String>) -> Self {
        RealtimeEvent::ResponseCreate(ResponseCreateEvent {
            response: instructions.map(|instructions| ResponseConfig {
                instructions: Some(instructions),
                ..Default::default()
            }),
            event_id: None,
            extra: Map::new(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_text_wire_shape() {
        let event = RealtimeEvent::user_text("hello");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "message",
                    "role": "user",
                    "content": [{"type": "input_text", "text": "hello"}]
                }
            })
        );
    }

    #[test]
    fn test_session_update_with_forced_function() {
        let event = RealtimeEvent::session_update(
            vec![ToolDef {
                tool_type: "function".to_string(),
                name: "provide_chat_sites_info".to_string(),
                description: Some("Knowledge base".to_string()),
                parameters: Some(json!({"type": "object"})),
                extra: Map::new(),
            }],
            ToolChoice::function("provide_chat_sites_info"),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "session.update");
        assert_eq!(value["session"]["tools"][0]["type"], "function");
        assert_eq!(
            value["session"]["tool_choice"],
            json!({"type": "function", "name": "provide_chat_sites_info"})
        );
    }

    #[test]
    fn test_tool_choice_auto_serializes_as_string() {
        let value = serde_json::to_value(ToolChoice::auto()).unwrap();
        assert_eq!(value, json!("auto"));
        let parsed: ToolChoice = serde_json::from_value(json!("auto")).unwrap();
        assert_eq!(parsed, ToolChoice::auto());
    }

    #[test]
    fn test_response_create_without_instructions() {
        let value = serde_json::to_value(RealtimeEvent::response_create(None)).unwrap();
        assert_eq!(value, json!({"type": "response.create"}));
    }

    #[test]
    fn test_function_call_output_item() {
        let value =
            serde_json::to_value(RealtimeEvent::function_call_output("call_1", "done")).unwrap();
        assert_eq!(value["item"]["type"], "function_call_output");
        assert_eq!(value["item"]["call_id"], "call_1");
        assert_eq!(value["item"]["output"], "done");
    }

    #[test]
    fn test_response_done_function_calls() {
        let json = r##"{
            "type": "response.done",
            "event_id": "evt_1",
            "response": {
                "id": "resp_1",
                "object": "realtime.response",
                "status": "completed",
                "output": [
                    {"type": "message", "role": "assistant"},
                    {
                        "type": "function_call",
                        "name": "display_color_palette",
                        "call_id": "call_9",
                        "arguments": "{\"theme\":\"ocean\"}"
                    }
                ]
            }
        }"##;
        let event = RealtimeEvent::from_json(json).unwrap();
        assert_eq!(event.event_type(), "response.done");
        assert_eq!(event.event_id(), Some("evt_1"));

        let calls = event.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "display_color_palette");
        assert_eq!(calls[0].call_id, "call_9");
    }

    #[test]
    fn test_unknown_event_preserved() {
        let json = r#"{"type":"response.audio_transcript.delta","delta":"Hi","event_id":"e"}"#;
        let event = RealtimeEvent::from_json(json).unwrap();
        assert_eq!(event.event_type(), "response.audio_transcript.delta");
        assert!(matches!(event, RealtimeEvent::Unknown(_)));
        let back: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(back, serde_json::from_str::<Value>(json).unwrap());
        assert!(event.function_calls().is_empty());
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            RealtimeEvent::from_json("{not json"),
            Err(RealtimeError::MalformedEvent(_))
        ));
        assert!(matches!(
            RealtimeEvent::from_json(r#"{"no_type": true}"#),
            Err(RealtimeError::MalformedEvent(_))
        ));
        assert!(matches!(
            RealtimeEvent::from_json("[1, 2]"),
            Err(RealtimeError::MalformedEvent(_))
        ));
        // Known type with an invalid payload
        assert!(matches!(
            RealtimeEvent::from_json(r#"{"type":"response.done","response":"nope"}"#),
            Err(RealtimeError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_ensure_event_id_keeps_existing() {
        let mut event = RealtimeEvent::response_create(None);
        let first = event.ensure_event_id();
        assert!(!first.is_empty());
        assert_eq!(event.ensure_event_id(), first);
    }

    #[test]
    fn test_known_events_keep_unmodelled_fields() {
        let cases = [
            json!({
                "type": "session.update",
                "event_id": "evt_a",
                "session": {
                    "tools": [],
                    "temperature": 0.8,
                    "turn_detection": {"type": "server_vad", "silence_duration_ms": 500},
                    "input_audio_transcription": {"model": "whisper-1"}
                }
            }),
            json!({
                "type": "conversation.item.create",
                "previous_item_id": "item_0",
                "item": {
                    "id": "item_1",
                    "object": "realtime.item",
                    "type": "message",
                    "role": "user",
                    "content": [{"type": "input_audio", "audio": "AAAA"}]
                }
            }),
            json!({
                "type": "response.create",
                "response": {
                    "instructions": "x",
                    "conversation": "none",
                    "tool_choice": "none",
                    "max_output_tokens": 200
                }
            }),
            json!({
                "type": "response.done",
                "event_id": "evt_srv",
                "response": {
                    "id": "resp_1",
                    "object": "realtime.response",
                    "status": "incomplete",
                    "status_details": {"type": "incomplete", "reason": "max_output_tokens"},
                    "conversation_id": "conv_1",
                    "output": [{
                        "id": "item_9",
                        "object": "realtime.item",
                        "type": "function_call",
                        "status": "completed",
                        "name": "display_color_palette",
                        "call_id": "call_1",
                        "arguments": "{}"
                    }]
                }
            }),
        ];

        for input in cases {
            let event = RealtimeEvent::from_value(input.clone()).unwrap();
            assert!(!matches!(event, RealtimeEvent::Unknown(_)));
            let output: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
            assert_eq!(output, input);
        }
    }

    #[test]
    fn test_builders_have_no_extra_fields() {
        let value = serde_json::to_value(RealtimeEvent::function_call_output("c", "o")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "conversation.item.create",
                "item": {"type": "function_call_output", "call_id": "c", "output": "o"}
            })
        );
    }

    #[test]
    fn test_ensure_event_id_on_unknown() {
        let mut event = RealtimeEvent::Unknown(json!({"type": "input_audio_buffer.clear"}));
        let id = event.ensure_event_id();
        assert_eq!(event.event_id(), Some(id.as_str()));
    }
}
