//! `provide_chat_sites_info`: answers from a static topic → answer map.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{ToolDescriptor, ToolHandler, ToolOutput};
use crate::core::realtime::{RealtimeError, RealtimeResult};

pub const KNOWLEDGE_BASE_TOOL: &str = "provide_chat_sites_info";

/// Answer used when a topic is not in the map.
pub const NOT_FOUND_ANSWER: &str = "I'm sorry, I couldn't find information on that topic.";

const KNOWLEDGE_BASE_DESCRIPTION: &str = "DO NOT generate a response from model knowledge. \
ALWAYS call this function when a user asks about ChatSites. \
ONLY return data from the knowledge base. \
If no relevant data is found, respond with: \"I couldn't find that information.\"";

const KNOWLEDGE_BASE_FOLLOW_UP: &str = "This response comes from the ChatSites knowledge base. \
Do not override it with model knowledge. If the user needs more info, suggest checking support.";

/// Topic → answer map. Keys are stored lowercased and trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    entries: HashMap<String, String>,
}

fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

impl KnowledgeBase {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (normalize_topic(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Parse a JSON object of topics. Non-string values are kept as their JSON text.
    pub fn from_json(text: &str) -> RealtimeResult<Self> {
        let map: Map<String, Value> = serde_json::from_str(text).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!("knowledge base is not a JSON object: {e}"))
        })?;

        Ok(Self::from_entries(map.into_iter().map(|(k, v)| {
            let answer = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, answer)
        })))
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> RealtimeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!(
                "failed to read knowledge base {}: {e}",
                path.display()
            ))
        })?;
        let kb = Self::from_json(&text)?;
        info!(path = %path.display(), topics = kb.len(), "Loaded knowledge base");
        Ok(kb)
    }

    pub fn lookup(&self, topic: &str) -> Option<&str> {
        self.entries.get(&normalize_topic(topic)).map(String::as_str)
    }

    /// Answer for `topic`, or [`NOT_FOUND_ANSWER`].
    pub fn answer(&self, topic: &str) -> &str {
        self.lookup(topic).unwrap_or(NOT_FOUND_ANSWER)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Knowledge-base responder.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseTool {
    knowledge_base: KnowledgeBase,
}

impl KnowledgeBaseTool {
    pub fn new(knowledge_base: KnowledgeBase) -> Self {
        Self { knowledge_base }
    }
}

#[async_trait]
impl ToolHandler for KnowledgeBaseTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: KNOWLEDGE_BASE_TOOL.to_string(),
            description: KNOWLEDGE_BASE_DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "The topic the user is asking about (e.g., services, pricing, support)."
                    }
                },
                "required": ["topic"]
            }),
        }
    }

    async fn handle(&self, arguments: Value) -> RealtimeResult<ToolOutput> {
        let topic = arguments
            .get("topic")
            .and_then(Value::as_str)
            .ok_or_else(|| RealtimeError::Validation("missing string field 'topic'".to_string()))?;

        let hit = self.knowledge_base.lookup(topic).is_some();
        debug!(topic = %normalize_topic(topic), hit, "Knowledge base lookup");

        Ok(ToolOutput::new(self.knowledge_base.answer(topic))
            .with_follow_up(KNOWLEDGE_BASE_FOLLOW_UP))
    }
}
