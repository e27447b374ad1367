//! Tool registry: name → handler, in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{ToolDescriptor, ToolHandler};
use crate::core::realtime::{RealtimeError, RealtimeEvent, RealtimeResult, ToolChoice, ToolDef};

/// Fixed set of tools exposed for one session.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler. Names must be unique and non-empty.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> RealtimeResult<()> {
        let descriptor = handler.descriptor();
        if descriptor.name.trim().is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "tool name must not be empty".to_string(),
            ));
        }
        if self.handlers.contains_key(&descriptor.name) {
            return Err(RealtimeError::DuplicateTool(descriptor.name));
        }

        debug!(tool = %descriptor.name, "Registered tool handler");
        self.handlers.insert(descriptor.name.clone(), handler);
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn tool_defs(&self) -> Vec<ToolDef> {
        self.descriptors.iter().map(ToolDescriptor::to_tool_def).collect()
    }

    /// Build the `session.update` event registering every tool.
    ///
    /// A forced choice must name a registered tool.
    pub fn session_update(&self, tool_choice: &ToolChoice) -> RealtimeResult<RealtimeEvent> {
        if let Some(forced) = tool_choice.forced_function()
            && !self.contains(forced)
        {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "tool_choice forces unregistered tool '{forced}'"
            )));
        }
        Ok(RealtimeEvent::session_update(
            self.tool_defs(),
            tool_choice.clone(),
        ))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
