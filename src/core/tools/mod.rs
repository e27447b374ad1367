//! Application-defined tools the model can call.
//!
//! # Architecture
//!
//! - [`ToolHandler`] is the capability trait; handlers are pure with respect
//!   to the channel and return a [`ToolOutput`].
//! - [`ToolRegistry`] maps tool names to handlers and rejects duplicates.
//! - [`ToolDispatcher`] performs the one-time `session.update` registration and
//!   routes `function_call` items to handlers, re-injecting their results.
//! - [`ToolProfile`] selects one of the predefined tool sets.

mod dispatcher;
mod knowledge_base;
mod palette;
mod registry;

pub use dispatcher::{DispatchOutcome, RegistrationStatus, ToolDispatcher};
pub use knowledge_base::{KNOWLEDGE_BASE_TOOL, KnowledgeBase, KnowledgeBaseTool, NOT_FOUND_ANSWER};
pub use palette::{PALETTE_COLOR_COUNT, PALETTE_TOOL, PaletteTool};
pub use registry::ToolRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::realtime::{RealtimeResult, ToolChoice, ToolDef};

/// Declared shape of one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// JSON schema for the arguments object
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Provider wire form.
    pub fn to_tool_def(&self) -> ToolDef {
        ToolDef {
            tool_type: "function".to_string(),
            name: self.name.clone(),
            description: Some(self.description.clone()),
            parameters: Some(self.parameters.clone()),
            extra: Default::default(),
        }
    }
}

/// Result of a successful tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text fed back to the model and shown in the UI
    pub display_text: String,
    /// Instructions attached to the follow-up `response.create`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_instructions: Option<String>,
}

impl ToolOutput {
    pub fn new(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            follow_up_instructions: None,
        }
    }

    pub fn with_follow_up(mut self, instructions: impl Into<String>) -> Self {
        self.follow_up_instructions = Some(instructions.into());
        self
    }
}

/// A tool the model can invoke.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and argument schema.
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute with already-parsed arguments.
    async fn handle(&self, arguments: Value) -> RealtimeResult<ToolOutput>;
}

/// Predefined tool sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolProfile {
    /// Palette generator, model decides
    #[default]
    ColorPalette,
    /// Knowledge-base attendant, always called
    WebsiteAttendant,
    /// Both tools, model decides
    All,
}

impl ToolProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColorPalette => "color-palette",
            Self::WebsiteAttendant => "website-attendant",
            Self::All => "all",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "color-palette" | "palette" => Self::ColorPalette,
            "website-attendant" | "attendant" | "knowledge-base" => Self::WebsiteAttendant,
            "all" => Self::All,
            _ => Self::default(),
        }
    }

    /// Build the registry for this profile.
    pub fn build_registry(&self, knowledge_base: KnowledgeBase) -> RealtimeResult<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        match self {
            Self::ColorPalette => {
                registry.register(Arc::new(PaletteTool))?;
            }
            Self::WebsiteAttendant => {
                registry.register(Arc::new(KnowledgeBaseTool::new(knowledge_base)))?;
            }
            Self::All => {
                registry.register(Arc::new(KnowledgeBaseTool::new(knowledge_base)))?;
                registry.register(Arc::new(PaletteTool))?;
            }
        }
        Ok(registry)
    }

    /// Tool-selection policy for this profile.
    pub fn tool_choice(&self) -> ToolChoice {
        match self {
            Self::WebsiteAttendant => ToolChoice::function(KNOWLEDGE_BASE_TOOL),
            Self::ColorPalette | Self::All => ToolChoice::auto(),
        }
    }
}

impl std::fmt::Display for ToolProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parsing() {
        assert_eq!(
            ToolProfile::from_str_or_default("color_palette"),
            ToolProfile::ColorPalette
        );
        assert_eq!(
            ToolProfile::from_str_or_default("Website-Attendant"),
            ToolProfile::WebsiteAttendant
        );
        assert_eq!(ToolProfile::from_str_or_default("all"), ToolProfile::All);
        assert_eq!(
            ToolProfile::from_str_or_default("bogus"),
            ToolProfile::ColorPalette
        );
    }

    #[test]
    fn test_profile_registries() {
        let palette = ToolProfile::ColorPalette
            .build_registry(KnowledgeBase::default())
            .unwrap();
        assert_eq!(palette.names(), vec![PALETTE_TOOL]);

        let all = ToolProfile::All
            .build_registry(KnowledgeBase::default())
            .unwrap();
        assert_eq!(all.names(), vec![KNOWLEDGE_BASE_TOOL, PALETTE_TOOL]);
    }

    #[test]
    fn test_attendant_forces_its_tool() {
        assert_eq!(
            ToolProfile::WebsiteAttendant.tool_choice().forced_function(),
            Some(KNOWLEDGE_BASE_TOOL)
        );
        assert_eq!(ToolProfile::All.tool_choice(), ToolChoice::auto());
    }

    #[test]
    fn test_descriptor_to_tool_def() {
        let def = PaletteTool.descriptor().to_tool_def();
        assert_eq!(def.tool_type, "function");
        assert_eq!(def.name, PALETTE_TOOL);
        assert!(def.parameters.is_some());
    }
}
