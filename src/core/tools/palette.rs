//! `display_color_palette`: renders a five-color palette for a theme.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolDescriptor, ToolHandler, ToolOutput};
use crate::core::realtime::{RealtimeError, RealtimeResult};

pub const PALETTE_TOOL: &str = "display_color_palette";

/// Number of colors a palette must contain.
pub const PALETTE_COLOR_COUNT: usize = 5;

const PALETTE_FOLLOW_UP: &str = "Ask the user if they like the color palette.";

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap_or_else(|e| panic!("invalid hex color pattern: {e}"))
});

#[derive(Debug, Deserialize)]
struct PaletteArgs {
    theme: String,
    colors: Vec<String>,
}

/// Color palette generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteTool;

impl PaletteTool {
    fn validate(args: &PaletteArgs) -> RealtimeResult<()> {
        if args.theme.trim().is_empty() {
            return Err(RealtimeError::Validation("theme must not be empty".to_string()));
        }
        if args.colors.len() != PALETTE_COLOR_COUNT {
            return Err(RealtimeError::Validation(format!(
                "expected {PALETTE_COLOR_COUNT} colors, got {}",
                args.colors.len()
            )));
        }
        if let Some(bad) = args.colors.iter().find(|c| !HEX_COLOR.is_match(c)) {
            return Err(RealtimeError::Validation(format!(
                "'{bad}' is not a #RRGGBB color"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ToolHandler for PaletteTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: PALETTE_TOOL.to_string(),
            description: "Call this function when a user asks for a color palette.".to_string(),
            parameters: json!({
                "type": "object",
                "strict": true,
                "properties": {
                    "theme": {
                        "type": "string",
                        "description": "Description of the theme for the color scheme."
                    },
                    "colors": {
                        "type": "array",
                        "description": "Array of five hex color codes based on the theme.",
                        "items": {
                            "type": "string",
                            "description": "Hex color code"
                        }
                    }
                },
                "required": ["theme", "colors"]
            }),
        }
    }

    async fn handle(&self, arguments: Value) -> RealtimeResult<ToolOutput> {
        let args: PaletteArgs = serde_json::from_value(arguments)
            .map_err(|e| RealtimeError::Validation(e.to_string()))?;
        Self::validate(&args)?;

        let display = format!(
            "Theme: {}\nColors: {}",
            args.theme.trim(),
            args.colors.join(", ")
        );
        Ok(ToolOutput::new(display).with_follow_up(PALETTE_FOLLOW_UP))
    }
}
