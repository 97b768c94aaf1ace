//! Style resolution: named presets, or a free-form description turned into a
//! structured custom style by one text-model call per batch.

use serde::{Deserialize, Serialize};

use crate::models::enums::StylePreset;

use super::types::TextClient;
use super::GenerationError;

/// Asks the text model to normalise a free-form style into fixed JSON keys.
pub const STYLE_PROCESS_PROMPT: &str = r#"You turn a presenter's visual style request into a structured style for an image model that draws presentation slides and posters.

Style request: "{user_style}"

Reply with a JSON object with exactly these keys:
- "style_name": one sentence naming the overall look (e.g. "Retro comic style with bold ink outlines").
- "color_tone": the palette in a few words (e.g. "cream background, red and navy accents").
- "special_elements": recurring characters or motifs that should appear, or "" if none.
- "decorations": background or border ornaments, or "" if none.
- "valid": false when the request is empty, offensive, or not a visual style; true otherwise.
- "error": a short reason when "valid" is false, otherwise null.

The style must keep text readable on a presentation slide."#;

/// Custom style returned by the resolver. Only usable when `valid` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCustomStyle {
    #[serde(default)]
    pub style_name: String,
    #[serde(default)]
    pub color_tone: String,
    #[serde(default)]
    pub special_elements: String,
    #[serde(default)]
    pub decorations: String,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResolvedCustomStyle {
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Style shared by every job in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSpec {
    Preset(StylePreset),
    Custom(ResolvedCustomStyle),
}

impl Default for StyleSpec {
    fn default() -> Self {
        StyleSpec::Preset(StylePreset::Academic)
    }
}

impl StyleSpec {
    /// Name used for layout-table and hint selection.
    pub fn name(&self) -> &'static str {
        match self {
            StyleSpec::Preset(preset) => preset.as_str(),
            StyleSpec::Custom(_) => StylePreset::Custom.as_str(),
        }
    }

    pub fn custom(&self) -> Option<&ResolvedCustomStyle> {
        match self {
            StyleSpec::Custom(style) => Some(style),
            StyleSpec::Preset(_) => None,
        }
    }

    /// An unresolved or invalid custom style fails the whole batch.
    pub fn ensure_usable(&self) -> Result<(), GenerationError> {
        match self {
            StyleSpec::Preset(StylePreset::Custom) => Err(GenerationError::InvalidStyle(
                "custom style selected without a description".into(),
            )),
            StyleSpec::Preset(_) => Ok(()),
            StyleSpec::Custom(style) if style.valid => Ok(()),
            StyleSpec::Custom(style) => Err(GenerationError::InvalidStyle(
                style
                    .error
                    .clone()
                    .unwrap_or_else(|| "style resolver rejected the description".into()),
            )),
        }
    }
}

/// Older names for the themed cartoon preset.
const PLAYFUL_ALIASES: &[&str] = &["doraemon"];

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleRequest {
    Preset(StylePreset),
    Describe(String),
}

impl StyleRequest {
    /// Preset names (and their aliases) map to presets; anything else is a
    /// free-form description.
    pub fn parse(arg: &str) -> Self {
        let trimmed = arg.trim();
        let key = trimmed.to_ascii_lowercase();
        if PLAYFUL_ALIASES.contains(&key.as_str()) {
            return StyleRequest::Preset(StylePreset::Playful);
        }
        match key.parse::<StylePreset>() {
            Ok(StylePreset::Custom) => StyleRequest::Describe(String::new()),
            Ok(preset) => StyleRequest::Preset(preset),
            Err(_) => StyleRequest::Describe(trimmed.to_string()),
        }
    }

    pub fn needs_resolution(&self) -> bool {
        matches!(self, StyleRequest::Describe(_))
    }

    /// Turn the request into a style; custom descriptions cost one text call.
    pub fn resolve(&self, client: &dyn TextClient) -> StyleSpec {
        match self {
            StyleRequest::Preset(preset) => StyleSpec::Preset(*preset),
            StyleRequest::Describe(description) => {
                StyleSpec::Custom(resolve_custom_style(client, description))
            }
        }
    }
}

/// Resolve a free-form description. Never fails: problems come back as
/// `valid = false` with the reason in `error`.
pub fn resolve_custom_style(client: &dyn TextClient, description: &str) -> ResolvedCustomStyle {
    let description = description.trim();
    if description.is_empty() {
        return ResolvedCustomStyle::invalid("style description is empty");
    }

    let _span = tracing::info_span!("resolve_style").entered();
    let prompt = STYLE_PROCESS_PROMPT.replace("{user_style}", description);

    let raw = match client.complete_text(None, &prompt, true) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Style resolution call failed");
            return ResolvedCustomStyle::invalid(e.to_string());
        }
    };

    match serde_json::from_str::<ResolvedCustomStyle>(&raw) {
        Ok(style) => {
            tracing::info!(
                valid = style.valid,
                style_name = %style.style_name,
                "Custom style resolved"
            );
            style
        }
        Err(e) => {
            tracing::warn!(error = %e, "Style resolver returned malformed JSON");
            ResolvedCustomStyle::invalid(format!("malformed style JSON: {e}"))
        }
    }
}
