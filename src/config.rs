use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::generation::GenerationError;

/// Application-level constants
pub const APP_NAME: &str = "Deckgen";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default OpenAI-compatible endpoint for the image model.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-3-pro-image-preview";

/// Default endpoint for the text model (style resolution, narrative notes).
pub const DEFAULT_TEXT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEXT_MODEL: &str = "openai/gpt-4o-mini";

/// Five minutes: image generation round trips are slow.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Planner checkpoint filename, also used as the import sidecar.
pub const PLAN_CHECKPOINT_FILENAME: &str = "checkpoint_plan.json";

/// Assembled deck filename.
pub const SLIDES_PDF_FILENAME: &str = "slides.pdf";
pub const SLIDES_PPTX_FILENAME: &str = "slides.pptx";

/// Tracing filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "deckgen=info"
}

pub fn debug_log_filter() -> &'static str {
    "deckgen=debug"
}

/// Default root for generated runs: `./outputs` relative to the working directory.
pub fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

/// Credentials and endpoint for one OpenAI-compatible service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl EndpointSettings {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Runtime settings for the generation pipeline, read from the environment.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub image: EndpointSettings,
    pub text: EndpointSettings,
    pub timeout_secs: u64,
}

impl GenerationSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let timeout_secs = lookup("DECKGEN_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            image: EndpointSettings {
                api_key: get("IMAGE_GEN_API_KEY", ""),
                base_url: get("IMAGE_GEN_BASE_URL", DEFAULT_IMAGE_BASE_URL),
                model: get("IMAGE_GEN_MODEL", DEFAULT_IMAGE_MODEL),
            },
            text: EndpointSettings {
                api_key: get("RAG_LLM_API_KEY", ""),
                base_url: get("RAG_LLM_BASE_URL", DEFAULT_TEXT_BASE_URL),
                model: get("LLM_MODEL", DEFAULT_TEXT_MODEL),
            },
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Image endpoint, or a configuration error when no key is set.
    pub fn require_image(&self) -> Result<&EndpointSettings, GenerationError> {
        if self.image.has_credentials() {
            Ok(&self.image)
        } else {
            Err(GenerationError::MissingCredentials("IMAGE_GEN_API_KEY".into()))
        }
    }

    /// Endpoint for text calls: the text service when configured, else the
    /// image service (same OpenAI-compatible surface, text model swapped in).
    pub fn resolve_text(&self) -> Result<EndpointSettings, GenerationError> {
        if self.text.has_credentials() {
            return Ok(self.text.clone());
        }
        if self.image.has_credentials() {
            return Ok(EndpointSettings {
                api_key: self.image.api_key.clone(),
                base_url: self.image.base_url.clone(),
                model: self.text.model.clone(),
            });
        }
        Err(GenerationError::MissingCredentials(
            "RAG_LLM_API_KEY (or IMAGE_GEN_API_KEY)".into(),
        ))
    }
}
