//! Image generation orchestrator.
//!
//! Turns an ordered content plan into generated images while keeping a whole
//! deck visually consistent across independent calls to a non-deterministic
//! model.
//!
//! ```text
//! style ─┐
//!        ├─► prompt ─► scheduler ─► backend (interactive | export) ─► sink
//! plan ──┘                 │
//!                          └─ reference chain (anchor = slide 2 output)
//! ```
//!
//! Slides 1 and 2 run sequentially; slide 2's output becomes the style anchor
//! attached to every later request, which then fan out into a bounded pool.

pub mod types;
pub mod wire;
pub mod style;
pub mod prompt;
pub mod reference;
pub mod retry;
pub mod client;
pub mod backend;
pub mod placeholder;
pub mod export;
pub mod assets;
pub mod sink;
pub mod scheduler;

pub use types::*;
pub use wire::{ChatResponse, ContentPart, MultimodalRequest};
pub use style::*;
pub use prompt::{build_poster_prompt, build_slide_prompt, render_plan, render_section};
pub use reference::{ReferenceChain, ANCHOR_CAPTION, ANCHOR_ID};
pub use retry::RetryPolicy;
pub use client::{ChatClient, MockImageClient, MockTextClient};
pub use backend::InteractiveBackend;
pub use export::{ExportBackend, ExportManifest};
pub use assets::load_figure_images;
pub use sink::{DirectorySink, NullSink, PersistenceSink};
pub use scheduler::{BatchOutcome, Orchestrator, SlideFailure, DEFAULT_WORKERS};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    // ── Configuration (fail before any generation call) ──
    #[error("Missing credentials: set {0}")]
    MissingCredentials(String),

    #[error("Invalid custom style: {0}")]
    InvalidStyle(String),

    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ── Transient backend outcomes (retried) ──
    #[error("API returned an empty response")]
    EmptyResponse,

    #[error("API response has no choices")]
    NoChoices,

    #[error("No image in model response")]
    NoImage,

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("API returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    // ── Terminal ──
    #[error("Generation failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },

    #[error("Slide {} failed before the style anchor was set: {source}", .index + 1)]
    AnchorPhase {
        index: usize,
        #[source]
        source: Box<GenerationError>,
    },

    #[error("Malformed image payload: {0}")]
    Decode(String),

    #[error("Image processing error: {0}")]
    Image(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// Malformed or empty responses, transport hiccups, rate limits and server
    /// errors are retried. Auth and request errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::EmptyResponse
            | GenerationError::NoChoices
            | GenerationError::NoImage
            | GenerationError::Transport(_)
            | GenerationError::Decode(_) => true,
            GenerationError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Configuration-class errors abort the batch before dispatch.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingCredentials(_)
                | GenerationError::InvalidStyle(_)
                | GenerationError::UnsupportedMode(_)
                | GenerationError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_responses_are_retryable() {
        assert!(GenerationError::EmptyResponse.is_retryable());
        assert!(GenerationError::NoChoices.is_retryable());
        assert!(GenerationError::NoImage.is_retryable());
        assert!(GenerationError::Transport("reset".into()).is_retryable());
    }

    #[test]
    fn api_status_classification() {
        let rate = GenerationError::Api { status: 429, body: String::new() };
        let server = GenerationError::Api { status: 503, body: String::new() };
        let auth = GenerationError::Api { status: 401, body: String::new() };
        assert!(rate.is_retryable());
        assert!(server.is_retryable());
        assert!(!auth.is_retryable());
    }

    #[test]
    fn configuration_errors_are_terminal() {
        let err = GenerationError::InvalidStyle("nonsense".into());
        assert!(!err.is_retryable());
        assert!(err.is_configuration());
    }

    #[test]
    fn anchor_phase_message_is_one_based() {
        let err = GenerationError::AnchorPhase {
            index: 1,
            source: Box::new(GenerationError::NoImage),
        };
        assert_eq!(
            err.to_string(),
            "Slide 2 failed before the style anchor was set: No image in model response"
        );
    }
}
