use std::sync::Arc;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::wire::{ChatResponse, MultimodalRequest};
use super::GenerationError;

/// Section id used for the single artifact in poster mode.
pub const POSTER_SECTION_ID: &str = "poster";

/// Image attached to a generation request: a content figure or the style anchor.
///
/// Produced once and read-only afterward. Cloning shares the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    pub id: String,
    pub caption: Option<String>,
    pub data: Arc<[u8]>,
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(id: &str, caption: Option<&str>, data: Vec<u8>, mime_type: &str) -> Self {
        Self {
            id: id.to_string(),
            caption: caption.map(str::to_string),
            data: Arc::from(data),
            mime_type: mime_type.to_string(),
        }
    }

    /// Text label sent right before the image so the model can match it to
    /// the `**id**` line in the rendered content.
    pub fn label(&self) -> String {
        match self.caption.as_deref().filter(|c| !c.is_empty()) {
            Some(caption) => format!("[{}]: {}", self.id, caption),
            None => format!("[{}]", self.id),
        }
    }

    pub fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }

    /// File extension used when copying the image to disk.
    pub fn extension(&self) -> &'static str {
        if self.mime_type.contains("png") {
            "png"
        } else {
            "jpg"
        }
    }
}

/// Raw bytes returned by a backend for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// A completed artifact. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub section_id: String,
    #[serde(skip)]
    pub image_data: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn new(section_id: &str, payload: ImagePayload) -> Self {
        Self {
            section_id: section_id.to_string(),
            image_data: payload.data,
            mime_type: payload.mime_type,
        }
    }

    /// Extension for the persisted file. Unknown types are written as PNG.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// One unit of work, built by the scheduler immediately before dispatch.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    /// Zero-based position in the deck.
    pub index: usize,
    pub total: usize,
    pub section_id: String,
    pub title: String,
    pub prompt: String,
    pub references: Vec<ReferenceImage>,
}

impl GenerationJob {
    /// One-based slide number used in filenames and instructions.
    pub fn slide_number(&self) -> usize {
        self.index + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// Synchronous calls to the image model.
    Interactive,
    /// Prompt files for a human operator; placeholder images returned.
    Export,
}

/// Where a job's image comes from.
pub trait ImageBackend: Send + Sync {
    fn mode(&self) -> BackendMode;

    fn generate(&self, job: &GenerationJob) -> Result<ImagePayload, GenerationError>;

    /// Called once after the last job of a batch.
    fn finish(&self, _total: usize) -> Result<(), GenerationError> {
        Ok(())
    }
}

/// Multimodal chat endpoint abstraction (allows mocking).
///
/// `Ok(None)` models an API that answered with a null body.
pub trait ImageClient: Send + Sync {
    fn complete_multimodal(
        &self,
        request: &MultimodalRequest,
    ) -> Result<Option<ChatResponse>, GenerationError>;
}

/// Text completion abstraction used for style resolution and narrative notes.
pub trait TextClient: Send + Sync {
    fn complete_text(
        &self,
        system: Option<&str>,
        user: &str,
        json_object: bool,
    ) -> Result<String, GenerationError>;
}
