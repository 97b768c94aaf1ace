//! OpenAI-compatible chat completion wire types.
//!
//! The image model is reached through the chat endpoint with
//! `modalities: ["image", "text"]`; generated images come back as data URLs
//! under `choices[0].message.images`.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::{ImagePayload, ReferenceImage};
use super::GenerationError;

/// One element of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Prompt plus labelled reference images, in send order.
#[derive(Debug, Clone, PartialEq)]
pub struct MultimodalRequest {
    pub parts: Vec<ContentPart>,
}

impl MultimodalRequest {
    /// Prompt first, then a `[id]: caption` label followed by the inlined
    /// image for each reference.
    pub fn build(prompt: &str, references: &[ReferenceImage]) -> Self {
        let mut parts = Vec::with_capacity(1 + references.len() * 2);
        parts.push(ContentPart::Text {
            text: prompt.to_string(),
        });
        for reference in references {
            if reference.data.is_empty() || reference.mime_type.is_empty() {
                continue;
            }
            parts.push(ContentPart::Text {
                text: reference.label(),
            });
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: reference.data_url(),
                },
            });
        }
        Self { parts }
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
            .count()
    }
}

// ──────────────────────────────────────────────
// Request bodies
// ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent<'a> {
    Text(&'a str),
    Parts(&'a [ContentPart]),
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<&'static [&'static str]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

pub const IMAGE_MODALITIES: &[&str] = &["image", "text"];

// ──────────────────────────────────────────────
// Response bodies
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ResponseImage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseImage {
    pub image_url: ImageUrl,
}

impl ChatResponse {
    /// Response carrying one inline image, for mocks and tests.
    pub fn with_image(mime_type: &str, data: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        Self {
            choices: Some(vec![Choice {
                message: ResponseMessage {
                    content: None,
                    images: Some(vec![ResponseImage {
                        image_url: ImageUrl {
                            url: format!("data:{mime_type};base64,{encoded}"),
                        },
                    }]),
                },
            }]),
        }
    }

    /// Response carrying only text.
    pub fn with_text(text: &str) -> Self {
        Self {
            choices: Some(vec![Choice {
                message: ResponseMessage {
                    content: Some(text.to_string()),
                    images: None,
                },
            }]),
        }
    }

    fn first_message(&self) -> Result<&ResponseMessage, GenerationError> {
        self.choices
            .as_ref()
            .and_then(|c| c.first())
            .map(|c| &c.message)
            .ok_or(GenerationError::NoChoices)
    }

    pub fn text(&self) -> Result<String, GenerationError> {
        self.first_message()?
            .content
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Classify a raw response into an image or a typed (retryable) failure.
pub fn extract_image(response: Option<ChatResponse>) -> Result<ImagePayload, GenerationError> {
    let response = response.ok_or(GenerationError::EmptyResponse)?;
    let message = response.first_message()?;
    let url = message
        .images
        .as_ref()
        .and_then(|images| images.first())
        .map(|img| img.image_url.url.as_str())
        .ok_or(GenerationError::NoImage)?;
    parse_data_url(url)
}

/// Decode `data:<mime>;base64,<payload>`.
pub fn parse_data_url(url: &str) -> Result<ImagePayload, GenerationError> {
    let rest = url.strip_prefix("data:").ok_or(GenerationError::NoImage)?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| GenerationError::Decode("data URL has no payload".into()))?;
    let mime_type = header.split(';').next().unwrap_or_default();
    if mime_type.is_empty() {
        return Err(GenerationError::Decode("data URL has no MIME type".into()));
    }
    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| GenerationError::Decode(e.to_string()))?;
    if data.is_empty() {
        return Err(GenerationError::NoImage);
    }
    Ok(ImagePayload {
        data,
        mime_type: mime_type.to_string(),
    })
}
