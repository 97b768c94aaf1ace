//! Chat-completions HTTP client for the image and text models, with mocks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::EndpointSettings;

use super::types::{ImageClient, TextClient};
use super::wire::{
    ChatMessage, ChatRequest, ChatResponse, MessageContent, MultimodalRequest, ResponseFormat,
    IMAGE_MODALITIES,
};
use super::GenerationError;

/// OpenAI-compatible chat completions client (blocking).
pub struct ChatClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl ChatClient {
    pub fn new(endpoint: &EndpointSettings, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn post(&self, body: &ChatRequest<'_>) -> Result<Option<ChatResponse>, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Transport(format!("cannot reach {}", self.base_url))
                } else if e.is_timeout() {
                    GenerationError::Transport(format!(
                        "request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response
            .text()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<Option<ChatResponse>>(&raw)
            .map_err(|e| GenerationError::Decode(format!("response body: {e}")))
    }
}

impl ImageClient for ChatClient {
    fn complete_multimodal(
        &self,
        request: &MultimodalRequest,
    ) -> Result<Option<ChatResponse>, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(&request.parts),
            }],
            modalities: Some(IMAGE_MODALITIES),
            response_format: None,
        };
        self.post(&body)
    }
}

impl TextClient for ChatClient {
    fn complete_text(
        &self,
        system: Option<&str>,
        user: &str,
        json_object: bool,
    ) -> Result<String, GenerationError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: MessageContent::Text(user),
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            modalities: None,
            response_format: json_object.then_some(ResponseFormat { kind: "json_object" }),
        };
        self.post(&body)?
            .ok_or(GenerationError::EmptyResponse)?
            .text()
    }
}

// ──────────────────────────────────────────────
// Mocks
// ──────────────────────────────────────────────

type Responder = dyn Fn(&MultimodalRequest, usize) -> Option<ChatResponse> + Send + Sync;

/// Mock image client. Each call gets the request and its 0-based call number.
pub struct MockImageClient {
    responder: Box<Responder>,
    calls: AtomicUsize,
    requests: Mutex<Vec<MultimodalRequest>>,
}

impl MockImageClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&MultimodalRequest, usize) -> Option<ChatResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always returns the same PNG bytes.
    pub fn always(data: &[u8]) -> Self {
        let data = data.to_vec();
        Self::new(move |_, _| Some(ChatResponse::with_image("image/png", &data)))
    }

    /// Returns the request's prompt text as the image bytes, so tests can
    /// tell which job produced which image.
    pub fn echo_prompt() -> Self {
        Self::new(|request, _| {
            let prompt = request.parts.first().and_then(|p| match p {
                super::wire::ContentPart::Text { text } => Some(text.clone()),
                _ => None,
            })?;
            Some(ChatResponse::with_image("image/png", prompt.as_bytes()))
        })
    }

    /// Plays back `script` in order, then repeats `fallback`.
    pub fn scripted(script: Vec<Option<ChatResponse>>, fallback: Option<ChatResponse>) -> Self {
        let queue = Mutex::new(VecDeque::from(script));
        Self::new(move |_, _| {
            let next = queue.lock().ok().and_then(|mut q| q.pop_front());
            match next {
                Some(reply) => reply,
                None => fallback.clone(),
            }
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<MultimodalRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ImageClient for MockImageClient {
    fn complete_multimodal(
        &self,
        request: &MultimodalRequest,
    ) -> Result<Option<ChatResponse>, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        Ok((self.responder)(request, n))
    }
}

/// One recorded text call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCall {
    pub system: Option<String>,
    pub user: String,
    pub json_object: bool,
}

/// Mock text client: fixed reply or fixed transport failure.
pub struct MockTextClient {
    reply: Result<String, String>,
    calls: Mutex<Vec<TextCall>>,
}

impl MockTextClient {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<TextCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl TextClient for MockTextClient {
    fn complete_text(
        &self,
        system: Option<&str>,
        user: &str,
        json_object: bool,
    ) -> Result<String, GenerationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(TextCall {
                system: system.map(str::to_string),
                user: user.to_string(),
                json_object,
            });
        }
        self.reply
            .clone()
            .map_err(GenerationError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base_url: &str) -> EndpointSettings {
        EndpointSettings {
            api_key: "k".into(),
            base_url: base_url.into(),
            model: "m".into(),
        }
    }

    #[test]
    fn chat_client_trims_trailing_slash() {
        let client = ChatClient::new(&endpoint("https://api.example/v1/"), Duration::from_secs(60)).unwrap();
        assert_eq!(client.base_url, "https://api.example/v1");
        assert_eq!(client.timeout_secs, 60);
        assert_eq!(client.model(), "m");
    }

    #[test]
    fn image_request_body_shape() {
        let request = MultimodalRequest::build("draw", &[]);
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(&request.parts),
            }],
            modalities: Some(IMAGE_MODALITIES),
            response_format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["modalities"], serde_json::json!(["image", "text"]));
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn text_request_body_json_mode() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Text("hi"),
            }],
            modalities: None,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!(json.get("modalities").is_none());
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let client = ChatClient::new(&endpoint("http://127.0.0.1:9"), Duration::from_secs(2)).unwrap();
        let err = client.complete_text(None, "hi", false).unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn scripted_mock_plays_in_order_then_falls_back() {
        let mock = MockImageClient::scripted(
            vec![None, Some(ChatResponse::default())],
            Some(ChatResponse::with_image("image/png", b"ok")),
        );
        let req = MultimodalRequest::build("p", &[]);
        assert!(mock.complete_multimodal(&req).unwrap().is_none());
        assert!(mock.complete_multimodal(&req).unwrap().unwrap().choices.is_none());
        assert!(mock.complete_multimodal(&req).unwrap().is_some());
        assert!(mock.complete_multimodal(&req).unwrap().is_some());
        assert_eq!(mock.call_count(), 4);
        assert_eq!(mock.requests().len(), 4);
    }

    #[test]
    fn text_mock_records_calls() {
        let mock = MockTextClient::replying("out");
        assert_eq!(mock.complete_text(Some("sys"), "user", true).unwrap(), "out");
        let calls = mock.calls();
        assert_eq!(calls[0].system.as_deref(), Some("sys"));
        assert!(calls[0].json_object);

        let failing = MockTextClient::failing("down");
        assert!(matches!(
            failing.complete_text(None, "x", false),
            Err(GenerationError::Transport(_))
        ));
    }
}
