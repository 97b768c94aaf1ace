use std::sync::Arc;

use super::retry::RetryPolicy;
use super::types::{BackendMode, GenerationJob, ImageBackend, ImageClient, ImagePayload};
use super::wire::{extract_image, MultimodalRequest};
use super::GenerationError;

/// Calls the image model directly, retrying transient failures.
pub struct InteractiveBackend {
    client: Arc<dyn ImageClient>,
    retry: RetryPolicy,
}

impl InteractiveBackend {
    pub fn new(client: Arc<dyn ImageClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl ImageBackend for InteractiveBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Interactive
    }

    fn generate(&self, job: &GenerationJob) -> Result<ImagePayload, GenerationError> {
        let _span = tracing::info_span!(
            "generate_image",
            slide = job.slide_number(),
            section_id = %job.section_id
        )
        .entered();

        let request = MultimodalRequest::build(&job.prompt, &job.references);
        tracing::debug!(
            prompt_chars = job.prompt.len(),
            images = request.image_count(),
            "Sending generation request"
        );

        let start = std::time::Instant::now();
        let payload = self.retry.run(|_attempt| {
            let response = self.client.complete_multimodal(&request)?;
            extract_image(response)
        })?;

        tracing::info!(
            bytes = payload.data.len(),
            mime_type = %payload.mime_type,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Image generated"
        );
        Ok(payload)
    }
}
