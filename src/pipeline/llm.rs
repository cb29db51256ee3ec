//! VLM interaction: send the prompt and notice image, return the raw text.
//!
//! This module is intentionally thin — all prompt engineering lives in
//! [`crate::prompts`] and all response cleanup in
//! [`crate::pipeline::postprocess`]. The text that comes back is returned
//! verbatim.
//!
//! [`VisionModel`] is the seam between the pipeline and the outside world.
//! [`LlmVisionModel`] implements it on top of any `edgequake_llm` provider;
//! tests plug in canned models instead.
//!
//! No retries happen here: one extraction is one request.

use crate::config::{ExtractionConfig, EXTRACTION_TEMPERATURE};
use crate::error::ServiceError;
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// A multimodal model that reads one image under one instruction.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    /// Send `prompt` and `image` as a single request and return the first
    /// completion's text unmodified.
    async fn complete(&self, prompt: &str, image: &EncodedImage) -> Result<String, ServiceError>;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
    detail: String,
    max_tokens: usize,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            detail: config.image_detail.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Build the single user message: instruction text plus one image part.
    fn build_messages(&self, prompt: &str, image: &EncodedImage) -> Vec<ChatMessage> {
        let image_data = ImageData::new(image.base64().to_string(), image.mime_type())
            .with_detail(self.detail.as_str());
        vec![ChatMessage::user_with_images(prompt, vec![image_data])]
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, prompt: &str, image: &EncodedImage) -> Result<String, ServiceError> {
        let start = Instant::now();
        let messages = self.build_messages(prompt, image);
        let options = build_options(self.max_tokens);

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    self.label,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!("{}: request failed — {}", self.label, e);
                Err(ServiceError::Unavailable {
                    provider: self.label.clone(),
                    detail: e.to_string(),
                })
            }
        }
    }
}

/// Completion options for an extraction call: temperature pinned to zero.
fn build_options(max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(EXTRACTION_TEMPERATURE),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_is_deterministic() {
        let opts = build_options(1024);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1024));
    }
}
