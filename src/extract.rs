//! Extraction entry points.
//!
//! [`MrnExtractor`] owns everything one extraction needs: the resolved
//! vision model, the prompt and the timeouts. Build it once from an
//! [`ExtractionConfig`] and reuse it for every image; it holds no mutable
//! state, so each call is independent.
//!
//! [`MrnExtractor::extract`] never returns `Err`: service errors and
//! unparseable answers come back as [`ExtractionResult::Failure`]. Only the
//! helpers that also load input or write output can fail with [`MrnError`].

use crate::config::ExtractionConfig;
use crate::error::{MrnError, ServiceError};
use crate::output::{ExtractionFailure, ExtractionResult};
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::input::{self, ExtractionRequest};
use crate::pipeline::llm::{LlmVisionModel, VisionModel};
use crate::pipeline::postprocess;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A configured extraction pipeline.
pub struct MrnExtractor {
    model: Arc<dyn VisionModel>,
    prompt: String,
    api_timeout_secs: Option<u64>,
    download_timeout_secs: u64,
}

impl std::fmt::Debug for MrnExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MrnExtractor")
            .field("model", &self.model.name())
            .field("prompt_len", &self.prompt.len())
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl MrnExtractor {
    /// Resolve the LLM provider described by `config`.
    ///
    /// # Errors
    /// [`MrnError::ProviderNotConfigured`] when no provider can be built
    /// (unknown name, missing API key).
    pub fn new(config: &ExtractionConfig) -> Result<Self, MrnError> {
        let (provider, label) = resolve_provider(config)?;
        let model = LlmVisionModel::new(provider, label, config);
        Ok(Self::with_model(Arc::new(model), config))
    }

    /// Use a caller-supplied [`VisionModel`] instead of an LLM provider.
    pub fn with_model(model: Arc<dyn VisionModel>, config: &ExtractionConfig) -> Self {
        Self {
            model,
            prompt: config.effective_prompt().to_string(),
            api_timeout_secs: config.api_timeout_secs,
            download_timeout_secs: config.download_timeout_secs,
        }
    }

    /// Name of the underlying model, for display.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Extract the MRN fields from one validated image.
    pub async fn extract(&self, request: &ExtractionRequest) -> ExtractionResult {
        let start = Instant::now();
        let (width, height) = request.dimensions();
        info!(
            "Extracting MRN fields from {}x{} {} with {}",
            width,
            height,
            request.mime_type(),
            self.model.name()
        );

        let image = request.encode();
        let raw = match self.call_model(&image).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Extraction failed: {}", e);
                return ExtractionFailure::service_error(&e).into();
            }
        };
        debug!("Model returned {} chars", raw.len());

        let result = postprocess::normalize_response(&raw);
        match &result {
            ExtractionResult::Success(record) => info!(
                "Extraction complete in {}ms (sub_division: {:?})",
                start.elapsed().as_millis(),
                record.sub_division
            ),
            ExtractionResult::Failure(failure) => warn!(
                "Extraction failed in {}ms: {}",
                start.elapsed().as_millis(),
                failure.kind
            ),
        }
        result
    }

    /// Load `input` (path or URL), then extract.
    ///
    /// # Errors
    /// Only for input problems: missing file, failed download, not a
    /// JPEG/PNG image.
    pub async fn extract_input(&self, input: impl AsRef<str>) -> Result<ExtractionResult, MrnError> {
        let request = input::resolve_input(input.as_ref(), self.download_timeout_secs).await?;
        Ok(self.extract(&request).await)
    }

    /// Extract and write the pretty JSON result to `output_path`.
    ///
    /// Failure results are written too; the returned value tells which.
    pub async fn extract_to_file(
        &self,
        input: impl AsRef<str>,
        output_path: impl AsRef<Path>,
    ) -> Result<ExtractionResult, MrnError> {
        let result = self.extract_input(input).await?;
        result.write_json(output_path).await?;
        Ok(result)
    }

    /// Synchronous wrapper around [`MrnExtractor::extract`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// inside an async context.
    pub fn extract_sync(&self, request: &ExtractionRequest) -> Result<ExtractionResult, MrnError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| MrnError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
        Ok(runtime.block_on(self.extract(request)))
    }

    async fn call_model(&self, image: &EncodedImage) -> Result<String, ServiceError> {
        let call = self.model.complete(&self.prompt, image);
        match self.api_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
                .await
                .map_err(|_| ServiceError::Timeout {
                    provider: self.model.name().to_string(),
                    secs,
                })?,
            None => call.await,
        }
    }
}

/// Build an extractor from `config` and run it on `input` (path or URL).
///
/// Convenience for one-off calls; long-running callers should build one
/// [`MrnExtractor`] and reuse it.
pub async fn extract(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, MrnError> {
    MrnExtractor::new(config)?.extract_input(input).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<(Arc<dyn LLMProvider>, String), MrnError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        MrnError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok((provider, format!("{provider_name}/{model}")))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — the factory
///    reads the matching API key (`OPENAI_API_KEY`, etc.).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_provider(config: &ExtractionConfig) -> Result<(Arc<dyn LLMProvider>, String), MrnError> {
    let model = config.effective_model();

    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), format!("custom/{model}")));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| MrnError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}
