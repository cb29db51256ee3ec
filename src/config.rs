//! Configuration types for MRN extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The config is turned into an
//! [`crate::MrnExtractor`] once per process; nothing here is global.

use crate::error::MrnError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature for every extraction call.
///
/// Extraction is a transcription task; zero keeps repeated calls on the
/// same image as reproducible as the provider allows.
pub const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Configuration for MRN extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use mrn_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o-mini")
///     .max_tokens(1024)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier, e.g. "gpt-4o-mini", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom instruction prompt. If None, uses [`crate::prompts::extraction_prompt`].
    pub prompt: Option<String>,

    /// Maximum tokens the model may generate. Default: 1024.
    ///
    /// Thirteen short string fields fit comfortably; the cap only guards
    /// against a model that starts narrating.
    pub max_tokens: usize,

    /// Vision detail hint forwarded with the image ("low", "high", "auto"). Default: "high".
    ///
    /// Handwritten digits on a phone photo need the full tile budget.
    pub image_detail: String,

    /// Per-call timeout for the model request in seconds. Default: None (unbounded).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            prompt: None,
            max_tokens: 1024,
            image_detail: "high".to_string(),
            api_timeout_secs: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("max_tokens", &self.max_tokens)
            .field("image_detail", &self.image_detail)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The prompt that will actually be sent.
    pub fn effective_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::extraction_prompt())
    }

    /// The model that will actually be requested.
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn image_detail(mut self, detail: impl Into<String>) -> Self {
        self.config.image_detail = detail.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, MrnError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(MrnError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if !matches!(c.image_detail.as_str(), "low" | "high" | "auto") {
            return Err(MrnError::InvalidConfig(format!(
                "image detail must be low, high or auto, got '{}'",
                c.image_detail
            )));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(MrnError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(MrnError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(MrnError::InvalidConfig("prompt override is empty".into()));
        }
        Ok(self.config)
    }
}
