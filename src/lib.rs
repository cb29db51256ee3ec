//! # mrn-extract
//!
//! Extract the fields of a utility Meter Replacement Notice (MRN) from a
//! photo or scan using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! The notice is a dense form of look-alike numbers: account number, feeder
//! code, meter numbers and the 5-6 digit sub-division code. A VLM reads the
//! form well but regularly files one number under another, or wraps its JSON
//! in Markdown fences. This crate sends the image with a strict prompt, then
//! cleans and repairs the answer so callers always receive either a complete
//! 13-field record or an explicit failure value.
//!
//! ## Pipeline Overview
//!
//! ```text
//! JPEG / PNG
//!  │
//!  ├─ 1. Input   resolve local file or download from URL, validate format
//!  ├─ 2. Encode  bytes → base64 data URI
//!  ├─ 3. VLM     one deterministic call (temperature 0) to gpt-4o-mini / claude / gemini / …
//!  ├─ 4. Repair  strip fences, parse JSON, normalise sub_division
//!  └─ 5. Output  Success(MrnRecord) or Failure(ExtractionFailure) → JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mrn_extract::{ExtractionConfig, ExtractionResult, MrnExtractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let extractor = MrnExtractor::new(&ExtractionConfig::default())?;
//!     match extractor.extract_input("notice.jpg").await? {
//!         ExtractionResult::Success(record) => println!("sub-division: {}", record.sub_division),
//!         ExtractionResult::Failure(failure) => eprintln!("{}: {}", failure.kind, failure.raw_output),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mrn-extract` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

/// Implement [`VisionModel`] with this attribute.
pub use async_trait::async_trait;
pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL};
pub use error::{MrnError, ServiceError};
pub use extract::{extract, MrnExtractor};
pub use output::{
    ExtractionFailure, ExtractionResult, FailureKind, DEFAULT_OUTPUT_FILE, JSON_MIME_TYPE,
};
pub use pipeline::encode::EncodedImage;
pub use pipeline::input::ExtractionRequest;
pub use pipeline::llm::{LlmVisionModel, VisionModel};
pub use pipeline::postprocess::{normalize_response, normalize_sub_division, strip_code_fences};
pub use prompts::{extraction_prompt, PROMPT_VERSION};
pub use schema::{MrnRecord, MRN_FIELDS};
