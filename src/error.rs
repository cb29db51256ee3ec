//! Error types for the mrn-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MrnError`] — **Fatal**: an extraction cannot even start (image file
//!   missing, not a JPEG/PNG, provider not configured) or its result cannot
//!   be written. Returned as `Err(MrnError)` from the `extract_input*`
//!   helpers and from [`crate::MrnExtractor::new`].
//!
//! * [`ServiceError`] — **Per-extraction**: the inference call itself failed.
//!   It never escapes the pipeline; [`crate::MrnExtractor::extract`] folds it
//!   into an [`crate::output::ExtractionResult::Failure`] so the caller always
//!   gets a value back.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mrn-extract library.
#[derive(Debug, Error)]
pub enum MrnError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The bytes are not a JPEG or PNG container.
    #[error("Unsupported image format: expected JPEG or PNG, got {detected}")]
    UnsupportedImage { detected: String },

    /// The container header is JPEG/PNG but the image data does not decode.
    #[error("Image is corrupt and cannot be decoded: {detail}")]
    CorruptImage { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single call to the inference service.
///
/// Kept apart from malformed-content failures: a service that never answered
/// leaves no raw output to inspect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Network, authentication, quota or any provider-side error.
    #[error("inference service '{provider}' failed: {detail}")]
    Unavailable { provider: String, detail: String },

    /// The configured per-call timeout elapsed.
    #[error("inference service '{provider}' timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },
}
