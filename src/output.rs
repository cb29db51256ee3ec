//! Result types returned by an extraction, and their JSON rendering.
//!
//! [`ExtractionResult`] is a real two-variant enum: callers match on it
//! instead of probing for an `error` key. The key only appears in the JSON
//! form of a [`ExtractionFailure`], and [`MrnRecord`] has no field by that
//! name, so a successful record can never be mistaken for a failure.

use crate::error::{MrnError, ServiceError};
use crate::schema::MrnRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional file name for the downloadable result.
pub const DEFAULT_OUTPUT_FILE: &str = "mrn_extracted_data.json";

/// MIME type of the downloadable result.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Outcome of one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    /// All schema fields, `sub_division` normalised.
    Success(MrnRecord),
    /// The service failed or its answer could not be parsed.
    Failure(ExtractionFailure),
}

/// Classification of a failed extraction.
///
/// Serialised as the human-readable `error` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The inference call itself failed (network, auth, quota, timeout).
    #[serde(rename = "OCR service request failed")]
    ServiceError,
    /// The model answered, but not with a JSON object.
    #[serde(rename = "Failed to parse OCR output")]
    ParseFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ServiceError => "OCR service request failed",
            FailureKind::ParseFailure => "Failed to parse OCR output",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of a failed extraction, kept for display and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    #[serde(rename = "error")]
    pub kind: FailureKind,
    /// The model's text exactly as received; empty when the service never answered.
    pub raw_output: String,
    /// Diagnostic message (parser or transport error text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl ExtractionFailure {
    pub fn parse_failure(raw_output: impl Into<String>, exception: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ParseFailure,
            raw_output: raw_output.into(),
            exception: Some(exception.into()),
        }
    }

    pub fn service_error(err: &ServiceError) -> Self {
        Self {
            kind: FailureKind::ServiceError,
            raw_output: String::new(),
            exception: Some(err.to_string()),
        }
    }
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success(_))
    }

    /// The extracted record, if the extraction succeeded.
    pub fn record(&self) -> Option<&MrnRecord> {
        match self {
            ExtractionResult::Success(record) => Some(record),
            ExtractionResult::Failure(_) => None,
        }
    }

    /// The failure details, if the extraction failed.
    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionResult::Success(_) => None,
            ExtractionResult::Failure(failure) => Some(failure),
        }
    }

    /// Pretty JSON with 2-space indentation, as offered for download.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the pretty JSON to `path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<(), MrnError> {
        let path = path.as_ref();
        let json = self
            .to_json_pretty()
            .map_err(|e| MrnError::Internal(format!("Failed to serialise result: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MrnError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, format!("{json}\n"))
            .await
            .map_err(|e| MrnError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| MrnError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

impl From<MrnRecord> for ExtractionResult {
    fn from(record: MrnRecord) -> Self {
        ExtractionResult::Success(record)
    }
}

impl From<ExtractionFailure> for ExtractionResult {
    fn from(failure: ExtractionFailure) -> Self {
        ExtractionResult::Failure(failure)
    }
}
