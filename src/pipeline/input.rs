//! Input resolution: turn a path, URL or byte buffer into an [`ExtractionRequest`].
//!
//! Validation happens here, before any network call to the model: the bytes
//! must sniff as JPEG or PNG and carry a readable header. Callers get a
//! meaningful [`MrnError`] instead of paying for a completion on garbage input.

use crate::error::MrnError;
use crate::pipeline::encode::{self, EncodedImage};
use crate::schema::MRN_FIELDS;
use image::ImageFormat;
use std::path::PathBuf;
use tracing::{debug, info};

/// One notice image, validated and ready for extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ExtractionRequest {
    /// Validate raw image bytes.
    ///
    /// # Errors
    /// [`MrnError::UnsupportedImage`] for anything but JPEG/PNG,
    /// [`MrnError::CorruptImage`] when the data does not decode.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, MrnError> {
        let bytes = bytes.into();
        let format = encode::detect_format(&bytes)?;
        let (width, height) = encode::image_dimensions(&bytes, format)?;
        debug!(
            "Accepted {:?} image {}x{} ({} bytes)",
            format,
            width,
            height,
            bytes.len()
        );
        Ok(Self {
            bytes,
            format,
            width,
            height,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        encode::mime_type_for(self.format)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The fields this request will be extracted into.
    pub fn schema(&self) -> &'static [&'static str] {
        &MRN_FIELDS
    }

    /// Base64 data-URI form for the model request.
    pub fn encode(&self) -> EncodedImage {
        encode::encode_image(&self.bytes, self.format)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load and validate an image from a local path or HTTP/HTTPS URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ExtractionRequest, MrnError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    ExtractionRequest::from_bytes(bytes)
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, MrnError> {
    if path_str.trim().is_empty() {
        return Err(MrnError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local image: {}", path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(MrnError::PermissionDenied { path })
        }
        Err(_) => Err(MrnError::FileNotFound { path }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, MrnError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MrnError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            MrnError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            MrnError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(MrnError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| MrnError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
