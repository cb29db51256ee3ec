//! Image encoding: validated JPEG/PNG bytes → base64 data URI.
//!
//! VLM APIs (OpenAI, Anthropic, Gemini) accept images as base64 data-URIs
//! embedded in the JSON request body. The notice is sent in its original
//! container, never re-encoded: re-compressing a phone photo of a form only
//! adds artefacts on the digits the model has to read.

use crate::error::MrnError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// A notice image ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: &'static str,
    data: String,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Base64 payload (standard alphabet, padded).
    pub fn base64(&self) -> &str {
        &self.data
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Detect the container format, accepting only JPEG and PNG.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, MrnError> {
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
        Ok(other) => Err(MrnError::UnsupportedImage {
            detected: format!("{other:?}"),
        }),
        Err(_) => Err(MrnError::UnsupportedImage {
            detected: "unknown data".to_string(),
        }),
    }
}

pub fn mime_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        _ => "image/jpeg",
    }
}

/// Read `(width, height)` from the image header.
///
/// Only the header is parsed, so resolution is unbounded and no pixel buffer
/// is allocated. A missing or malformed header is [`MrnError::CorruptImage`].
pub fn image_dimensions(bytes: &[u8], format: ImageFormat) -> Result<(u32, u32), MrnError> {
    ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| MrnError::CorruptImage {
            detail: e.to_string(),
        })
}

/// Base64-wrap already validated image bytes.
pub fn encode_image(bytes: &[u8], format: ImageFormat) -> EncodedImage {
    let data = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", data.len());

    EncodedImage {
        mime_type: mime_type_for(format),
        data,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    pub(crate) fn sample_image(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([200, 10, 10])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format)
            .expect("encode sample image");
        buf
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &byte in bytes {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        let start = out.len();
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        let crc = crc32(&out[start..]);
        out.extend_from_slice(&crc.to_be_bytes());
    }

    /// A PNG whose header declares `width`x`height` 8-bit grayscale.
    ///
    /// Only the first rows are present in IDAT; enough for header parsing
    /// without building a pixel buffer of that size.
    pub(crate) fn wide_png(width: u32, height: u32) -> Vec<u8> {
        let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[8, 0, 0, 0, 0]);
        png_chunk(&mut out, b"IHDR", &ihdr);
        // zlib header followed by an empty stored block
        png_chunk(&mut out, b"IDAT", &[0x78, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF]);
        png_chunk(&mut out, b"IEND", &[]);
        out
    }

    #[test]
    fn detects_png_and_jpeg() {
        let png = sample_image(ImageFormat::Png);
        let jpeg = sample_image(ImageFormat::Jpeg);
        assert_eq!(detect_format(&png).unwrap(), ImageFormat::Png);
        assert_eq!(detect_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn rejects_other_formats() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";
        let err = detect_format(gif).unwrap_err();
        assert!(matches!(err, MrnError::UnsupportedImage { .. }), "got: {err:?}");

        let err = detect_format(b"%PDF-1.7").unwrap_err();
        assert!(matches!(err, MrnError::UnsupportedImage { .. }));
    }

    #[test]
    fn reports_dimensions() {
        let png = sample_image(ImageFormat::Png);
        assert_eq!(image_dimensions(&png, ImageFormat::Png).unwrap(), (12, 8));
    }

    #[test]
    fn high_resolution_png_is_accepted() {
        let png = wide_png(24_000, 24_000);
        assert_eq!(detect_format(&png).unwrap(), ImageFormat::Png);
        assert_eq!(
            image_dimensions(&png, ImageFormat::Png).unwrap(),
            (24_000, 24_000)
        );
    }

    #[test]
    fn truncated_header_is_corrupt() {
        let png = sample_image(ImageFormat::Png);
        let err = image_dimensions(&png[..20], ImageFormat::Png).unwrap_err();
        assert!(matches!(err, MrnError::CorruptImage { .. }), "got: {err:?}");

        let jpeg = sample_image(ImageFormat::Jpeg);
        let err = image_dimensions(&jpeg[..4], ImageFormat::Jpeg).unwrap_err();
        assert!(matches!(err, MrnError::CorruptImage { .. }), "got: {err:?}");
    }

    #[test]
    fn data_uri_round_trips() {
        let jpeg = sample_image(ImageFormat::Jpeg);
        let encoded = encode_image(&jpeg, ImageFormat::Jpeg);
        assert_eq!(encoded.mime_type(), "image/jpeg");

        let uri = encoded.data_uri();
        let payload = uri
            .strip_prefix("data:image/jpeg;base64,")
            .expect("data URI prefix");
        assert_eq!(STANDARD.decode(payload).expect("valid base64"), jpeg);
    }
}
