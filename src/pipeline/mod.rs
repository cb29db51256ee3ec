//! Pipeline stages for MRN field extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without a live model.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess
//! (path/URL) (base64)  (VLM)   (fences, parse, sub_division repair)
//! ```
//!
//! 1. [`input`]  — load bytes from a path or URL and validate JPEG/PNG
//! 2. [`encode`] — base64-wrap the image as a data URI
//! 3. [`llm`]    — one deterministic VLM call; the only stage with model I/O
//! 4. [`postprocess`] — turn the raw text into a record or a failure value

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
