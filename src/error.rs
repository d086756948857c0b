//! Error types for the edgequake-img2pptx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2PptxError`] — **Fatal**: the conversion cannot proceed at all
//!   (bad input file, provider not configured, the model answered with
//!   something that is not a layout). Returned as `Err(Img2PptxError)` from
//!   the top-level `convert*` functions.
//!
//! * [`ElementError`] — **Non-fatal**: a single slide element could not be
//!   placed (unparseable colour, unknown element type, wrong field type) but
//!   every other element is fine. Collected in
//!   [`crate::output::ConversionOutput::skipped`] so callers can see what was
//!   dropped instead of losing the whole slide to one bad element.

use crate::pptx::PptxError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-img2pptx library.
#[derive(Debug, Error)]
pub enum Img2PptxError {
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

    /// The input was read but is not an image format the VLM accepts.
    #[error("Input is not a supported image (PNG, JPEG, GIF, WEBP): '{source_name}'\nFirst bytes: {magic:?}")]
    NotAnImage { source_name: String, magic: [u8; 4] },

    /// The image could not be decoded for resizing or region cropping.
    #[error("Failed to decode image '{source_name}': {detail}")]
    ImageDecodeFailed { source_name: String, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The vision call failed after all retries.
    #[error("Slide analysis failed after {retries} retries: {detail}")]
    AnalysisFailed { retries: u32, detail: String },

    /// A single VLM call exceeded `api_timeout_secs`.
    #[error("API call timed out after {secs}s\nIncrease --api-timeout.")]
    ApiTimeout { secs: u64 },

    /// The model answered, but not with a parseable layout description.
    #[error("Could not parse the AI response as a slide layout: {detail}\nResponse starts with: {excerpt:?}")]
    InvalidAnalysis { detail: String, excerpt: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The presentation package could not be assembled.
    #[error("Failed to build presentation: {0}")]
    DocumentBuildFailed(#[from] PptxError),

    /// Could not create or write the output .pptx file.
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

/// A non-fatal error for a single slide element.
///
/// `index` is the element's position in the analysis `elements` array,
/// which is also its z-order.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ElementError {
    /// The element's JSON did not match any known element shape.
    #[error("Element {index}: malformed {kind} element: {detail}")]
    Malformed {
        index: usize,
        kind: String,
        detail: String,
    },

    /// The element's `type` is not text, shape or image_region.
    #[error("Element {index}: unknown element type '{kind}'")]
    UnknownType { index: usize, kind: String },

    /// A colour field is not `#RRGGBB`.
    #[error("Element {index}: invalid colour {value:?} in '{field}'")]
    InvalidColor {
        index: usize,
        field: String,
        value: String,
    },
}

impl ElementError {
    /// Position of the offending element in the analysis.
    pub fn index(&self) -> usize {
        match self {
            ElementError::Malformed { index, .. }
            | ElementError::UnknownType { index, .. }
            | ElementError::InvalidColor { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_analysis_display_includes_excerpt() {
        let e = Img2PptxError::InvalidAnalysis {
            detail: "expected value at line 1".into(),
            excerpt: "Sure! Here is".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Sure! Here is"), "got: {msg}");
    }

    #[test]
    fn api_timeout_display() {
        let e = Img2PptxError::ApiTimeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn element_error_index() {
        let e = ElementError::InvalidColor {
            index: 4,
            field: "fill_color".into(),
            value: "blue".into(),
        };
        assert_eq!(e.index(), 4);
        assert!(e.to_string().contains("fill_color"));
    }

    #[test]
    fn unknown_type_display() {
        let e = ElementError::UnknownType {
            index: 0,
            kind: "chart".into(),
        };
        assert!(e.to_string().contains("'chart'"));
    }
}
