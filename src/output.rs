//! Output types returned by the conversion entry points.

use crate::analysis::SlideAnalysis;
use crate::error::ElementError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a full image → `.pptx` conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The `.pptx` file contents.
    pub pptx: Vec<u8>,
    /// The layout description the slide was built from.
    pub analysis: SlideAnalysis,
    /// Elements that could not be placed.
    pub skipped: Vec<ElementError>,
    pub stats: ConversionStats,
}

/// A presentation built from an analysis, without any AI call.
#[derive(Debug, Clone)]
pub struct BuiltPresentation {
    /// The `.pptx` file contents.
    pub pptx: Vec<u8>,
    /// Elements that could not be placed.
    pub skipped: Vec<ElementError>,
    /// Shapes on the slide.
    pub shape_count: usize,
    pub slide_width_emu: i64,
    pub slide_height_emu: i64,
    /// Title written to the document properties.
    pub title: Option<String>,
}

/// Summary statistics for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Raw elements in the analysis.
    pub total_elements: usize,
    /// Shapes placed on the slide.
    pub placed_elements: usize,
    /// Elements dropped because they could not be placed.
    pub skipped_elements: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Retries needed before the VLM call succeeded.
    pub retries: u32,
    /// Pixel size of the source image.
    pub image_width_px: u32,
    pub image_height_px: u32,
    pub slide_width_emu: i64,
    pub slide_height_emu: i64,
    /// Size of the generated `.pptx` in bytes.
    pub pptx_bytes: usize,
    pub total_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// Outcome of one image in [`crate::convert_batch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// The input path or URL as given.
    pub input: String,
    /// Where the `.pptx` was written, on success.
    pub output: Option<PathBuf>,
    pub stats: Option<ConversionStats>,
    /// Elements skipped while building the slide.
    #[serde(default)]
    pub skipped: Vec<ElementError>,
    /// Fatal error message, on failure.
    pub error: Option<String>,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
