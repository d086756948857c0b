//! # edgequake-img2pptx
//!
//! Turn a picture of a slide into an editable PowerPoint file.
//!
//! ## Why this crate?
//!
//! A screenshot or photo of a slide is a dead end: the text cannot be
//! corrected and the boxes cannot be moved. This crate asks a Vision
//! Language Model (VLM) to describe the slide as a list of positioned
//! elements (text, shapes and picture regions) and rebuilds each one as a
//! native shape in a single-slide `.pptx`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input   resolve local file or download from URL, sniff media type
//!  ├─ 2. Encode  downscale if huge → base64 ImageData
//!  ├─ 3. VLM     one call to claude / gpt-4.1 / gemini / … (retry + timeout)
//!  ├─ 4. Parse   recover the JSON layout from the answer
//!  ├─ 5. Layout  percentages → EMU, colours, fonts; bad elements skipped
//!  └─ 6. Package OOXML parts zipped into a .pptx
//! ```
//!
//! Steps 5 and 6 need no AI: [`build_presentation`] runs them on any
//! [`SlideAnalysis`], such as the bundled [`demo_analysis`] or JSON saved
//! from an earlier run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2pptx::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from ANTHROPIC_API_KEY / OPENAI_API_KEY / …
//!     let config = ConversionConfig::default();
//!     let stats = convert_to_file("slide.png", "slide.pptx", &config).await?;
//!     eprintln!("{} of {} elements placed",
//!         stats.placed_elements,
//!         stats.total_elements);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2pptx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-img2pptx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod config;
pub mod convert;
pub mod demo;
pub mod error;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod pptx;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{BackgroundSpec, ElementSpec, SlideAnalysis};
pub use config::{ConversionConfig, ConversionConfigBuilder, SlideSize};
pub use convert::{
    analyze, build_presentation, convert, convert_batch, convert_from_bytes, convert_sync,
    convert_to_file, resolve_provider, write_pptx,
};
pub use demo::demo_analysis;
pub use error::{ElementError, Img2PptxError};
pub use layout::ImageRegionMode;
pub use output::{BatchItem, BuiltPresentation, ConversionOutput, ConversionStats};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
