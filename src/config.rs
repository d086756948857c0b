//! Configuration types for image-to-PPTX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob, so a
//! config can be shared across the tasks of a batch and logged as a whole.

use crate::error::Img2PptxError;
use crate::layout::{ImageRegionMode, LayoutOptions, DEFAULT_MIN_ELEMENT_EMU};
use crate::pptx::{Presentation, EMU_PER_INCH};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Smallest and largest slide edge PowerPoint accepts (1" and 56").
pub const MIN_SLIDE_EMU: i64 = EMU_PER_INCH;
pub const MAX_SLIDE_EMU: i64 = 56 * EMU_PER_INCH;

/// Configuration for an image-to-PPTX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_img2pptx::{ConversionConfig, ImageRegionMode, SlideSize};
///
/// let config = ConversionConfig::builder()
///     .model("claude-sonnet-4-20250514")
///     .slide_size(SlideSize::Standard)
///     .image_regions(ImageRegionMode::Crop)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// LLM model identifier, e.g. "claude-sonnet-4-20250514", "gpt-4.1".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "anthropic", "openai", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Layout extraction wants the model to report what it sees, not to be
    /// creative; low values also keep the JSON well-formed.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// A busy slide with forty elements needs roughly 3 000 output tokens of
    /// JSON. Too low a limit truncates the object and the parse fails.
    pub max_tokens: usize,

    /// Maximum retry attempts on a failed VLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Per-VLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Size of the generated slide. Default: [`SlideSize::Widescreen`].
    pub slide_size: SlideSize,

    /// How `image_region` elements are rendered. Default: placeholder boxes.
    pub image_regions: ImageRegionMode,

    /// Minimum width/height of a placed element in EMU. Default: 100 000.
    pub min_element_emu: i64,

    /// Longest image edge sent to the model, in pixels. Default: 2048.
    ///
    /// Larger images are downscaled before upload. Vision APIs resize big
    /// inputs themselves, so sending more pixels only costs upload time.
    pub max_image_pixels: u32,

    /// Number of concurrent VLM calls in [`crate::convert_batch`]. Default: 4.
    pub concurrency: usize,

    /// Optional progress listener.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            slide_size: SlideSize::default(),
            image_regions: ImageRegionMode::default(),
            min_element_emu: DEFAULT_MIN_ELEMENT_EMU,
            max_image_pixels: 2048,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("slide_size", &self.slide_size)
            .field("image_regions", &self.image_regions)
            .field("min_element_emu", &self.min_element_emu)
            .field("max_image_pixels", &self.max_image_pixels)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Layout parameters for a source whose width/height ratio is `aspect`.
    pub fn layout_options(&self, aspect: Option<f64>) -> LayoutOptions {
        let (slide_width, slide_height) = self.slide_size.dimensions(aspect);
        LayoutOptions {
            slide_width,
            slide_height,
            min_element_emu: self.min_element_emu,
            image_regions: self.image_regions,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
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

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn slide_size(mut self, size: SlideSize) -> Self {
        self.config.slide_size = size;
        self
    }

    pub fn image_regions(mut self, mode: ImageRegionMode) -> Self {
        self.config.image_regions = mode;
        self
    }

    pub fn min_element_emu(mut self, emu: i64) -> Self {
        self.config.min_element_emu = emu.max(0);
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px.max(64);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Img2PptxError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(Img2PptxError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Img2PptxError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if let SlideSize::Custom { width_emu, height_emu } = c.slide_size {
            let range = MIN_SLIDE_EMU..=MAX_SLIDE_EMU;
            if !range.contains(&width_emu) || !range.contains(&height_emu) {
                return Err(Img2PptxError::InvalidConfig(format!(
                    "Slide size must be {MIN_SLIDE_EMU}–{MAX_SLIDE_EMU} EMU per side, got {width_emu}x{height_emu}"
                )));
            }
        }
        if c.min_element_emu >= MIN_SLIDE_EMU {
            return Err(Img2PptxError::InvalidConfig(format!(
                "min_element_emu must be below {MIN_SLIDE_EMU}, got {}",
                c.min_element_emu
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Dimensions of the generated slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlideSize {
    /// 16:9, 13.333" × 7.5". (default)
    #[default]
    Widescreen,
    /// 4:3, 10" × 7.5".
    Standard,
    /// 7.5" high, width following the source image's aspect ratio.
    /// Falls back to widescreen when the aspect ratio is unknown.
    MatchImage,
    /// Explicit size in EMU.
    Custom { width_emu: i64, height_emu: i64 },
}

impl SlideSize {
    /// `(width, height)` in EMU. `aspect` is the source's width / height.
    pub fn dimensions(&self, aspect: Option<f64>) -> (i64, i64) {
        match *self {
            SlideSize::Widescreen => Presentation::WIDESCREEN,
            SlideSize::Standard => Presentation::STANDARD,
            SlideSize::Custom {
                width_emu,
                height_emu,
            } => (width_emu, height_emu),
            SlideSize::MatchImage => match aspect {
                Some(a) if a.is_finite() && a > 0.0 => {
                    let height = Presentation::WIDESCREEN.1;
                    let width = (height as f64 * a).round() as i64;
                    (width.clamp(MIN_SLIDE_EMU, MAX_SLIDE_EMU), height)
                }
                _ => Presentation::WIDESCREEN,
            },
        }
    }
}
