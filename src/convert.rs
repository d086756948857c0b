//! Conversion entry points.
//!
//! ```text
//! convert ──▶ resolve input ──▶ analyse (VLM) ──▶ render_presentation
//!                                                  │
//! build_presentation (no AI) ─────────────────────┘
//! ```
//!
//! [`convert`] runs the whole pipeline for one image. [`analyze`] stops after
//! the model's answer has been parsed; [`build_presentation`] starts from an
//! existing [`SlideAnalysis`] and needs neither a provider nor a network.

use crate::analysis::SlideAnalysis;
use crate::config::ConversionConfig;
use crate::error::Img2PptxError;
use crate::layout::layout_slide;
use crate::output::{BatchItem, BuiltPresentation, ConversionOutput, ConversionStats};
use crate::pipeline::input::{self, SourceImage};
use crate::pipeline::{encode, llm, parse};
use crate::pptx::Presentation;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used with Anthropic when none is configured.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Model used with OpenAI when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Convert a slide image (file path or URL) into a single-slide `.pptx`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some elements could not be
/// placed (check `output.skipped`).
///
/// # Errors
/// Returns `Err(Img2PptxError)` only for fatal errors:
/// - File not found / permission denied / download failure
/// - Not an image
/// - Provider not configured, or the VLM call failed after all retries
/// - The model's answer is not a layout description
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PptxError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(input_str);
    }

    let result = async {
        let source = input::resolve_input(input_str, config.download_timeout_secs).await?;
        convert_source(input_str, source, config).await
    }
    .await;
    report_failure(input_str, config, result)
}

/// Convert a slide image and write the `.pptx` directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files;
/// missing parent directories are created.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Img2PptxError> {
    let output = convert(input_str, config).await?;
    write_pptx(output_path.as_ref(), output.pptx).await?;
    Ok(output.stats)
}

/// Convert image bytes already in memory.
///
/// The media type is sniffed from the bytes; there is no file name to fall
/// back on, so unrecognised data is rejected.
///
/// # Example
/// ```rust,no_run
/// use edgequake_img2pptx::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("slide.png")?;
/// let output = convert_from_bytes(&bytes, &ConversionConfig::default()).await?;
/// std::fs::write("slide.pptx", &output.pptx)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PptxError> {
    const NAME: &str = "<bytes>";
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(NAME);
    }
    let result = async {
        let source = input::from_bytes(NAME, bytes.to_vec())?;
        convert_source(NAME, source, config).await
    }
    .await;
    report_failure(NAME, config, result)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PptxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2PptxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Run only the AI step: return the model's layout description of the image.
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<SlideAnalysis, Img2PptxError> {
    let source = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let decoded = encode::decode(&source);
    let provider = resolve_provider(config).await?;
    let (analysis, _call) = run_analysis(&provider, &source, decoded.as_ref(), config).await?;
    Ok(analysis)
}

/// Build a presentation from an existing analysis. No AI, no network.
///
/// Image regions are always rendered as placeholders here, since there is
/// no source image to crop from.
pub fn build_presentation(
    analysis: &SlideAnalysis,
    config: &ConversionConfig,
) -> Result<BuiltPresentation, Img2PptxError> {
    render_presentation(analysis, config, None)
}

/// Convert several images, each into its own single-slide file in
/// `output_dir`, with at most `config.concurrency` conversions in flight.
///
/// Output files are named `<input stem>.pptx`; repeated stems get a `-2`,
/// `-3`, … suffix. One failing image never stops the others: every input
/// gets a [`BatchItem`], in input order.
pub async fn convert_batch<S: AsRef<str>>(
    inputs: &[S],
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Vec<BatchItem> {
    let output_dir = output_dir.as_ref();
    let inputs: Vec<&str> = inputs.iter().map(AsRef::as_ref).collect();
    let outputs = output_names(&inputs, output_dir);

    // One provider for the whole batch.
    let config = match resolve_provider(config).await {
        Ok(provider) => {
            let mut c = config.clone();
            c.provider = Some(provider);
            c
        }
        Err(e) => {
            warn!("No provider for batch: {}", e);
            let msg = e.to_string();
            return inputs
                .iter()
                .map(|input| {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_conversion_start(input);
                        cb.on_conversion_error(input, &msg);
                    }
                    BatchItem {
                        input: input.to_string(),
                        output: None,
                        stats: None,
                        skipped: Vec::new(),
                        error: Some(msg.clone()),
                    }
                })
                .collect();
        }
    };

    info!(
        "Converting {} images with concurrency {}",
        inputs.len(),
        config.concurrency
    );

    let config = &config;
    let mut items: Vec<(usize, BatchItem)> = stream::iter(inputs.iter().zip(outputs).enumerate().map(
        |(idx, (input, output))| async move {
            let item = match convert(input, config).await {
                Ok(out) => match write_pptx(&output, out.pptx).await {
                    Ok(()) => BatchItem {
                        input: input.to_string(),
                        output: Some(output),
                        stats: Some(out.stats),
                        skipped: out.skipped,
                        error: None,
                    },
                    Err(e) => failed_item(input, &e),
                },
                Err(e) => failed_item(input, &e),
            };
            (idx, item)
        },
    ))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    items.sort_by_key(|(idx, _)| *idx);
    items.into_iter().map(|(_, item)| item).collect()
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn failed_item(input: &str, e: &Img2PptxError) -> BatchItem {
    warn!("{}: {}", input, e);
    BatchItem {
        input: input.to_string(),
        output: None,
        stats: None,
        skipped: Vec::new(),
        error: Some(e.to_string()),
    }
}

fn report_failure<T>(
    input: &str,
    config: &ConversionConfig,
    result: Result<T, Img2PptxError>,
) -> Result<T, Img2PptxError> {
    if let (Err(e), Some(cb)) = (&result, &config.progress_callback) {
        cb.on_conversion_error(input, &e.to_string());
    }
    result
}

/// Everything after input resolution.
async fn convert_source(
    label: &str,
    source: SourceImage,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PptxError> {
    let total_start = Instant::now();

    // ── Step 1: Decode the image ─────────────────────────────────────────
    let decoded = encode::decode(&source);

    // ── Step 2: Get/create provider ──────────────────────────────────────
    let provider = resolve_provider(config).await?;

    // ── Step 3: Ask the VLM for the layout ───────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(label);
    }
    let (analysis, call) = run_analysis(&provider, &source, decoded.as_ref(), config).await?;
    info!(
        "{}: {} elements analysed in {}ms",
        label,
        analysis.elements.len(),
        call.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(label, analysis.elements.len());
    }

    // ── Step 4: Lay out and package ──────────────────────────────────────
    let built = render_presentation(&analysis, config, decoded.as_ref())?;
    if let Some(ref cb) = config.progress_callback {
        for e in &built.skipped {
            cb.on_element_skipped(label, e);
        }
    }

    // ── Step 5: Compute stats ────────────────────────────────────────────
    let stats = ConversionStats {
        total_elements: analysis.elements.len(),
        placed_elements: built.shape_count,
        skipped_elements: built.skipped.len(),
        input_tokens: call.input_tokens,
        output_tokens: call.output_tokens,
        retries: call.retries,
        image_width_px: decoded.as_ref().map_or(0, |i| i.width()),
        image_height_px: decoded.as_ref().map_or(0, |i| i.height()),
        slide_width_emu: built.slide_width_emu,
        slide_height_emu: built.slide_height_emu,
        pptx_bytes: built.pptx.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        llm_duration_ms: call.duration_ms,
    };

    info!(
        "Conversion complete: {}/{} elements placed, {}ms total",
        stats.placed_elements, stats.total_elements, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(label, stats.placed_elements, stats.skipped_elements);
    }

    Ok(ConversionOutput {
        pptx: built.pptx,
        analysis,
        skipped: built.skipped,
        stats,
    })
}

async fn run_analysis(
    provider: &Arc<dyn LLMProvider>,
    source: &SourceImage,
    decoded: Option<&DynamicImage>,
    config: &ConversionConfig,
) -> Result<(SlideAnalysis, llm::AnalysisCall), Img2PptxError> {
    let image_data = encode::encode_for_vlm(source, decoded, config.max_image_pixels)?;
    let call = llm::analyze_image(provider, image_data, config).await?;
    let analysis = parse::parse_analysis(&call.text)?;
    Ok((analysis, call))
}

/// Layout + packaging. `source` enables cropping and image-sized slides.
fn render_presentation(
    analysis: &SlideAnalysis,
    config: &ConversionConfig,
    source: Option<&DynamicImage>,
) -> Result<BuiltPresentation, Img2PptxError> {
    let aspect = source
        .filter(|img| img.height() > 0)
        .map(|img| img.width() as f64 / img.height() as f64)
        .or_else(|| analysis.aspect_ratio());
    let options = config.layout_options(aspect);

    let laid_out = layout_slide(analysis, &options, source);
    let shape_count = laid_out.slide.shapes().len();

    let mut presentation = Presentation::new(options.slide_width, options.slide_height, laid_out.slide);
    if let Some(ref title) = laid_out.title {
        presentation = presentation.with_title(title.clone());
    }
    let pptx = presentation.to_bytes()?;
    debug!(
        "Built {} shapes ({} skipped) into {} bytes",
        shape_count,
        laid_out.skipped.len(),
        pptx.len()
    );

    Ok(BuiltPresentation {
        pptx,
        skipped: laid_out.skipped,
        shape_count,
        slide_width_emu: options.slide_width,
        slide_height_emu: options.slide_height,
        title: laid_out.title,
    })
}

/// Write `bytes` to `path` atomically: temp file in the same directory,
/// then rename over the target. Missing parent directories are created.
pub async fn write_pptx(path: &Path, bytes: Vec<u8>) -> Result<(), Img2PptxError> {
    let target = path.to_path_buf();
    let to_err = |source: std::io::Error| Img2PptxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".img2pptx-")
            .suffix(".tmp")
            .tempfile_in(&parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| Img2PptxError::Internal(format!("write task failed: {e}")))?
    .map_err(to_err)
}

/// `<output_dir>/<stem>.pptx` for every input, de-duplicated.
fn output_names(inputs: &[&str], output_dir: &Path) -> Vec<PathBuf> {
    let mut used = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input_stem(input);
            let mut name = format!("{stem}.pptx");
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{stem}-{n}.pptx");
                n += 1;
            }
            output_dir.join(name)
        })
        .collect()
}

/// File stem of a path or of a URL's last path segment; `slide` if none.
pub fn input_stem(input: &str) -> String {
    let path_part = if input::is_url(input) {
        reqwest::Url::parse(input)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .unwrap_or_default()
    } else {
        input.to_string()
    };
    Path::new(&path_part)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("slide")
        .to_string()
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Img2PptxError> {
    debug!("Using provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Img2PptxError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn default_model_for(provider_name: &str) -> &'static str {
    match provider_name.to_ascii_lowercase().as_str() {
        "anthropic" | "claude" => DEFAULT_ANTHROPIC_MODEL,
        _ => DEFAULT_OPENAI_MODEL,
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — created through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    both set means the environment chose provider and model.
/// 4. **`ANTHROPIC_API_KEY`** — slide analysis was tuned on Claude, so it is
///    preferred when several keys are present.
/// 5. **`OPENAI_API_KEY`**.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub async fn resolve_provider(
    config: &ConversionConfig,
) -> Result<Arc<dyn LLMProvider>, Img2PptxError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(name));
        return create_vision_provider(name, model);
    }

    // 3) EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL when both set
    if let (Some(prov), Some(model)) = (
        env_non_empty("EDGEQUAKE_LLM_PROVIDER"),
        env_non_empty("EDGEQUAKE_MODEL"),
    ) {
        return create_vision_provider(&prov, config.model.as_deref().unwrap_or(&model));
    }

    // 4) / 5) Well-known API keys
    if env_non_empty("ANTHROPIC_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_ANTHROPIC_MODEL);
        return create_vision_provider("anthropic", model);
    }
    if env_non_empty("OPENAI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_vision_provider("openai", model);
    }

    // 6) Whatever the factory can find
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Img2PptxError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set ANTHROPIC_API_KEY or OPENAI_API_KEY, or pass --provider.\n\
                Tip: --demo or --from-json build a presentation without any provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
