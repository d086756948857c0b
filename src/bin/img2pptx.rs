//! CLI binary for edgequake-img2pptx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_img2pptx::convert::input_stem;
use edgequake_img2pptx::pipeline::parse::parse_analysis;
use edgequake_img2pptx::{
    build_presentation, convert, convert_batch, demo_analysis, write_pptx, ConversionConfig,
    ConversionProgressCallback, ElementError, ImageRegionMode, ProgressCallback, SlideAnalysis,
    SlideSize,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over all images plus a log line per
/// image. Images of a batch finish out of order, so timings are keyed by
/// input.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let template = if total > 1 {
            "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos:>3}/{len}  {msg}  ⏱ {elapsed_precise}"
        } else {
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}"
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, input: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(input))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) -> usize {
        self.bar.finish_and_clear();
        self.errors.load(Ordering::SeqCst)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, input: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(input.to_string(), Instant::now());
        }
        self.bar.set_message(format!("reading {}", short_name(input)));
    }

    fn on_analysis_start(&self, input: &str) {
        self.bar
            .set_message(format!("analysing {}", short_name(input)));
    }

    fn on_analysis_complete(&self, input: &str, element_count: usize) {
        self.bar.set_message(format!(
            "building {} ({element_count} elements)",
            short_name(input)
        ));
    }

    fn on_element_skipped(&self, input: &str, error: &ElementError) {
        self.bar.println(format!(
            "    {} {}  {}",
            yellow("·"),
            dim(&short_name(input)),
            dim(&error.to_string())
        ));
    }

    fn on_conversion_complete(&self, input: &str, placed: usize, skipped: usize) {
        let secs = self.elapsed_secs(input);
        let skipped_note = if skipped > 0 {
            yellow(&format!("{skipped} skipped"))
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} {}  {}  {}  {}",
            green("✓"),
            short_name(input),
            dim(&format!("{placed:>3} shapes")),
            skipped_note,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_error(&self, input: &str, error: &str) {
        let secs = self.elapsed_secs(input);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per image.
        let msg = error.lines().next().unwrap_or(error);
        let msg = if msg.chars().count() > 80 {
            format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
        } else {
            msg.to_string()
        };

        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            short_name(input),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }
}

/// Last path component of a path or URL, for compact log lines.
fn short_name(input: &str) -> String {
    input
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(input)
        .to_string()
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a slide image (writes slide.pptx)
  img2pptx slide.png

  # Choose the output file
  img2pptx slide.jpg -o rebuilt.pptx

  # Convert from URL, 4:3 slide, crop picture regions from the source
  img2pptx https://example.com/deck/03.png --slide-size 4x3 --image-regions crop

  # Several images, one .pptx each, into a directory
  img2pptx shots/*.png -o decks/

  # Keep the model's layout description, rebuild later without AI
  img2pptx slide.png --save-analysis slide.json
  img2pptx --from-json slide.json -o slide.pptx

  # Sample presentation (no API key needed)
  img2pptx --demo

  # Use a specific model
  img2pptx --provider openai --model gpt-4.1 slide.png

SUPPORTED PROVIDERS & MODELS:
  Provider     Model                              Vision
  ─────────    ─────────────────────────────────  ──────
  anthropic    claude-sonnet-4-20250514 (default) ✓
  openai       gpt-4.1 (default), gpt-4.1-mini    ✓
  gemini       gemini-2.5-flash, gemini-2.5-pro   ✓
  ollama       llava, llama3.2-vision             ✓

  A slide costs one VLM call: ~1,500 input tokens for the image plus
  ~1,000–3,000 output tokens of layout JSON.

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (preferred when several are set)
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used with EDGEQUAKE_MODEL when both are set
  EDGEQUAKE_MODEL         Override model ID
  IMG2PPTX_*              Every flag has an IMG2PPTX_ variable, e.g. IMG2PPTX_SLIDE_SIZE=4x3

SUPPORTED INPUTS:
  PNG, JPEG, GIF and WebP, as local files or HTTP/HTTPS URLs.
"#;

/// Convert slide images into editable PowerPoint files using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "img2pptx",
    version,
    about = "Convert slide images into editable PowerPoint files using Vision LLMs",
    long_about = "Convert slide images (local files or URLs) into editable single-slide .pptx \
files. A Vision Language Model describes the slide's text, shapes and pictures; each element \
is rebuilt as a native PowerPoint shape. Supports Anthropic, OpenAI, Google Gemini, and any \
OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Slide image files or HTTP/HTTPS URLs.
    #[arg(required_unless_present_any = ["demo", "from_json"])]
    inputs: Vec<String>,

    /// Output .pptx file; a directory when several inputs are given.
    #[arg(short, long, env = "IMG2PPTX_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. claude-sonnet-4-20250514, gpt-4.1).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: anthropic, openai, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: anthropic, openai, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Slide dimensions: 16x9, 4x3, or image (follow the source aspect ratio).
    #[arg(long, env = "IMG2PPTX_SLIDE_SIZE", value_enum, default_value = "16x9")]
    slide_size: SlideSizeArg,

    /// How picture regions are rendered: placeholder boxes or crops of the source.
    #[arg(long, env = "IMG2PPTX_IMAGE_REGIONS", value_enum, default_value = "placeholder")]
    image_regions: ImageRegionsArg,

    /// Build from a saved layout JSON instead of analysing an image.
    #[arg(long, env = "IMG2PPTX_FROM_JSON", conflicts_with_all = ["inputs", "demo"])]
    from_json: Option<PathBuf>,

    /// Build the bundled sample slide (no API key needed).
    #[arg(long, conflicts_with = "inputs")]
    demo: bool,

    /// Write the layout JSON used for the slide to this file.
    #[arg(long, env = "IMG2PPTX_SAVE_ANALYSIS")]
    save_analysis: Option<PathBuf>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "IMG2PPTX_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "IMG2PPTX_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "IMG2PPTX_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries on LLM failure.
    #[arg(long, env = "IMG2PPTX_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Number of images converted at once.
    #[arg(short, long, env = "IMG2PPTX_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output a JSON summary instead of human-readable lines.
    #[arg(long, env = "IMG2PPTX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMG2PPTX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2PPTX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2PPTX_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IMG2PPTX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "IMG2PPTX_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SlideSizeArg {
    #[value(name = "16x9")]
    Wide,
    #[value(name = "4x3")]
    Standard,
    Image,
}

impl From<SlideSizeArg> for SlideSize {
    fn from(v: SlideSizeArg) -> Self {
        match v {
            SlideSizeArg::Wide => SlideSize::Widescreen,
            SlideSizeArg::Standard => SlideSize::Standard,
            SlideSizeArg::Image => SlideSize::MatchImage,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImageRegionsArg {
    Placeholder,
    Crop,
}

impl From<ImageRegionsArg> for ImageRegionMode {
    fn from(v: ImageRegionsArg) -> Self {
        match v {
            ImageRegionsArg::Placeholder => ImageRegionMode::Placeholder,
            ImageRegionsArg::Crop => ImageRegionMode::Crop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let offline = cli.demo || cli.from_json.is_some();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !offline;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── No-AI modes ──────────────────────────────────────────────────────
    if offline {
        let config = build_config(&cli, None).await?;
        return run_offline(&cli, &config).await;
    }

    if cli.inputs.len() > 1 && cli.save_analysis.is_some() {
        anyhow::bail!("--save-analysis works with a single input only");
    }

    let progress = show_progress.then(|| CliProgressCallback::new(cli.inputs.len()));
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )
    .await?;

    if cli.inputs.len() == 1 {
        run_single(&cli, &config, progress.as_deref()).await
    } else {
        run_batch(&cli, &config, progress.as_deref()).await
    }
}

/// `--demo` / `--from-json`: layout and packaging only.
async fn run_offline(cli: &Cli, config: &ConversionConfig) -> Result<()> {
    let analysis: SlideAnalysis = match cli.from_json {
        Some(ref path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read layout JSON from {:?}", path))?;
            parse_analysis(&text).with_context(|| format!("Invalid layout JSON in {:?}", path))?
        }
        None => demo_analysis(),
    };

    let built = build_presentation(&analysis, config).context("Failed to build presentation")?;
    let output_path = cli.output.clone().unwrap_or_else(generated_name);
    write_pptx(&output_path, built.pptx.clone())
        .await
        .context("Failed to write presentation")?;
    save_analysis(cli, &analysis).await?;

    if cli.json {
        let summary = serde_json::json!({
            "output": output_path,
            "shapes": built.shape_count,
            "skipped": built.skipped,
            "slide_width_emu": built.slide_width_emu,
            "slide_height_emu": built.slide_height_emu,
            "title": built.title,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        for e in &built.skipped {
            eprintln!("  {} {}", yellow("·"), dim(&e.to_string()));
        }
        eprintln!(
            "{}  {} shapes  →  {}",
            green("✔"),
            built.shape_count,
            bold(&output_path.display().to_string()),
        );
    }
    Ok(())
}

async fn run_single(
    cli: &Cli,
    config: &ConversionConfig,
    progress: Option<&CliProgressCallback>,
) -> Result<()> {
    let input = &cli.inputs[0];
    let result = convert(input, config).await;
    if let Some(cb) = progress {
        cb.finish();
    }
    let output = result.context("Conversion failed")?;

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.pptx", input_stem(input))));
    let stats = output.stats.clone();
    write_pptx(&output_path, output.pptx)
        .await
        .context("Failed to write presentation")?;
    save_analysis(cli, &output.analysis).await?;

    if cli.json {
        let summary = serde_json::json!({
            "input": input,
            "output": output_path,
            "stats": stats,
            "skipped": output.skipped,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        if progress.is_none() {
            for e in &output.skipped {
                eprintln!("  {} {}", yellow("·"), dim(&e.to_string()));
            }
        }
        eprintln!(
            "{}  {}/{} elements placed  {}ms  →  {}",
            if stats.skipped_elements == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.placed_elements,
            stats.total_elements,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.input_tokens.to_string()),
            dim(&stats.output_tokens.to_string()),
        );
    }
    Ok(())
}

async fn run_batch(
    cli: &Cli,
    config: &ConversionConfig,
    progress: Option<&CliProgressCallback>,
) -> Result<()> {
    let output_dir = batch_output_dir(cli.output.as_deref())?;
    if !cli.quiet && progress.is_some() {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {} images…", cli.inputs.len()))
        );
    }

    let items = convert_batch(&cli.inputs, &output_dir, config).await;
    if let Some(cb) = progress {
        cb.finish();
    }
    let failed = items.iter().filter(|i| !i.is_success()).count();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&items).context("Failed to serialise results")?
        );
    } else if !cli.quiet {
        if progress.is_none() {
            for item in &items {
                match (&item.output, &item.error) {
                    (Some(out), None) => {
                        eprintln!("  {} {} → {}", green("✓"), item.input, out.display())
                    }
                    (_, Some(err)) => eprintln!("  {} {}  {}", red("✗"), item.input, red(err)),
                    _ => {}
                }
            }
        }
        let ok = items.len() - failed;
        eprintln!(
            "{} {}/{} images converted  →  {}",
            if failed == 0 {
                green("✔")
            } else if ok == 0 {
                red("✘")
            } else {
                cyan("⚠")
            },
            bold(&ok.to_string()),
            items.len(),
            bold(&output_dir.display().to_string()),
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} images failed", items.len());
    }
    Ok(())
}

async fn save_analysis(cli: &Cli, analysis: &SlideAnalysis) -> Result<()> {
    if let Some(ref path) = cli.save_analysis {
        let json = serde_json::to_string_pretty(analysis).context("Failed to serialise analysis")?;
        write_text(path, &json).await?;
    }
    Ok(())
}

async fn write_text(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

/// `converted_<8 hex>.pptx`, for outputs with no input file to name them after.
fn generated_name() -> PathBuf {
    let id = Uuid::new_v4().simple().to_string();
    PathBuf::from(format!("converted_{}.pptx", &id[..8]))
}

/// Directory for batch outputs; `-o` must not name a `.pptx` file there.
fn batch_output_dir(output: Option<&Path>) -> Result<PathBuf> {
    match output {
        None => Ok(PathBuf::from(".")),
        Some(p)
            if p.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pptx")) =>
        {
            anyhow::bail!(
                "--output {:?} looks like a file, but several inputs need a directory",
                p
            )
        }
        Some(p) => Ok(p.to_path_buf()),
    }
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ConversionConfig::builder()
        .slide_size(cli.slide_size.into())
        .image_regions(cli.image_regions.into())
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
