//! End-to-end integration tests for edgequake-img2pptx.
//!
//! These tests make live LLM API calls. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested. Slide images are drawn on the fly; screenshots
//! placed in `./test_cases/` are converted as well when present.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_convert_drawn_slide -- --nocapture

use edgequake_img2pptx::{
    analyze, build_presentation, convert, convert_batch, convert_from_bytes, convert_to_file,
    ConversionConfig, ConversionProgressCallback, ElementError, ImageRegionMode, SlideSize,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// A 1280×720 "slide": navy background, a white header band, two coloured
/// boxes and a grey circle. No text, so nothing depends on installed fonts.
fn drawn_slide() -> DynamicImage {
    let (w, h) = (1280u32, 720u32);
    let mut img = RgbaImage::from_pixel(w, h, Rgba([0x1E, 0x27, 0x61, 0xFF]));

    let mut fill = |x0: u32, y0: u32, x1: u32, y1: u32, c: [u8; 4]| {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Rgba(c));
            }
        }
    };
    fill(0, 0, w, 110, [0xFF, 0xFF, 0xFF, 0xFF]);
    fill(100, 220, 560, 620, [0xE0, 0x6C, 0x3C, 0xFF]);
    fill(720, 220, 1180, 420, [0x44, 0x72, 0xC4, 0xFF]);

    let (cx, cy, r) = (950i64, 530i64, 80i64);
    for y in (cy - r)..(cy + r) {
        for x in (cx - r)..(cx + r) {
            if (x - cx).pow(2) + (y - cy).pow(2) <= r * r {
                img.put_pixel(x as u32, y as u32, Rgba([0xAA, 0xAA, 0xAA, 0xFF]));
            }
        }
    }
    DynamicImage::ImageRgba8(img)
}

fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn write_drawn_slide(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(&drawn_slide())).unwrap();
    path
}

fn assert_is_pptx(bytes: &[u8], context: &str) {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .unwrap_or_else(|e| panic!("[{context}] not a zip: {e}"));
    assert!(
        archive.by_name("ppt/slides/slide1.xml").is_ok(),
        "[{context}] slide part missing"
    );
}

// ── Full conversion ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_drawn_slide() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_drawn_slide(dir.path(), "drawn.png");

    let output = convert(input.to_string_lossy(), &ConversionConfig::default())
        .await
        .expect("conversion should succeed");

    assert_is_pptx(&output.pptx, "drawn");
    let stats = &output.stats;
    println!("{stats:#?}");
    assert!(stats.total_elements > 0, "model found no elements");
    assert_eq!(
        stats.placed_elements + stats.skipped_elements,
        stats.total_elements
    );
    assert_eq!((stats.image_width_px, stats.image_height_px), (1280, 720));
    assert!(stats.input_tokens > 0);
    assert_eq!(stats.pptx_bytes, output.pptx.len());
}

#[tokio::test]
async fn test_convert_to_file_with_crop_and_matching_size() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_drawn_slide(dir.path(), "drawn.png");
    let out = dir.path().join("out/drawn.pptx");

    let config = ConversionConfig::builder()
        .slide_size(SlideSize::MatchImage)
        .image_regions(ImageRegionMode::Crop)
        .build()
        .unwrap();
    let stats = convert_to_file(input.to_string_lossy(), &out, &config)
        .await
        .expect("conversion should succeed");

    let bytes = std::fs::read(&out).unwrap();
    assert_is_pptx(&bytes, "to_file");
    assert_eq!(stats.pptx_bytes, bytes.len());
    // 16:9 source, 7.5" high slide.
    assert_eq!(stats.slide_height_emu, 6_858_000);
    assert_eq!(stats.slide_width_emu, 12_192_000);
}

#[tokio::test]
async fn test_convert_from_bytes() {
    e2e_skip_unless_enabled!();
    let bytes = png_bytes(&drawn_slide());
    let output = convert_from_bytes(&bytes, &ConversionConfig::default())
        .await
        .expect("conversion should succeed");
    assert_is_pptx(&output.pptx, "from_bytes");
}

#[tokio::test]
async fn test_analyze_then_rebuild_offline() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_drawn_slide(dir.path(), "drawn.png");

    let analysis = analyze(input.to_string_lossy(), &ConversionConfig::default())
        .await
        .expect("analysis should succeed");
    assert!(!analysis.elements.is_empty());

    let saved = serde_json::to_string(&analysis).unwrap();
    let reloaded = serde_json::from_str(&saved).unwrap();
    let built = build_presentation(&reloaded, &ConversionConfig::default()).unwrap();
    assert_is_pptx(&built.pptx, "rebuild");
    assert_eq!(
        built.shape_count + built.skipped.len(),
        analysis.elements.len()
    );
}

#[tokio::test]
async fn test_batch_mixed_success_and_failure() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let a = write_drawn_slide(dir.path(), "a.png");
    let b = write_drawn_slide(dir.path(), "b.png");
    let out = dir.path().join("decks");

    let inputs = vec![
        a.to_string_lossy().into_owned(),
        dir.path().join("missing.png").to_string_lossy().into_owned(),
        b.to_string_lossy().into_owned(),
    ];
    let config = ConversionConfig::builder().concurrency(2).build().unwrap();
    let items = convert_batch(&inputs, &out, &config).await;

    assert_eq!(items.len(), 3);
    assert!(items[0].is_success(), "{:?}", items[0].error);
    assert!(!items[1].is_success());
    assert!(items[2].is_success(), "{:?}", items[2].error);
    assert!(out.join("a.pptx").exists());
    assert!(out.join("b.pptx").exists());
}

#[tokio::test]
async fn test_test_cases_screenshots() {
    e2e_skip_unless_enabled!();
    let Ok(entries) = std::fs::read_dir(test_cases_dir()) else {
        println!("SKIP — no test_cases/ directory");
        return;
    };
    let images: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("png" | "jpg" | "jpeg" | "webp" | "gif")
            )
        })
        .collect();

    for path in images {
        let name = path.display().to_string();
        let output = convert(&name, &ConversionConfig::default())
            .await
            .unwrap_or_else(|e| panic!("[{name}] {e}"));
        assert_is_pptx(&output.pptx, &name);
        println!(
            "{name}: {}/{} elements placed",
            output.stats.placed_elements, output.stats.total_elements
        );
    }
}

// ── Progress callbacks ───────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<&'static str>>,
    skipped: AtomicUsize,
}

impl ConversionProgressCallback for EventLog {
    fn on_conversion_start(&self, _input: &str) {
        self.events.lock().unwrap().push("start");
    }
    fn on_analysis_start(&self, _input: &str) {
        self.events.lock().unwrap().push("analysis_start");
    }
    fn on_analysis_complete(&self, _input: &str, _element_count: usize) {
        self.events.lock().unwrap().push("analysis_complete");
    }
    fn on_element_skipped(&self, _input: &str, _error: &ElementError) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
    fn on_conversion_complete(&self, _input: &str, _placed: usize, _skipped: usize) {
        self.events.lock().unwrap().push("complete");
    }
    fn on_conversion_error(&self, _input: &str, _error: &str) {
        self.events.lock().unwrap().push("error");
    }
}

#[tokio::test]
async fn test_progress_callbacks_in_spawned_task() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_drawn_slide(dir.path(), "drawn.png");

    let log = Arc::new(EventLog::default());
    let config = ConversionConfig::builder()
        .progress_callback(log.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();

    let input = input.to_string_lossy().into_owned();
    let handle = tokio::spawn(async move { convert(input, &config).await });
    let output = handle.await.unwrap().expect("conversion should succeed");

    let events = log.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec!["start", "analysis_start", "analysis_complete", "complete"]
    );
    assert_eq!(log.skipped.load(Ordering::SeqCst), output.skipped.len());
}
