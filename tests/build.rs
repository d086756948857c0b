//! Offline integration tests: analysis → `.pptx` package, and the AI step
//! driven by scripted providers.
//!
//! Nothing here needs an API key or network access. Generated packages are
//! opened with `zip` and their XML parts parsed with `roxmltree`, the way a
//! reader application would.

use edgequake_img2pptx::pipeline::parse::parse_analysis;
use edgequake_img2pptx::{
    build_presentation, convert, convert_batch, convert_from_bytes, demo_analysis,
    ConversionConfig, ConversionProgressCallback, ElementError, Img2PptxError, NoopProgressCallback,
    SlideSize,
};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LLMResponse, MockProvider};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ── Test helpers ─────────────────────────────────────────────────────────────

const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

struct Package {
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl Package {
    fn open(bytes: Vec<u8>) -> Self {
        Self {
            archive: zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip"),
        }
    }

    fn part(&mut self, name: &str) -> String {
        let mut file = self
            .archive
            .by_name(name)
            .unwrap_or_else(|_| panic!("missing part {name}"));
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }

    fn names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }
}

/// Shapes (`p:sp`, `p:pic`) directly in the slide's shape tree.
fn slide_shapes(slide_xml: &str) -> usize {
    let doc = roxmltree::Document::parse(slide_xml).expect("slide XML parses");
    let tree = doc
        .descendants()
        .find(|n| n.has_tag_name((P_NS, "spTree")))
        .expect("spTree present");
    tree.children()
        .filter(|n| n.has_tag_name((P_NS, "sp")) || n.has_tag_name((P_NS, "pic")))
        .count()
}

fn slide_text(slide_xml: &str) -> Vec<String> {
    let doc = roxmltree::Document::parse(slide_xml).unwrap();
    doc.descendants()
        .filter(|n| n.has_tag_name((A_NS, "t")))
        .filter_map(|n| n.text().map(str::to_string))
        .collect()
}

fn slide_size(presentation_xml: &str) -> (i64, i64) {
    let doc = roxmltree::Document::parse(presentation_xml).unwrap();
    let sz = doc
        .descendants()
        .find(|n| n.has_tag_name((P_NS, "sldSz")))
        .expect("sldSz present");
    (
        sz.attribute("cx").unwrap().parse().unwrap(),
        sz.attribute("cy").unwrap().parse().unwrap(),
    )
}

// ── Demo slide ───────────────────────────────────────────────────────────────

#[test]
fn test_demo_package_has_all_parts() {
    let built = build_presentation(&demo_analysis(), &ConversionConfig::default()).unwrap();
    let pkg = Package::open(built.pptx);
    let names = pkg.names();
    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "docProps/core.xml",
        "docProps/app.xml",
        "ppt/presentation.xml",
        "ppt/_rels/presentation.xml.rels",
        "ppt/slides/slide1.xml",
        "ppt/slides/_rels/slide1.xml.rels",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/theme/theme1.xml",
    ] {
        assert!(names.iter().any(|n| n == part), "missing {part}");
    }
}

#[test]
fn test_every_xml_part_is_well_formed() {
    let built = build_presentation(&demo_analysis(), &ConversionConfig::default()).unwrap();
    let mut pkg = Package::open(built.pptx);
    for name in pkg.names() {
        if name.ends_with(".xml") || name.ends_with(".rels") {
            let xml = pkg.part(&name);
            assert!(
                roxmltree::Document::parse(&xml).is_ok(),
                "{name} is not well-formed XML"
            );
        }
    }
}

#[test]
fn test_demo_slide_content() {
    let built = build_presentation(&demo_analysis(), &ConversionConfig::default()).unwrap();
    assert_eq!(built.shape_count, 6);
    assert!(built.skipped.is_empty());

    let mut pkg = Package::open(built.pptx);
    let slide = pkg.part("ppt/slides/slide1.xml");
    assert_eq!(slide_shapes(&slide), 6);

    let text = slide_text(&slide);
    assert!(text.iter().any(|t| t == "Sales Report FY2025"));
    assert!(text.iter().any(|t| t == "[Sales trend bar chart]"));

    assert_eq!(slide_size(&pkg.part("ppt/presentation.xml")), (12_192_000, 6_858_000));
    assert!(pkg
        .part("docProps/core.xml")
        .contains("<dc:title>Sales Report FY2025</dc:title>"));
}

#[test]
fn test_standard_slide_size() {
    let config = ConversionConfig::builder()
        .slide_size(SlideSize::Standard)
        .build()
        .unwrap();
    let built = build_presentation(&demo_analysis(), &config).unwrap();
    let mut pkg = Package::open(built.pptx);
    assert_eq!(slide_size(&pkg.part("ppt/presentation.xml")), (9_144_000, 6_858_000));
}

// ── Saved / model JSON ───────────────────────────────────────────────────────

#[test]
fn test_bad_elements_are_skipped_not_fatal() {
    let json = r##"```json
{
  "background": {"type": "solid", "color": "#FFFFFF"},
  "elements": [
    {"type": "text", "content": "Kept", "x_percent": 5, "y_percent": 5,
     "width_percent": 50, "height_percent": 10, "font_color": "#000000"},
    {"type": "chart", "x_percent": 0},
    {"type": "shape", "shape_type": "oval", "fill_color": "#GGGGGG"},
    "not an object",
    {"content": "no type"},
    {"type": "shape", "shape_type": "rounded_rectangle", "fill_color": "#4472C4",
     "x_percent": 60, "y_percent": 60, "width_percent": 30, "height_percent": 30}
  ]
}
```"##;
    let analysis = parse_analysis(json).unwrap();
    let built = build_presentation(&analysis, &ConversionConfig::default()).unwrap();

    assert_eq!(built.shape_count, 2);
    assert_eq!(built.skipped.len(), 4);
    let indices: Vec<usize> = built.skipped.iter().map(ElementError::index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    assert!(matches!(built.skipped[0], ElementError::UnknownType { ref kind, .. } if kind == "chart"));
    assert!(matches!(built.skipped[1], ElementError::InvalidColor { .. }));
    assert!(matches!(built.skipped[2], ElementError::Malformed { .. }));
    assert!(matches!(built.skipped[3], ElementError::Malformed { .. }));

    let mut pkg = Package::open(built.pptx);
    assert_eq!(slide_shapes(&pkg.part("ppt/slides/slide1.xml")), 2);
}

#[test]
fn test_empty_analysis_builds_blank_slide() {
    let analysis = parse_analysis("{}").unwrap();
    let built = build_presentation(&analysis, &ConversionConfig::default()).unwrap();
    assert_eq!(built.shape_count, 0);
    assert_eq!(built.title, None);

    let mut pkg = Package::open(built.pptx);
    assert_eq!(slide_shapes(&pkg.part("ppt/slides/slide1.xml")), 0);
}

#[test]
fn test_match_image_follows_model_dimensions() {
    let analysis = parse_analysis(
        r#"{"slide_width_px": 1000, "slide_height_px": 1000, "elements": []}"#,
    )
    .unwrap();
    let config = ConversionConfig::builder()
        .slide_size(SlideSize::MatchImage)
        .build()
        .unwrap();
    let built = build_presentation(&analysis, &config).unwrap();
    assert_eq!((built.slide_width_emu, built.slide_height_emu), (6_858_000, 6_858_000));
}

#[test]
fn test_analysis_survives_save_and_reload() {
    let saved = serde_json::to_string_pretty(&demo_analysis()).unwrap();
    let reloaded = parse_analysis(&saved).unwrap();
    assert_eq!(reloaded, demo_analysis());
}

// ── Progress events and fatal errors ─────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, input: &str) {
        self.events.lock().unwrap().push(format!("start {input}"));
    }
    fn on_analysis_start(&self, input: &str) {
        self.events.lock().unwrap().push(format!("analysis {input}"));
    }
    fn on_analysis_complete(&self, input: &str, element_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("analysed {input} {element_count}"));
    }
    fn on_element_skipped(&self, input: &str, error: &ElementError) {
        self.events
            .lock()
            .unwrap()
            .push(format!("skipped {input} {}", error.index()));
    }
    fn on_conversion_complete(&self, input: &str, placed: usize, skipped: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {input} {placed}/{skipped}"));
    }
    fn on_conversion_error(&self, input: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("error {input}"));
    }
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

fn recording_config(
    provider: Arc<dyn LLMProvider>,
    max_retries: u32,
) -> (ConversionConfig, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .provider(provider)
        .max_retries(max_retries)
        .retry_backoff_ms(1)
        .api_timeout_secs(5)
        .progress_callback(recorder.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();
    (config, recorder)
}

fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        16,
        9,
        image::Rgba([0x1E, 0x27, 0x61, 0xFF]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn test_not_an_image_from_bytes() {
    let err = convert_from_bytes(b"%PDF-1.7 not a picture", &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Img2PptxError::NotAnImage { .. }), "got {err}");
}

#[test]
fn test_empty_bytes_are_not_an_image() {
    let err = tokio_test::block_on(convert_from_bytes(&[], &ConversionConfig::default()))
        .unwrap_err();
    match err {
        Img2PptxError::NotAnImage { magic, .. } => assert_eq!(magic, [0; 4]),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_file_reports_error_callback() {
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();

    let err = convert("/definitely/not/here.png", &config).await.unwrap_err();
    assert!(matches!(err, Img2PptxError::FileNotFound { .. }));

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start /definitely/not/here.png".to_string(),
            "error /definitely/not/here.png".to_string()
        ]
    );
}

#[tokio::test]
async fn test_batch_keeps_input_order_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = ["/missing/b.png", "/missing/a.png", "/missing/c.png"];
    let items = convert_batch(&inputs, dir.path(), &ConversionConfig::default()).await;

    assert_eq!(items.len(), 3);
    for (item, input) in items.iter().zip(inputs) {
        assert_eq!(item.input, input);
        assert!(!item.is_success());
        assert!(item.output.is_none());
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_batch_without_provider_reports_every_input() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .provider_name("definitely-not-a-provider")
        .progress_callback(recorder.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();

    let items = convert_batch(&["a.png", "b.png"], dir.path(), &config).await;

    assert!(items.iter().all(|i| i.error.is_some()));
    assert_eq!(
        recorder.events(),
        vec!["start a.png", "error a.png", "start b.png", "error b.png"]
    );
}

// ── AI path with a scripted provider ─────────────────────────────────────────

#[tokio::test]
async fn test_empty_answer_is_retried() {
    let mock = MockProvider::new();
    mock.add_response("").await;
    mock.add_response(
        "```json\n{\"elements\": [{\"type\": \"text\", \"content\": \"Hello\", \"font_size_pt\": 32}]}\n```",
    )
    .await;
    let (config, recorder) = recording_config(Arc::new(mock), 3);

    let output = convert_from_bytes(&tiny_png(), &config).await.unwrap();

    let stats = &output.stats;
    assert_eq!(stats.retries, 1);
    assert_eq!(stats.total_elements, 1);
    assert_eq!(stats.placed_elements, 1);
    assert_eq!(stats.skipped_elements, 0);
    assert_eq!((stats.image_width_px, stats.image_height_px), (16, 9));
    assert_eq!(stats.pptx_bytes, output.pptx.len());
    assert_eq!(
        recorder.events(),
        vec![
            "start <bytes>",
            "analysis <bytes>",
            "analysed <bytes> 1",
            "complete <bytes> 1/0"
        ]
    );

    let mut pkg = Package::open(output.pptx);
    assert!(slide_text(&pkg.part("ppt/slides/slide1.xml")).contains(&"Hello".to_string()));
}

#[tokio::test]
async fn test_prose_wrapped_answer_with_bad_element() {
    let mock = MockProvider::new();
    mock.add_response(
        "Here is the layout:\n{\"elements\": [\
            {\"type\": \"shape\", \"fill_color\": \"#4472C4\"},\
            {\"type\": \"chart\"}]}\nLet me know if you need more.",
    )
    .await;
    let (config, recorder) = recording_config(Arc::new(mock), 0);

    let output = convert_from_bytes(&tiny_png(), &config).await.unwrap();

    assert_eq!(output.stats.retries, 0);
    assert_eq!(output.stats.placed_elements, 1);
    assert_eq!(output.stats.skipped_elements, 1);
    assert!(matches!(output.skipped[0], ElementError::UnknownType { index: 1, .. }));
    assert_eq!(
        recorder.events(),
        vec![
            "start <bytes>",
            "analysis <bytes>",
            "analysed <bytes> 2",
            "skipped <bytes> 1",
            "complete <bytes> 1/1"
        ]
    );
}

#[tokio::test]
async fn test_only_empty_answers_fail_after_retries() {
    let mock = MockProvider::new();
    for _ in 0..3 {
        mock.add_response("").await;
    }
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .provider(Arc::new(mock))
        .max_retries(2)
        .retry_backoff_ms(100)
        .progress_callback(recorder.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();

    let start = Instant::now();
    let err = convert_from_bytes(&tiny_png(), &config).await.unwrap_err();

    assert!(
        matches!(err, Img2PptxError::AnalysisFailed { retries: 2, .. }),
        "got {err}"
    );
    // 100 ms then 200 ms between the three attempts.
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(
        recorder.events(),
        vec!["start <bytes>", "analysis <bytes>", "error <bytes>"]
    );
}

/// Never answers within any reasonable timeout.
struct StalledProvider;

#[async_trait::async_trait]
impl LLMProvider for StalledProvider {
    fn name(&self) -> &str {
        "stalled"
    }

    fn model(&self) -> &str {
        "stalled-model"
    }

    fn max_context_length(&self) -> usize {
        4096
    }

    async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(LLMResponse::new("{}", "stalled-model"))
    }

    async fn complete_with_options(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete(prompt).await
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _options: Option<&CompletionOptions>,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete("").await
    }
}

#[tokio::test]
async fn test_stalled_provider_times_out() {
    let config = ConversionConfig::builder()
        .provider(Arc::new(StalledProvider))
        .max_retries(0)
        .api_timeout_secs(1)
        .build()
        .unwrap();

    let err = convert_from_bytes(&tiny_png(), &config).await.unwrap_err();
    assert!(matches!(err, Img2PptxError::ApiTimeout { secs: 1 }), "got {err}");
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
}
