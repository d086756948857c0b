//! The slide layout description produced by the vision model.
//!
//! The model answers with a JSON object of the shape
//!
//! ```json
//! {
//!   "slide_width_px": 1280, "slide_height_px": 720,
//!   "background": { "type": "solid", "color": "#1E2761" },
//!   "elements": [
//!     { "type": "text", "content": "Title", "x_percent": 10, ... },
//!     { "type": "shape", "shape_type": "oval", ... },
//!     { "type": "image_region", "description": "bar chart", ... }
//!   ]
//! }
//! ```
//!
//! All coordinates are percentages of the slide. Every field is optional and
//! a JSON `null` means "use the default". Elements are kept as raw JSON in
//! [`SlideAnalysis::elements`] and decoded one by one with
//! [`SlideAnalysis::decode_elements`], so a single malformed element costs
//! that element only, never the whole slide.

use crate::error::ElementError;
use crate::pptx::{Align, RgbColor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

// ── Defaults ─────────────────────────────────────────────────────────────

pub const DEFAULT_X_PERCENT: f64 = 0.0;
pub const DEFAULT_Y_PERCENT: f64 = 0.0;
pub const DEFAULT_WIDTH_PERCENT: f64 = 10.0;
pub const DEFAULT_HEIGHT_PERCENT: f64 = 10.0;
pub const DEFAULT_FONT_SIZE_PT: f64 = 16.0;
pub const DEFAULT_FONT_COLOR: RgbColor = RgbColor::new(0x33, 0x33, 0x33);
pub const DEFAULT_BORDER_WIDTH_PT: f64 = 1.0;
pub const DEFAULT_IMAGE_DESCRIPTION: &str = "Image";

/// Element `type` values understood by the layout stage.
pub const ELEMENT_TYPES: [&str; 3] = ["text", "shape", "image_region"];

// ── Slide ────────────────────────────────────────────────────────────────

/// The full layout description of one slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideAnalysis {
    /// Estimated source image width in pixels.
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub slide_width_px: Option<f64>,

    /// Estimated source image height in pixels.
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub slide_height_px: Option<f64>,

    #[serde(default, deserialize_with = "lenient_background")]
    pub background: BackgroundSpec,

    /// Raw elements in z-order, back-most first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub elements: Vec<Value>,
}

impl SlideAnalysis {
    /// Decode every element independently.
    ///
    /// The result has one entry per raw element, in the same order.
    pub fn decode_elements(&self) -> Vec<Result<ElementSpec, ElementError>> {
        self.elements
            .iter()
            .enumerate()
            .map(|(index, raw)| ElementSpec::decode(index, raw))
            .collect()
    }

    /// Width / height of the source as estimated by the model, if both are
    /// present and positive.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.slide_width_px, self.slide_height_px) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() => {
                Some(w / h)
            }
            _ => None,
        }
    }
}

/// Slide background as described by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundSpec {
    /// `"solid"` (default) or `"gradient"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Fill colour, or the gradient start colour. Default white.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Gradient end colour; only used when `kind` is `"gradient"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_end: Option<String>,
}

impl BackgroundSpec {
    pub fn is_gradient(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.trim().eq_ignore_ascii_case("gradient"))
    }
}

// ── Elements ─────────────────────────────────────────────────────────────

/// Position and size of an element, in percent of the slide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub x_percent: Option<f64>,
    #[serde(default)]
    pub y_percent: Option<f64>,
    #[serde(default)]
    pub width_percent: Option<f64>,
    #[serde(default)]
    pub height_percent: Option<f64>,
}

impl Placement {
    /// `(x, y, width, height)` clamped to `[0, 100]`, with defaults applied
    /// for missing or non-finite values.
    pub fn resolved(&self) -> (f64, f64, f64, f64) {
        (
            percent_or(self.x_percent, DEFAULT_X_PERCENT),
            percent_or(self.y_percent, DEFAULT_Y_PERCENT),
            percent_or(self.width_percent, DEFAULT_WIDTH_PERCENT),
            percent_or(self.height_percent, DEFAULT_HEIGHT_PERCENT),
        )
    }
}

fn percent_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(p) if p.is_finite() => p.clamp(0.0, 100.0),
        _ => default,
    }
}

/// A decoded slide element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementSpec {
    Text(TextSpec),
    Shape(ShapeSpec),
    ImageRegion(ImageRegionSpec),
}

impl ElementSpec {
    /// Decode one raw element. `index` is only used for error reporting.
    pub fn decode(index: usize, raw: &Value) -> Result<Self, ElementError> {
        let Some(obj) = raw.as_object() else {
            return Err(ElementError::Malformed {
                index,
                kind: json_kind(raw).to_string(),
                detail: "element is not a JSON object".into(),
            });
        };

        let kind = match obj.get("type") {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(ElementError::Malformed {
                    index,
                    kind: json_kind(other).to_string(),
                    detail: "\"type\" must be a string".into(),
                })
            }
            None => {
                return Err(ElementError::Malformed {
                    index,
                    kind: String::new(),
                    detail: "missing \"type\" field".into(),
                })
            }
        };
        if !ELEMENT_TYPES.contains(&kind) {
            return Err(ElementError::UnknownType {
                index,
                kind: kind.to_string(),
            });
        }

        serde_json::from_value(raw.clone()).map_err(|e| ElementError::Malformed {
            index,
            kind: kind.to_string(),
            detail: e.to_string(),
        })
    }

    pub fn placement(&self) -> &Placement {
        match self {
            ElementSpec::Text(t) => &t.placement,
            ElementSpec::Shape(s) => &s.placement,
            ElementSpec::ImageRegion(r) => &r.placement,
        }
    }

    /// The wire name of this element's `type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementSpec::Text(_) => "text",
            ElementSpec::Shape(_) => "shape",
            ElementSpec::ImageRegion(_) => "image_region",
        }
    }
}

/// `"type": "text"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSpec {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(default)]
    pub font_size_pt: Option<f64>,
    #[serde(default)]
    pub font_color: Option<String>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub align: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
}

impl TextSpec {
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn font_size_pt(&self) -> f64 {
        match self.font_size_pt {
            Some(pt) if pt.is_finite() && pt > 0.0 => pt,
            _ => DEFAULT_FONT_SIZE_PT,
        }
    }

    /// Paragraph alignment; anything unrecognised is left-aligned.
    pub fn align(&self) -> Align {
        match self.align.as_deref().map(|a| a.trim().to_ascii_lowercase()) {
            Some(a) if a == "center" || a == "centre" => Align::Center,
            Some(a) if a == "right" => Align::Right,
            _ => Align::Left,
        }
    }
}

/// `"type": "shape"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    #[serde(default)]
    pub shape_type: Option<String>,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(default)]
    pub fill_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    /// Outline width in points.
    #[serde(default)]
    pub border_width: Option<f64>,
}

impl ShapeSpec {
    pub fn shape_type(&self) -> ShapeType {
        ShapeType::from_name(self.shape_type.as_deref().unwrap_or("rectangle"))
    }

    /// Outline width in points; missing, zero or negative widths fall back
    /// to 1 pt.
    pub fn border_width_pt(&self) -> f64 {
        match self.border_width {
            Some(w) if w.is_finite() && w > 0.0 => w,
            _ => DEFAULT_BORDER_WIDTH_PT,
        }
    }
}

/// `shape_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Rectangle,
    RoundedRectangle,
    Oval,
    Line,
    /// Anything else; drawn as a rectangle.
    Other,
}

impl ShapeType {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rectangle" | "rect" => ShapeType::Rectangle,
            "rounded_rectangle" | "roundrect" => ShapeType::RoundedRectangle,
            "oval" | "ellipse" | "circle" => ShapeType::Oval,
            "line" => ShapeType::Line,
            _ => ShapeType::Other,
        }
    }
}

/// `"type": "image_region"`: a photo, chart or illustration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRegionSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub placement: Placement,
}

impl ImageRegionSpec {
    pub fn description(&self) -> &str {
        match self.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d,
            _ => DEFAULT_IMAGE_DESCRIPTION,
        }
    }
}

// ── Colours ──────────────────────────────────────────────────────────────

/// Parse a required colour field of element `index`.
pub fn parse_color(index: usize, field: &str, value: &str) -> Result<RgbColor, ElementError> {
    RgbColor::from_hex(value).ok_or_else(|| ElementError::InvalidColor {
        index,
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Parse an optional colour field. Absent, empty, `"none"` and
/// `"transparent"` all mean "no colour".
pub fn parse_optional_color(
    index: usize,
    field: &str,
    value: Option<&str>,
) -> Result<Option<RgbColor>, ElementError> {
    match value.map(str::trim) {
        None => Ok(None),
        Some(v)
            if v.is_empty()
                || v.eq_ignore_ascii_case("none")
                || v.eq_ignore_ascii_case("transparent") =>
        {
            Ok(None)
        }
        Some(v) => parse_color(index, field, v).map(Some),
    }
}

// ── Lenient deserialisers ────────────────────────────────────────────────

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Accept numbers and numeric strings; anything else is treated as absent.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A malformed background never fails the slide: it falls back to white.
fn lenient_background<'de, D: Deserializer<'de>>(d: D) -> Result<BackgroundSpec, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => BackgroundSpec::default(),
        Some(Value::String(color)) => BackgroundSpec {
            color: Some(color),
            ..Default::default()
        },
        Some(other) => serde_json::from_value(other).unwrap_or_else(|e| {
            warn!("Ignoring malformed background: {}", e);
            BackgroundSpec::default()
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis(elements: Value) -> SlideAnalysis {
        serde_json::from_value(json!({ "elements": elements })).unwrap()
    }

    #[test]
    fn decodes_all_three_element_types() {
        let a = analysis(json!([
            { "type": "text", "content": "Hello", "x_percent": 10, "font_size_pt": 40, "bold": true },
            { "type": "shape", "shape_type": "oval", "fill_color": "#FF0000" },
            { "type": "image_region", "description": "chart", "width_percent": 42.5 }
        ]));
        let decoded: Vec<_> = a.decode_elements().into_iter().map(Result::unwrap).collect();

        let ElementSpec::Text(t) = &decoded[0] else { panic!("expected text") };
        assert_eq!(t.content(), "Hello");
        assert_eq!(t.placement.x_percent, Some(10.0));
        assert_eq!(t.font_size_pt(), 40.0);
        assert_eq!(t.bold, Some(true));

        let ElementSpec::Shape(s) = &decoded[1] else { panic!("expected shape") };
        assert_eq!(s.shape_type(), ShapeType::Oval);

        let ElementSpec::ImageRegion(r) = &decoded[2] else { panic!("expected image_region") };
        assert_eq!(r.description(), "chart");
        assert_eq!(r.placement.width_percent, Some(42.5));
    }

    #[test]
    fn null_fields_use_defaults() {
        let a = analysis(json!([
            { "type": "text", "content": null, "font_size_pt": null, "align": null,
              "background_color": null, "x_percent": null }
        ]));
        let ElementSpec::Text(t) = a.decode_elements().remove(0).unwrap() else {
            panic!("expected text")
        };
        assert_eq!(t.content(), "");
        assert_eq!(t.font_size_pt(), DEFAULT_FONT_SIZE_PT);
        assert_eq!(t.align(), Align::Left);
        assert_eq!(t.placement.resolved(), (0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn bad_elements_do_not_affect_neighbours() {
        let a = analysis(json!([
            { "type": "chart" },
            "not an object",
            { "content": "no type" },
            { "type": "text", "x_percent": "ten" },
            { "type": "shape" }
        ]));
        let decoded = a.decode_elements();
        assert_eq!(decoded.len(), 5);
        assert!(matches!(decoded[0], Err(ElementError::UnknownType { index: 0, .. })));
        assert!(matches!(decoded[1], Err(ElementError::Malformed { index: 1, .. })));
        assert!(matches!(decoded[2], Err(ElementError::Malformed { index: 2, .. })));
        assert!(matches!(decoded[3], Err(ElementError::Malformed { index: 3, .. })));
        assert!(decoded[4].is_ok());
    }

    #[test]
    fn placement_is_clamped() {
        let p = Placement {
            x_percent: Some(-5.0),
            y_percent: Some(120.0),
            width_percent: Some(f64::NAN),
            height_percent: Some(50.0),
        };
        assert_eq!(p.resolved(), (0.0, 100.0, 10.0, 50.0));
    }

    #[test]
    fn alignment_and_shape_names() {
        let t = |a: &str| TextSpec {
            align: Some(a.into()),
            ..Default::default()
        };
        assert_eq!(t("center").align(), Align::Center);
        assert_eq!(t("Right").align(), Align::Right);
        assert_eq!(t("justify").align(), Align::Left);

        assert_eq!(ShapeType::from_name("rounded_rectangle"), ShapeType::RoundedRectangle);
        assert_eq!(ShapeType::from_name("line"), ShapeType::Line);
        assert_eq!(ShapeType::from_name("triangle"), ShapeType::Other);
        assert_eq!(ShapeSpec::default().shape_type(), ShapeType::Rectangle);
    }

    #[test]
    fn border_width_defaults_to_one_point() {
        let mut s = ShapeSpec::default();
        assert_eq!(s.border_width_pt(), 1.0);
        s.border_width = Some(0.0);
        assert_eq!(s.border_width_pt(), 1.0);
        s.border_width = Some(2.5);
        assert_eq!(s.border_width_pt(), 2.5);
    }

    #[test]
    fn optional_colours() {
        assert_eq!(parse_optional_color(0, "fill_color", None), Ok(None));
        assert_eq!(parse_optional_color(0, "fill_color", Some("")), Ok(None));
        assert_eq!(parse_optional_color(0, "fill_color", Some("transparent")), Ok(None));
        assert_eq!(
            parse_optional_color(0, "fill_color", Some("#2A3A8F")),
            Ok(Some(RgbColor::new(0x2A, 0x3A, 0x8F)))
        );
        assert!(matches!(
            parse_optional_color(3, "border_color", Some("navy")),
            Err(ElementError::InvalidColor { index: 3, .. })
        ));
    }

    #[test]
    fn background_is_lenient() {
        let a: SlideAnalysis = serde_json::from_value(json!({
            "background": { "type": "gradient", "color": "#000000", "gradient_end": "#FFFFFF" }
        }))
        .unwrap();
        assert!(a.background.is_gradient());
        assert!(a.elements.is_empty());

        let a: SlideAnalysis = serde_json::from_value(json!({ "background": 42, "elements": null })).unwrap();
        assert_eq!(a.background, BackgroundSpec::default());

        let a: SlideAnalysis = serde_json::from_value(json!({ "background": "#112233" })).unwrap();
        assert_eq!(a.background.color.as_deref(), Some("#112233"));
    }

    #[test]
    fn slide_size_accepts_numeric_strings() {
        let a: SlideAnalysis = serde_json::from_value(json!({
            "slide_width_px": "1280", "slide_height_px": 720
        }))
        .unwrap();
        assert_eq!(a.aspect_ratio(), Some(1280.0 / 720.0));

        let a: SlideAnalysis = serde_json::from_value(json!({ "slide_width_px": "wide" })).unwrap();
        assert_eq!(a.aspect_ratio(), None);
    }
}
