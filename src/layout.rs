//! Map a [`SlideAnalysis`] onto slide shapes.
//!
//! This is where the model's percentage coordinates become EMU, colour
//! strings become [`RgbColor`]s and element types become text boxes,
//! preset shapes or pictures. Everything here is pure: no I/O, no provider.
//!
//! ```text
//! SlideAnalysis ──decode_elements──▶ ElementSpec ──place_*──▶ pptx::Slide
//!                                        │
//!                                        └── Err ──▶ LaidOutSlide::skipped
//! ```

use crate::analysis::{
    parse_color, parse_optional_color, ElementSpec, ImageRegionSpec, Placement, ShapeSpec,
    ShapeType, SlideAnalysis, TextSpec, DEFAULT_FONT_COLOR,
};
use crate::error::ElementError;
use crate::pptx::{
    Align, Background, Fill, Frame, Geometry, Line, Outline, Presentation, RgbColor, Slide,
    TextBody, TextRun, EMU_PER_POINT,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, warn};

/// Smallest width/height of any placed element. Default: 100 000 EMU (~0.11").
pub const DEFAULT_MIN_ELEMENT_EMU: i64 = 100_000;

/// Height floor for `shape_type: "line"`, which is drawn as a thin rectangle.
pub const LINE_MIN_HEIGHT_EMU: i64 = 30_000;

const PLACEHOLDER_FILL: RgbColor = RgbColor::new(0xEE, 0xEE, 0xEE);
const PLACEHOLDER_BORDER: RgbColor = RgbColor::new(0xCC, 0xCC, 0xCC);
const PLACEHOLDER_TEXT: RgbColor = RgbColor::new(0x99, 0x99, 0x99);
const PLACEHOLDER_FONT_PT: f64 = 12.0;

/// How `image_region` elements are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRegionMode {
    /// Grey box labelled `[description]`. (default)
    #[default]
    Placeholder,
    /// Crop the region out of the source image and embed it as a picture.
    /// Falls back to the placeholder when no source image is available.
    Crop,
}

/// Parameters of the layout stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub slide_width: i64,
    pub slide_height: i64,
    pub min_element_emu: i64,
    pub image_regions: ImageRegionMode,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        let (slide_width, slide_height) = Presentation::WIDESCREEN;
        Self {
            slide_width,
            slide_height,
            min_element_emu: DEFAULT_MIN_ELEMENT_EMU,
            image_regions: ImageRegionMode::default(),
        }
    }
}

/// Result of [`layout_slide`].
#[derive(Debug, Clone)]
pub struct LaidOutSlide {
    pub slide: Slide,
    /// Elements that could not be placed, in element order.
    pub skipped: Vec<ElementError>,
    /// First line of the text element with the largest font, if any.
    pub title: Option<String>,
}

/// Build a slide from `analysis`.
///
/// `source` is the analysed image; it is only needed for
/// [`ImageRegionMode::Crop`].
pub fn layout_slide(
    analysis: &SlideAnalysis,
    options: &LayoutOptions,
    source: Option<&DynamicImage>,
) -> LaidOutSlide {
    let mut slide = Slide::new();
    slide.set_background(background(analysis));

    let mut skipped = Vec::new();
    let mut title: Option<(f64, String)> = None;

    for (index, decoded) in analysis.decode_elements().into_iter().enumerate() {
        let placed = decoded.and_then(|element| {
            let frame = frame_for(&element, options);
            match &element {
                ElementSpec::Text(t) => {
                    place_text(&mut slide, index, t, frame)?;
                    let first_line = t.content().lines().next().unwrap_or("").trim();
                    if !first_line.is_empty()
                        && title.as_ref().is_none_or(|(pt, _)| t.font_size_pt() > *pt)
                    {
                        title = Some((t.font_size_pt(), first_line.to_string()));
                    }
                }
                ElementSpec::Shape(s) => place_shape(&mut slide, index, s, frame)?,
                ElementSpec::ImageRegion(r) => {
                    place_image_region(&mut slide, r, frame, options.image_regions, source)
                }
            }
            debug!("Placed element {} ({})", index, element.type_name());
            Ok(())
        });

        if let Err(e) = placed {
            warn!("Skipping element: {}", e);
            skipped.push(e);
        }
    }

    LaidOutSlide {
        slide,
        skipped,
        title: title.map(|(_, t)| t),
    }
}

/// Percent → EMU, truncated toward zero.
pub fn percent_to_emu(dimension: i64, percent: f64) -> i64 {
    (dimension as f64 * percent / 100.0) as i64
}

fn frame_for(element: &ElementSpec, options: &LayoutOptions) -> Frame {
    let min_height = match element {
        ElementSpec::Shape(s) if s.shape_type() == ShapeType::Line => LINE_MIN_HEIGHT_EMU,
        _ => options.min_element_emu,
    };
    placement_frame(element.placement(), options, min_height)
}

fn placement_frame(p: &Placement, options: &LayoutOptions, min_height: i64) -> Frame {
    let (x, y, w, h) = p.resolved();
    Frame::new(
        percent_to_emu(options.slide_width, x),
        percent_to_emu(options.slide_height, y),
        percent_to_emu(options.slide_width, w).max(options.min_element_emu),
        percent_to_emu(options.slide_height, h).max(min_height),
    )
}

fn background(analysis: &SlideAnalysis) -> Background {
    let spec = &analysis.background;
    let color = match spec.color.as_deref() {
        None => RgbColor::WHITE,
        Some(c) => RgbColor::from_hex(c).unwrap_or_else(|| {
            warn!("Invalid background colour {:?}, using white", c);
            RgbColor::WHITE
        }),
    };

    if spec.is_gradient() {
        match spec.gradient_end.as_deref().map(RgbColor::from_hex) {
            Some(Some(end)) => {
                return Background::LinearGradient {
                    from: color,
                    to: end,
                    angle_deg: 90.0,
                }
            }
            Some(None) => warn!(
                "Invalid gradient end colour {:?}, using a solid background",
                spec.gradient_end
            ),
            None => {}
        }
    }
    Background::Solid(color)
}

fn place_text(slide: &mut Slide, index: usize, t: &TextSpec, frame: Frame) -> Result<(), ElementError> {
    let color = match t.font_color.as_deref() {
        Some(c) if !c.trim().is_empty() => parse_color(index, "font_color", c)?,
        _ => DEFAULT_FONT_COLOR,
    };
    let fill = match parse_optional_color(index, "background_color", t.background_color.as_deref())? {
        Some(c) => Fill::Solid(c),
        None => Fill::Inherit,
    };

    let style = TextRun {
        text: String::new(),
        size_pt: t.font_size_pt(),
        color,
        bold: t.bold.unwrap_or(false),
        italic: t.italic.unwrap_or(false),
    };
    slide.add_text_box(frame, TextBody::from_lines(t.content(), t.align(), &style), fill);
    Ok(())
}

fn place_shape(slide: &mut Slide, index: usize, s: &ShapeSpec, frame: Frame) -> Result<(), ElementError> {
    let geometry = match s.shape_type() {
        ShapeType::RoundedRectangle => Geometry::RoundRect,
        ShapeType::Oval => Geometry::Ellipse,
        ShapeType::Rectangle | ShapeType::Line | ShapeType::Other => Geometry::Rect,
    };
    let fill = match parse_optional_color(index, "fill_color", s.fill_color.as_deref())? {
        Some(c) => Fill::Solid(c),
        None => Fill::None,
    };
    let line = match parse_optional_color(index, "border_color", s.border_color.as_deref())? {
        Some(color) => Line::Solid(Outline {
            color,
            width_emu: (s.border_width_pt() * EMU_PER_POINT as f64) as i64,
        }),
        None => Line::None,
    };
    slide.add_auto_shape(geometry, frame, fill, line);
    Ok(())
}

fn place_image_region(
    slide: &mut Slide,
    r: &ImageRegionSpec,
    frame: Frame,
    mode: ImageRegionMode,
    source: Option<&DynamicImage>,
) {
    if let (ImageRegionMode::Crop, Some(img)) = (mode, source) {
        match crop_region(img, &r.placement) {
            Ok(png) => {
                slide.add_picture(frame, png, "png", r.description());
                return;
            }
            Err(e) => warn!("Could not crop image region {:?}: {}", r.description(), e),
        }
    }

    let label = TextRun {
        text: String::new(),
        size_pt: PLACEHOLDER_FONT_PT,
        color: PLACEHOLDER_TEXT,
        bold: false,
        italic: true,
    };
    let shape = slide.add_auto_shape(
        Geometry::Rect,
        frame,
        Fill::Solid(PLACEHOLDER_FILL),
        Line::Solid(Outline {
            color: PLACEHOLDER_BORDER,
            width_emu: EMU_PER_POINT,
        }),
    );
    shape.text = Some(TextBody::from_lines(
        &format!("[{}]", r.description()),
        Align::Center,
        &label,
    ));
}

/// Cut the region described by `placement` out of `img` and encode it as PNG.
fn crop_region(img: &DynamicImage, placement: &Placement) -> Result<Vec<u8>, String> {
    let (iw, ih) = (img.width(), img.height());
    let (x, y, w, h) = placement.resolved();
    let px = |dim: u32, pct: f64| (dim as f64 * pct / 100.0) as u32;

    let left = px(iw, x).min(iw);
    let top = px(ih, y).min(ih);
    let width = px(iw, w).min(iw - left);
    let height = px(ih, h).min(ih - top);
    if width == 0 || height == 0 {
        return Err(format!("empty region {width}x{height} px"));
    }

    let mut png = Vec::new();
    img.crop_imm(left, top, width, height)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(png)
}
