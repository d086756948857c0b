//! Shapes placed on a slide and their DrawingML serialisation.

use super::{escape_xml, PptxError, RgbColor};
use std::fmt::Write as FmtWrite;

/// Position and size in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Frame {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }
}

/// Preset geometries used for auto shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Rect,
    RoundRect,
    Ellipse,
}

impl Geometry {
    /// `a:prstGeom/@prst` token.
    pub fn preset(self) -> &'static str {
        match self {
            Geometry::Rect => "rect",
            Geometry::RoundRect => "roundRect",
            Geometry::Ellipse => "ellipse",
        }
    }
}

/// Shape fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fill {
    /// No `a:*Fill` element; the shape inherits (text boxes: transparent).
    #[default]
    Inherit,
    /// Explicit `a:noFill`.
    None,
    Solid(RgbColor),
}

/// Solid outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outline {
    pub color: RgbColor,
    pub width_emu: i64,
}

/// Shape outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Line {
    #[default]
    Inherit,
    None,
    Solid(Outline),
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    fn token(self) -> &'static str {
        match self {
            Align::Left => "l",
            Align::Center => "ctr",
            Align::Right => "r",
        }
    }
}

/// A run of identically formatted text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub size_pt: f64,
    pub color: RgbColor,
    pub bold: bool,
    pub italic: bool,
}

/// A paragraph; its runs are separated by soft line breaks (`a:br`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub align: Align,
    pub lines: Vec<TextRun>,
}

/// Text frame contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBody {
    pub word_wrap: bool,
    pub paragraphs: Vec<Paragraph>,
}

impl TextBody {
    /// One paragraph, one run per `\n`-separated line of `text`.
    pub fn from_lines(text: &str, align: Align, template: &TextRun) -> Self {
        let lines = text
            .split('\n')
            .map(|line| TextRun {
                text: line.trim_end_matches('\r').to_string(),
                ..template.clone()
            })
            .collect();
        Self {
            word_wrap: true,
            paragraphs: vec![Paragraph { align, lines }],
        }
    }

    /// All text in the body, lines joined with `\n`.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| {
                p.lines
                    .iter()
                    .map(|r| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What kind of `p:spTree` child a shape becomes.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// `p:sp` with `txBox="1"`.
    TextBox,
    /// `p:sp` with a preset geometry.
    AutoShape(Geometry),
    /// `p:pic` referencing an embedded media part.
    Picture { rel_id: String, description: String },
}

/// A shape on the slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideShape {
    pub id: u32,
    pub name: String,
    pub kind: ShapeKind,
    pub frame: Frame,
    pub fill: Fill,
    pub line: Line,
    pub text: Option<TextBody>,
}

impl SlideShape {
    /// Append this shape's XML to `xml`.
    pub(crate) fn to_xml(&self, xml: &mut String) -> Result<(), PptxError> {
        match &self.kind {
            ShapeKind::TextBox | ShapeKind::AutoShape(_) => self.write_sp(xml),
            ShapeKind::Picture {
                rel_id,
                description,
            } => self.write_pic(xml, rel_id, description),
        }
    }

    fn write_sp(&self, xml: &mut String) -> Result<(), PptxError> {
        let (prst, is_text_box) = match self.kind {
            ShapeKind::AutoShape(g) => (g.preset(), false),
            _ => ("rect", true),
        };

        xml.push_str("<p:sp><p:nvSpPr>");
        write!(
            xml,
            r#"<p:cNvPr id="{}" name="{}"/>"#,
            self.id,
            escape_xml(&self.name)
        )?;
        xml.push_str(if is_text_box {
            r#"<p:cNvSpPr txBox="1"/>"#
        } else {
            "<p:cNvSpPr/>"
        });
        xml.push_str("<p:nvPr/></p:nvSpPr>");

        xml.push_str("<p:spPr>");
        write_xfrm(xml, &self.frame)?;
        write!(xml, r#"<a:prstGeom prst="{prst}"><a:avLst/></a:prstGeom>"#)?;
        write_fill(xml, self.fill)?;
        write_line(xml, self.line)?;
        xml.push_str("</p:spPr>");

        match &self.text {
            Some(body) => write_text_body(xml, body, is_text_box)?,
            // Auto shapes always carry an (empty) text frame so they stay editable.
            None if !is_text_box => xml.push_str(
                r#"<p:txBody><a:bodyPr rtlCol="0" anchor="ctr"/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody>"#,
            ),
            None => {}
        }

        xml.push_str("</p:sp>");
        Ok(())
    }

    fn write_pic(&self, xml: &mut String, rel_id: &str, description: &str) -> Result<(), PptxError> {
        xml.push_str("<p:pic><p:nvPicPr>");
        write!(
            xml,
            r#"<p:cNvPr id="{}" name="{}" descr="{}"/>"#,
            self.id,
            escape_xml(&self.name),
            escape_xml(description)
        )?;
        xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#);
        write!(
            xml,
            r#"<p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#
        )?;
        xml.push_str("<p:spPr>");
        write_xfrm(xml, &self.frame)?;
        xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
        write_line(xml, self.line)?;
        xml.push_str("</p:spPr></p:pic>");
        Ok(())
    }
}

fn write_xfrm(xml: &mut String, f: &Frame) -> Result<(), PptxError> {
    write!(
        xml,
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        f.x, f.y, f.cx, f.cy
    )?;
    Ok(())
}

pub(crate) fn write_solid_fill(xml: &mut String, color: RgbColor) -> Result<(), PptxError> {
    write!(xml, r#"<a:solidFill><a:srgbClr val="{color}"/></a:solidFill>"#)?;
    Ok(())
}

fn write_fill(xml: &mut String, fill: Fill) -> Result<(), PptxError> {
    match fill {
        Fill::Inherit => {}
        Fill::None => xml.push_str("<a:noFill/>"),
        Fill::Solid(c) => write_solid_fill(xml, c)?,
    }
    Ok(())
}

/// Largest `a:ln/@w` the schema accepts (`ST_LineWidth`, 1584 pt).
const MAX_LINE_WIDTH_EMU: i64 = 20_116_800;

fn write_line(xml: &mut String, line: Line) -> Result<(), PptxError> {
    match line {
        Line::Inherit => {}
        Line::None => xml.push_str("<a:ln><a:noFill/></a:ln>"),
        Line::Solid(o) => {
            write!(xml, r#"<a:ln w="{}">"#, o.width_emu.clamp(0, MAX_LINE_WIDTH_EMU))?;
            write_solid_fill(xml, o.color)?;
            xml.push_str("</a:ln>");
        }
    }
    Ok(())
}

fn write_text_body(xml: &mut String, body: &TextBody, is_text_box: bool) -> Result<(), PptxError> {
    let wrap = if body.word_wrap { "square" } else { "none" };
    xml.push_str("<p:txBody>");
    if is_text_box {
        write!(xml, r#"<a:bodyPr wrap="{wrap}" rtlCol="0"><a:spAutoFit/></a:bodyPr>"#)?;
    } else {
        write!(xml, r#"<a:bodyPr wrap="{wrap}" rtlCol="0" anchor="ctr"/>"#)?;
    }
    xml.push_str("<a:lstStyle/>");

    if body.paragraphs.is_empty() {
        xml.push_str(r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#);
    }
    for para in &body.paragraphs {
        xml.push_str("<a:p>");
        write!(xml, r#"<a:pPr algn="{}"/>"#, para.align.token())?;
        for (i, run) in para.lines.iter().enumerate() {
            if i > 0 {
                xml.push_str("<a:br>");
                write_run_props(xml, run, "a:rPr")?;
                xml.push_str("</a:br>");
            }
            if run.text.is_empty() {
                continue;
            }
            xml.push_str("<a:r>");
            write_run_props(xml, run, "a:rPr")?;
            write!(xml, "<a:t>{}</a:t>", escape_xml(&run.text))?;
            xml.push_str("</a:r>");
        }
        if let Some(last) = para.lines.last() {
            write_run_props(xml, last, "a:endParaRPr")?;
        }
        xml.push_str("</a:p>");
    }

    xml.push_str("</p:txBody>");
    Ok(())
}

/// `a:rPr` / `a:endParaRPr`; `sz` is hundredths of a point (100–400000).
fn write_run_props(xml: &mut String, run: &TextRun, tag: &str) -> Result<(), PptxError> {
    let size = if run.size_pt.is_finite() {
        (run.size_pt * 100.0).round().clamp(100.0, 400_000.0) as u32
    } else {
        1600
    };
    write!(xml, r#"<{tag} lang="en-US" sz="{size}""#)?;
    if run.bold {
        xml.push_str(r#" b="1""#);
    }
    if run.italic {
        xml.push_str(r#" i="1""#);
    }
    xml.push_str(r#" dirty="0">"#);
    write_solid_fill(xml, run.color)?;
    write!(xml, "</{tag}>")?;
    Ok(())
}
