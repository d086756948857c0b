//! The single slide of a presentation.

use super::shape::{write_solid_fill, Fill, Frame, Geometry, Line, ShapeKind, SlideShape, TextBody};
use super::template::rel_type;
use super::{escape_xml, PptxError, RgbColor};
use std::fmt::Write as FmtWrite;

/// Slide background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Solid(RgbColor),
    /// Two-stop linear gradient; `angle_deg` follows DrawingML (90 = top → bottom).
    LinearGradient {
        from: RgbColor,
        to: RgbColor,
        angle_deg: f64,
    },
}

impl Background {
    fn to_xml(self, xml: &mut String) -> Result<(), PptxError> {
        xml.push_str("<p:bg><p:bgPr>");
        match self {
            Background::Solid(color) => write_solid_fill(xml, color)?,
            Background::LinearGradient {
                from,
                to,
                angle_deg,
            } => {
                let ang = (angle_deg.rem_euclid(360.0) * 60_000.0) as i64;
                write!(
                    xml,
                    r#"<a:gradFill rotWithShape="1"><a:gsLst><a:gs pos="0"><a:srgbClr val="{from}"/></a:gs><a:gs pos="100000"><a:srgbClr val="{to}"/></a:gs></a:gsLst><a:lin ang="{ang}" scaled="0"/></a:gradFill>"#
                )?;
            }
        }
        xml.push_str("<a:effectLst/></p:bgPr></p:bg>");
        Ok(())
    }
}

/// An embedded image stored under `ppt/media/`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPart {
    /// Relationship id from the slide, e.g. `rId2`.
    pub rel_id: String,
    /// File name inside `ppt/media/`, e.g. `image1.png`.
    pub file_name: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

impl MediaPart {
    pub fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or("png")
    }
}

/// A slide being assembled. Shapes are kept in insertion order, which is
/// their z-order (first = back-most).
#[derive(Debug, Clone, Default)]
pub struct Slide {
    background: Option<Background>,
    shapes: Vec<SlideShape>,
    media: Vec<MediaPart>,
}

impl Slide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = Some(background);
    }

    pub fn background(&self) -> Option<Background> {
        self.background
    }

    pub fn shapes(&self) -> &[SlideShape] {
        &self.shapes
    }

    pub fn media(&self) -> &[MediaPart] {
        &self.media
    }

    /// Shape ids start at 2; id 1 is the slide's group shape.
    fn next_shape_id(&self) -> u32 {
        self.shapes.len() as u32 + 2
    }

    /// Add a text box.
    pub fn add_text_box(&mut self, frame: Frame, body: TextBody, fill: Fill) -> &mut SlideShape {
        let id = self.next_shape_id();
        self.push(SlideShape {
            id,
            name: format!("TextBox {}", id - 1),
            kind: ShapeKind::TextBox,
            frame,
            fill,
            line: Line::Inherit,
            text: Some(body),
        })
    }

    /// Add a preset-geometry shape.
    pub fn add_auto_shape(
        &mut self,
        geometry: Geometry,
        frame: Frame,
        fill: Fill,
        line: Line,
    ) -> &mut SlideShape {
        let id = self.next_shape_id();
        let label = match geometry {
            Geometry::Rect => "Rectangle",
            Geometry::RoundRect => "Rounded Rectangle",
            Geometry::Ellipse => "Oval",
        };
        self.push(SlideShape {
            id,
            name: format!("{label} {}", id - 1),
            kind: ShapeKind::AutoShape(geometry),
            frame,
            fill,
            line,
            text: None,
        })
    }

    /// Embed `data` as a picture. `extension` decides the media file name
    /// and content type (`png`, `jpeg`, `gif`).
    pub fn add_picture(
        &mut self,
        frame: Frame,
        data: Vec<u8>,
        extension: &str,
        description: impl Into<String>,
    ) -> &mut SlideShape {
        let id = self.next_shape_id();
        let n = self.media.len() + 1;
        // rId1 is the slide layout
        let rel_id = format!("rId{}", n + 1);
        let (ext, content_type) = match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => ("jpeg", "image/jpeg"),
            "gif" => ("gif", "image/gif"),
            _ => ("png", "image/png"),
        };
        self.media.push(MediaPart {
            rel_id: rel_id.clone(),
            file_name: format!("image{n}.{ext}"),
            content_type,
            data,
        });
        self.push(SlideShape {
            id,
            name: format!("Picture {}", id - 1),
            kind: ShapeKind::Picture {
                rel_id,
                description: description.into(),
            },
            frame,
            fill: Fill::Inherit,
            line: Line::Inherit,
            text: None,
        })
    }

    fn push(&mut self, shape: SlideShape) -> &mut SlideShape {
        self.shapes.push(shape);
        let last = self.shapes.len() - 1;
        &mut self.shapes[last]
    }

    /// `ppt/slides/slide1.xml`.
    pub(crate) fn to_xml(&self) -> Result<String, PptxError> {
        let mut xml = String::with_capacity(1024 + self.shapes.len() * 768);
        xml.push_str(super::template::XML_DECLARATION);
        xml.push_str(r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#);
        xml.push_str("<p:cSld>");
        if let Some(bg) = self.background {
            bg.to_xml(&mut xml)?;
        }
        xml.push_str("<p:spTree>");
        xml.push_str(super::template::GROUP_SHAPE_HEADER);
        for shape in &self.shapes {
            shape.to_xml(&mut xml)?;
        }
        xml.push_str("</p:spTree></p:cSld>");
        xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
        xml.push_str("</p:sld>");
        Ok(xml)
    }

    /// `ppt/slides/_rels/slide1.xml.rels`.
    pub(crate) fn rels_xml(&self) -> Result<String, PptxError> {
        let mut xml = String::with_capacity(512);
        xml.push_str(super::template::XML_DECLARATION);
        xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        write!(
            xml,
            r#"<Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>"#,
            rel_type::SLIDE_LAYOUT
        )?;
        for media in &self.media {
            write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="../media/{}"/>"#,
                media.rel_id,
                rel_type::IMAGE,
                escape_xml(&media.file_name)
            )?;
        }
        xml.push_str("</Relationships>");
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::Align;

    #[test]
    fn shape_ids_and_names_are_sequential() {
        let mut slide = Slide::new();
        let f = Frame::new(0, 0, 1, 1);
        slide.add_auto_shape(Geometry::Rect, f, Fill::None, Line::None);
        slide.add_text_box(f, TextBody::default(), Fill::Inherit);
        let pic = slide.add_picture(f, vec![1, 2, 3], "jpg", "photo");
        assert_eq!(pic.id, 4);
        assert_eq!(slide.shapes()[0].name, "Rectangle 1");
        assert_eq!(slide.shapes()[1].name, "TextBox 2");
        assert_eq!(slide.media()[0].file_name, "image1.jpeg");
        assert_eq!(slide.media()[0].rel_id, "rId2");
        assert_eq!(slide.media()[0].extension(), "jpeg");
    }

    #[test]
    fn gradient_background_xml() {
        let mut slide = Slide::new();
        slide.set_background(Background::LinearGradient {
            from: RgbColor::new(0x1E, 0x27, 0x61),
            to: RgbColor::WHITE,
            angle_deg: 90.0,
        });
        let xml = slide.to_xml().unwrap();
        assert!(xml.contains(r#"<a:gs pos="0"><a:srgbClr val="1E2761"/>"#));
        assert!(xml.contains(r#"<a:lin ang="5400000" scaled="0"/>"#));
    }

    #[test]
    fn slide_xml_keeps_insertion_order() {
        let mut slide = Slide::new();
        let f = Frame::new(0, 0, 1, 1);
        slide.set_background(Background::Solid(RgbColor::WHITE));
        slide.add_auto_shape(Geometry::RoundRect, f, Fill::Solid(RgbColor::WHITE), Line::None);
        let run = crate::pptx::TextRun {
            text: String::new(),
            size_pt: 16.0,
            color: RgbColor::new(0x33, 0x33, 0x33),
            bold: false,
            italic: false,
        };
        slide.add_text_box(f, TextBody::from_lines("front", Align::Left, &run), Fill::Inherit);

        let xml = slide.to_xml().unwrap();
        let back = xml.find("roundRect").unwrap();
        let front = xml.find("front").unwrap();
        assert!(back < front);
        assert!(xml.contains(r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="FFFFFF"/>"#));
    }

    #[test]
    fn rels_reference_media() {
        let mut slide = Slide::new();
        slide.add_picture(Frame::new(0, 0, 1, 1), vec![0], "png", "");
        let rels = slide.rels_xml().unwrap();
        assert!(rels.contains("../slideLayouts/slideLayout1.xml"));
        assert!(rels.contains(r#"Id="rId2""#));
        assert!(rels.contains("../media/image1.png"));
    }
}
