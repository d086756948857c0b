//! Minimal PresentationML writer.
//!
//! A `.pptx` file is an OPC package: a zip of XML parts tied together by
//! relationship files and a `[Content_Types].xml` manifest. This module
//! knows how to write exactly one shape of package — one slide on a blank
//! layout — which is all a slide-image conversion ever produces.
//!
//! ```text
//! Presentation ──▶ Slide ──▶ SlideShape (text box | auto shape | picture)
//!      │              └────▶ Background, MediaPart
//!      └─ to_bytes() ──▶ package::write_package ──▶ zip
//! ```
//!
//! Coordinates are EMU throughout (914 400 per inch, 12 700 per point).

mod package;
mod shape;
mod slide;
mod template;

pub use shape::{
    Align, Fill, Frame, Geometry, Line, Outline, Paragraph, ShapeKind, SlideShape, TextBody,
    TextRun,
};
pub use slide::{Background, MediaPart, Slide};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// EMU per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per typographic point.
pub const EMU_PER_POINT: i64 = 12_700;

/// Errors raised while serialising a presentation package.
#[derive(Debug, Error)]
pub enum PptxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML formatting error")]
    Xml(#[from] fmt::Error),

    #[error("slide size {cx}x{cy} EMU is outside the allowed range")]
    InvalidSlideSize { cx: i64, cy: i64 },
}

/// A 24-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const WHITE: RgbColor = RgbColor::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `RRGGBB` or the `#RGB` shorthand.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::new(r, g, b))
            }
            3 => {
                let mut c = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let v = ch.to_digit(16)? as u8;
                    c[i] = v * 16 + v;
                }
                Some(Self::new(c[0], c[1], c[2]))
            }
            _ => None,
        }
    }
}

impl fmt::Display for RgbColor {
    /// `srgbClr/@val` form: six uppercase hex digits, no `#`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// A single-slide presentation ready to be serialised.
#[derive(Debug, Clone)]
pub struct Presentation {
    slide_width: i64,
    slide_height: i64,
    title: Option<String>,
    slide: Slide,
}

impl Presentation {
    /// Widescreen 16:9, 13.333" × 7.5".
    pub const WIDESCREEN: (i64, i64) = (12_192_000, 6_858_000);

    /// Standard 4:3, 10" × 7.5".
    pub const STANDARD: (i64, i64) = (9_144_000, 6_858_000);

    /// Create a presentation with the given slide size in EMU.
    pub fn new(slide_width: i64, slide_height: i64, slide: Slide) -> Self {
        Self {
            slide_width,
            slide_height,
            title: None,
            slide,
        }
    }

    /// Document title stored in the core properties.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn slide_width(&self) -> i64 {
        self.slide_width
    }

    pub fn slide_height(&self) -> i64 {
        self.slide_height
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn slide(&self) -> &Slide {
        &self.slide
    }

    /// Serialise the whole package into `.pptx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PptxError> {
        // PresentationML bounds for p:sldSz (1" to 56").
        const MIN: i64 = EMU_PER_INCH;
        const MAX: i64 = 56 * EMU_PER_INCH;
        if !(MIN..=MAX).contains(&self.slide_width) || !(MIN..=MAX).contains(&self.slide_height) {
            return Err(PptxError::InvalidSlideSize {
                cx: self.slide_width,
                cy: self.slide_height,
            });
        }
        package::write_package(self)
    }
}

/// Escape text for XML element content and attribute values.
///
/// Control characters other than tab, LF and CR are not allowed in XML 1.0
/// and are dropped.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}
