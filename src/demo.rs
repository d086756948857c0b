//! Built-in sample analysis.
//!
//! Lets the whole rendering path run without an API key or an image:
//! `img2pptx --demo` and [`demo_analysis`] produce a small sales-report slide
//! that exercises every element type.

use crate::analysis::{BackgroundSpec, SlideAnalysis};
use serde_json::json;

/// A dark-blue "sales report" slide with a title, a panel of figures, a chart
/// placeholder and a footer.
pub fn demo_analysis() -> SlideAnalysis {
    SlideAnalysis {
        slide_width_px: Some(1280.0),
        slide_height_px: Some(720.0),
        background: BackgroundSpec {
            kind: Some("solid".into()),
            color: Some("#1E2761".into()),
            gradient_end: None,
        },
        elements: vec![
            json!({
                "type": "shape",
                "shape_type": "rectangle",
                "x_percent": 0, "y_percent": 0,
                "width_percent": 100, "height_percent": 100,
                "fill_color": "#1E2761",
                "border_color": null
            }),
            json!({
                "type": "text",
                "content": "Sales Report FY2025",
                "x_percent": 10, "y_percent": 8,
                "width_percent": 80, "height_percent": 12,
                "font_size_pt": 40,
                "font_color": "#FFFFFF",
                "bold": true, "italic": false,
                "align": "center",
                "background_color": null
            }),
            json!({
                "type": "shape",
                "shape_type": "rounded_rectangle",
                "x_percent": 5, "y_percent": 25,
                "width_percent": 42, "height_percent": 55,
                "fill_color": "#2A3A8F",
                "border_color": "#4A5ABF",
                "border_width": 2
            }),
            json!({
                "type": "text",
                "content": "Q1: ¥12,500,000\nQ2: ¥15,800,000\nQ3: ¥18,200,000\nQ4: ¥22,100,000",
                "x_percent": 8, "y_percent": 30,
                "width_percent": 36, "height_percent": 45,
                "font_size_pt": 18,
                "font_color": "#CADCFC",
                "bold": false, "italic": false,
                "align": "left",
                "background_color": null
            }),
            json!({
                "type": "image_region",
                "description": "Sales trend bar chart",
                "x_percent": 53, "y_percent": 25,
                "width_percent": 42, "height_percent": 55
            }),
            json!({
                "type": "text",
                "content": "© 2025 Sample Corp. All rights reserved.",
                "x_percent": 10, "y_percent": 88,
                "width_percent": 80, "height_percent": 8,
                "font_size_pt": 10,
                "font_color": "#7788AA",
                "bold": false, "italic": true,
                "align": "center",
                "background_color": null
            }),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_elements_all_decode() {
        let demo = demo_analysis();
        assert_eq!(demo.elements.len(), 6);
        assert!(demo.decode_elements().iter().all(Result::is_ok));
    }

    #[test]
    fn demo_round_trips_through_json() {
        let demo = demo_analysis();
        let text = serde_json::to_string(&demo).unwrap();
        let back: SlideAnalysis = serde_json::from_str(&text).unwrap();
        assert_eq!(back, demo);
    }
}
