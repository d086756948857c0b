//! Prompts for VLM-based slide layout extraction.
//!
//! Every prompt lives here so a change to the extraction rules touches one
//! file, and unit tests can inspect the prompt text without a provider.
//!
//! Callers can override the system prompt via
//! [`crate::config::ConversionConfig::system_prompt`]; the user instruction
//! that carries the JSON schema is always sent, because the parser depends
//! on it.

/// Default system prompt, used when `ConversionConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert presentation designer and layout analyst. You look at an image of a presentation slide and describe every visual element on it precisely enough that the slide can be rebuilt as an editable presentation.

You answer with a single JSON object and nothing else."#;

/// User instruction sent together with the slide image.
pub const LAYOUT_INSTRUCTION: &str = r##"This image is a presentation slide. Analyse every element in the image and return it in exactly the following JSON format.
Return ONLY the JSON. Do not include any other text or markdown code fences.

{
  "slide_width_px": <estimated image width in pixels>,
  "slide_height_px": <estimated image height in pixels>,
  "background": {
    "type": "solid" or "gradient",
    "color": "#RRGGBB",
    "gradient_end": "#RRGGBB"
  },
  "elements": [
    {
      "type": "text",
      "content": "the text",
      "x_percent": 0-100,
      "y_percent": 0-100,
      "width_percent": 0-100,
      "height_percent": 0-100,
      "font_size_pt": number,
      "font_color": "#RRGGBB",
      "bold": true/false,
      "italic": true/false,
      "align": "left"/"center"/"right",
      "background_color": "#RRGGBB" or null
    },
    {
      "type": "shape",
      "shape_type": "rectangle"/"rounded_rectangle"/"oval"/"line",
      "x_percent": 0-100,
      "y_percent": 0-100,
      "width_percent": 0-100,
      "height_percent": 0-100,
      "fill_color": "#RRGGBB",
      "border_color": "#RRGGBB" or null,
      "border_width": number or null
    },
    {
      "type": "image_region",
      "description": "what the picture shows (chart, photo, ...)",
      "x_percent": 0-100,
      "y_percent": 0-100,
      "width_percent": 0-100,
      "height_percent": 0-100
    }
  ]
}

Important rules:
- All coordinates are percentages (0-100) of the whole slide
- Read text exactly; repair blurred or broken characters from context
- Detect every element layered on top of the background
- List elements in z-order (back to front)
- When a shape contains text, output the shape and the text as separate elements
- Estimate font_size_pt from the visual size in the image (title: 28-44pt, body: 14-18pt, caption: 10-12pt)
- Output JSON only. No explanations and no code fence markers"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_names_every_element_type() {
        for t in crate::analysis::ELEMENT_TYPES {
            assert!(LAYOUT_INSTRUCTION.contains(&format!("\"type\": \"{t}\"")), "{t}");
        }
    }

    #[test]
    fn instruction_names_every_shape_type() {
        for s in ["rectangle", "rounded_rectangle", "oval", "line"] {
            assert!(LAYOUT_INSTRUCTION.contains(&format!("\"{s}\"")), "{s}");
        }
    }
}
