//! Response parsing: VLM text → [`SlideAnalysis`].
//!
//! The prompt asks for bare JSON, but models still wrap it in
//! ```` ```json ```` fences, prepend "Here is the analysis:" or append a
//! closing remark. These rules recover the object in those cases and fail
//! with the start of the response in the error otherwise, so the user can
//! see what the model actually said.
//!
//! Rules (applied in order):
//! 1. Strip invisible Unicode (BOM, zero-width spaces)
//! 2. Trim, then strip a leading ```` ```json ```` / ```` ``` ```` fence and a trailing ```` ``` ````
//! 3. Parse; if that fails, retry on the first `{` … last `}` span
//! 4. A bare array is accepted as the `elements` list

use crate::analysis::SlideAnalysis;
use crate::error::Img2PptxError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Characters of the response quoted in [`Img2PptxError::InvalidAnalysis`].
const EXCERPT_CHARS: usize = 200;

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:json)?\s*").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

/// Parse the model's answer into a [`SlideAnalysis`].
pub fn parse_analysis(response: &str) -> Result<SlideAnalysis, Img2PptxError> {
    let cleaned = strip_fences(&remove_invisible_chars(response));

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(v) => v,
        Err(first_err) => {
            let span = outer_object(&cleaned).ok_or_else(|| invalid(response, &first_err))?;
            debug!("Recovering JSON object from surrounding text");
            serde_json::from_str::<Value>(span).map_err(|e| invalid(response, &e))?
        }
    };

    let value = match value {
        Value::Object(_) => value,
        Value::Array(elements) => serde_json::json!({ "elements": elements }),
        other => {
            return Err(Img2PptxError::InvalidAnalysis {
                detail: format!("expected a JSON object, got {other}"),
                excerpt: excerpt(response),
            })
        }
    };

    serde_json::from_value(value).map_err(|e| invalid(response, &e))
}

fn invalid(response: &str, err: &serde_json::Error) -> Img2PptxError {
    Img2PptxError::InvalidAnalysis {
        detail: err.to_string(),
        excerpt: excerpt(response),
    }
}

fn excerpt(response: &str) -> String {
    response.trim().chars().take(EXCERPT_CHARS).collect()
}

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'))
        .collect()
}

fn strip_fences(input: &str) -> String {
    let s = RE_LEADING_FENCE.replace(input.trim(), "");
    RE_TRAILING_FENCE.replace(&s, "").into_owned()
}

/// The first `{` through the last `}`, if both exist in that order.
fn outer_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (end > start).then(|| &input[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json() {
        let a = parse_analysis(r##"{"background": {"color": "#000000"}, "elements": []}"##).unwrap();
        assert_eq!(a.background.color.as_deref(), Some("#000000"));
    }

    #[test]
    fn fenced_json() {
        let raw = "```json\n{\"elements\": [{\"type\": \"text\", \"content\": \"Hi\"}]}\n```";
        assert_eq!(parse_analysis(raw).unwrap().elements.len(), 1);

        let raw = "```\n{\"elements\": []}\n```\n";
        assert!(parse_analysis(raw).unwrap().elements.is_empty());
    }

    #[test]
    fn json_surrounded_by_prose() {
        let raw = "Here is the analysis:\n{\"slide_width_px\": 1920, \"elements\": []}\nLet me know!";
        assert_eq!(parse_analysis(raw).unwrap().slide_width_px, Some(1920.0));
    }

    #[test]
    fn bom_and_zero_width_are_ignored() {
        let raw = "\u{FEFF}{\"elements\": []\u{200B}}";
        assert!(parse_analysis(raw).is_ok());
    }

    #[test]
    fn bare_array_becomes_elements() {
        let a = parse_analysis(r#"[{"type": "shape"}, {"type": "text"}]"#).unwrap();
        assert_eq!(a.elements.len(), 2);
    }

    #[test]
    fn garbage_is_rejected_with_excerpt() {
        let err = parse_analysis("I cannot analyse this image.").unwrap_err();
        match err {
            Img2PptxError::InvalidAnalysis { excerpt, .. } => {
                assert_eq!(excerpt, "I cannot analyse this image.")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(parse_analysis("42").is_err());
        assert!(parse_analysis("{\"elements\": {}}").is_err());
    }

    #[test]
    fn excerpt_is_bounded() {
        let long = "x".repeat(1000);
        let err = parse_analysis(&long).unwrap_err();
        let Img2PptxError::InvalidAnalysis { excerpt, .. } = err else {
            panic!("unexpected error")
        };
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
    }
}
