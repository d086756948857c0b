//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as each image goes through analysis and layout. The library does
//! not care what the host does with them: a terminal spinner, a log line,
//! a message on a channel.
//!
//! # Example
//!
//! ```rust
//! use edgequake_img2pptx::{ConversionProgressCallback, ConversionConfig, ElementError};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SkipCounter {
//!     skipped: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for SkipCounter {
//!     fn on_element_skipped(&self, input: &str, error: &ElementError) {
//!         self.skipped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{input}: {error}");
//!     }
//! }
//!
//! let counter = Arc::new(SkipCounter { skipped: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ElementError;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes an image.
///
/// Implementations must be `Send + Sync`: [`crate::convert_batch`] converts
/// several images concurrently and every method may be called from
/// different tasks at once. All methods have default no-op implementations.
///
/// `input` is always the path or URL as given by the caller.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once per image, before the input is read.
    fn on_conversion_start(&self, input: &str) {
        let _ = input;
    }

    /// Called just before the VLM request is sent.
    fn on_analysis_start(&self, input: &str) {
        let _ = input;
    }

    /// Called when the model's answer has been parsed.
    ///
    /// * `element_count` — number of raw elements in the analysis
    fn on_analysis_complete(&self, input: &str, element_count: usize) {
        let _ = (input, element_count);
    }

    /// Called for every element that could not be placed on the slide.
    fn on_element_skipped(&self, input: &str, error: &ElementError) {
        let _ = (input, error);
    }

    /// Called when the presentation for `input` has been built.
    ///
    /// * `placed`  — shapes on the slide
    /// * `skipped` — elements dropped
    fn on_conversion_complete(&self, input: &str, placed: usize, skipped: usize) {
        let _ = (input, placed, skipped);
    }

    /// Called when the conversion of `input` fails fatally.
    fn on_conversion_error(&self, input: &str, error: &str) {
        let _ = (input, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        events: Mutex<Vec<String>>,
        skipped: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, input: &str) {
            self.events.lock().unwrap().push(format!("start {input}"));
        }

        fn on_analysis_complete(&self, _input: &str, element_count: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("analysed {element_count}"));
        }

        fn on_element_skipped(&self, _input: &str, _error: &ElementError) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _input: &str, placed: usize, skipped: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {placed}/{skipped}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("slide.png");
        cb.on_analysis_start("slide.png");
        cb.on_analysis_complete("slide.png", 5);
        cb.on_element_skipped(
            "slide.png",
            &ElementError::UnknownType {
                index: 0,
                kind: "video".into(),
            },
        );
        cb.on_conversion_complete("slide.png", 4, 1);
        cb.on_conversion_error("slide.png", "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_conversion_start("a.png");
        tracker.on_analysis_start("a.png");
        tracker.on_analysis_complete("a.png", 3);
        tracker.on_element_skipped(
            "a.png",
            &ElementError::Malformed {
                index: 2,
                kind: "text".into(),
                detail: "bad".into(),
            },
        );
        tracker.on_conversion_complete("a.png", 2, 1);

        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.events.lock().unwrap(),
            vec!["start a.png", "analysed 3", "done 2/1"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start("x.jpg");
        cb.on_conversion_complete("x.jpg", 0, 0);
    }
}
