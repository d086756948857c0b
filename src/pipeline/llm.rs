//! VLM interaction: build the vision request and call the provider.
//!
//! This module is intentionally thin: the prompt text lives in
//! [`crate::prompts`] and the response parsing in [`super::parse`], so
//! neither can be broken by a change to the retry logic here.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`) gives 500 ms → 1 s → 2 s with the
//! defaults. Each attempt is bounded by `api_timeout_secs`; a hung
//! connection counts as a failed attempt and is retried like any other.

use crate::config::ConversionConfig;
use crate::error::Img2PptxError;
use crate::prompts::{DEFAULT_SYSTEM_PROMPT, LAYOUT_INSTRUCTION};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// The raw answer of a successful VLM call.
#[derive(Debug, Clone)]
pub struct AnalysisCall {
    /// Response text, expected to hold the layout JSON.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Failed attempts before this one.
    pub retries: u32,
    pub duration_ms: u64,
}

/// Why a single attempt failed.
enum AttemptError {
    Timeout,
    Provider(String),
}

/// Ask the VLM to describe the slide in `image_data`.
///
/// ## Message Layout
///
/// 1. **System message** — the analyst persona (or the user-supplied override)
/// 2. **User message** — the layout instruction with its JSON schema, plus
///    the slide image as a base64 attachment
pub async fn analyze_image(
    provider: &Arc<dyn LLMProvider>,
    image_data: ImageData,
    config: &ConversionConfig,
) -> Result<AnalysisCall, Img2PptxError> {
    let start = Instant::now();
    let messages = build_messages(image_data, config);
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<AttemptError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Analysis retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) if !response.content.trim().is_empty() => {
                let duration = start.elapsed();
                debug!(
                    "Analysis: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens, response.completion_tokens, duration
                );
                return Ok(AnalysisCall {
                    text: response.content,
                    input_tokens: response.prompt_tokens as u64,
                    output_tokens: response.completion_tokens as u64,
                    retries: attempt,
                    duration_ms: duration.as_millis() as u64,
                });
            }
            Ok(Ok(_)) => {
                warn!("Attempt {} returned an empty response", attempt + 1);
                last_err = Some(AttemptError::Provider("empty response".into()));
            }
            Ok(Err(e)) => {
                warn!("Attempt {} failed — {}", attempt + 1, e);
                last_err = Some(AttemptError::Provider(e.to_string()));
            }
            Err(_) => {
                warn!(
                    "Attempt {} timed out after {}s",
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(AttemptError::Timeout);
            }
        }
    }

    Err(match last_err {
        Some(AttemptError::Timeout) => Img2PptxError::ApiTimeout {
            secs: config.api_timeout_secs,
        },
        Some(AttemptError::Provider(detail)) => Img2PptxError::AnalysisFailed {
            retries: config.max_retries,
            detail,
        },
        None => Img2PptxError::AnalysisFailed {
            retries: config.max_retries,
            detail: "Unknown error".into(),
        },
    })
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn build_messages(image_data: ImageData, config: &ConversionConfig) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(config)),
        ChatMessage::user_with_images(LAYOUT_INSTRUCTION, vec![image_data]),
    ]
}

fn system_prompt(config: &ConversionConfig) -> &str {
    config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
}

/// Build `CompletionOptions` from the conversion config.
fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
