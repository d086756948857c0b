//! Pipeline stages for image-to-PPTX conversion.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the AI-free stages can run without the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ parse ──▶ (layout, pptx)
//! (path/URL) (base64)  (VLM)   (JSON)
//! ```
//!
//! 1. [`input`]  — read the path or URL into memory and sniff the media type
//! 2. [`encode`] — decode, downscale if needed, base64-wrap for the request
//! 3. [`llm`]    — drive the VLM call with retry/backoff and a per-call
//!    timeout; the only stage with network I/O besides URL download
//! 4. [`parse`]  — recover the JSON layout from the model's answer

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
