//! Pipeline stages for résumé classification.
//!
//! Each submodule implements exactly one step and none of them touch
//! session state; [`crate::session`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! fingerprint      extract ──▶ normalize ──▶ prompt ──▶ llm ──▶ parse
//! (upload id)      (pdf text)  (one line)    (template)  (model)  (top 3)
//! ```
//!
//! 1. [`fingerprint`]: SHA-256 identity of an upload, for cache invalidation
//! 2. [`extract`]: PDF bytes to text; runs in `spawn_blocking`
//! 3. [`normalize`]: collapse line breaks and whitespace
//! 4. [`llm`]: the model call with retry/backoff/timeout; the only
//!    stage with network I/O
//! 5. [`parse`]: ordered strategies that read three fields out of the
//!    response
//!
//! Prompt construction lives in [`crate::prompts`] next to the taxonomy.

pub mod extract;
pub mod fingerprint;
pub mod llm;
pub mod normalize;
pub mod parse;
