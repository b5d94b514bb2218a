//! # edgequake-cv2field
//!
//! Classify a résumé PDF into the three best-matching job fields from a
//! fixed 12-item taxonomy with a single LLM call.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Fingerprint  SHA-256(name ‖ size ‖ first 512 bytes); new file → drop old result
//!  ├─ 2. Extract      pdf-extract on the blocking pool
//!  ├─ 3. Normalize    one line, single spaces
//!  ├─ 4. Prompt       fixed Vietnamese template + taxonomy + résumé
//!  ├─ 5. Model        deterministic call with retry / backoff / timeout
//!  ├─ 6. Parse        numbered lines, else plain lines; at most 3
//!  └─ 7. Store        exactly 3 → session result; fewer → show raw response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_cv2field::{ClassificationOutcome, ClassifierConfig, Document, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from GROQ_API_KEY at call time
//!     let mut session = Session::new(ClassifierConfig::default());
//!     let bytes = std::fs::read("cv.pdf")?;
//!     session.upload(Document::new("cv.pdf", bytes))?;
//!
//!     match session.classify().await? {
//!         ClassificationOutcome::Classified { result } => println!("{:?}", result.fields()),
//!         ClassificationOutcome::Shortfall { raw, .. } => eprintln!("unparsed:\n{raw}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the interactive `cv2field` binary |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod i18n;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClassifierConfig, ClassifierConfigBuilder};
pub use document::{is_pdf_name, load_document, Document};
pub use error::{ClassifyError, ErrorKind};
pub use i18n::{Locale, Message};
pub use output::{render_results, ClassificationOutcome, ClassificationResult};
pub use pipeline::extract::{PdfTextExtractor, TextExtractor};
pub use pipeline::fingerprint::{fingerprint, Fingerprint};
pub use pipeline::llm::{BackendError, ChatBackend, ChatRequest, ClassificationClient};
pub use pipeline::normalize::normalize;
pub use pipeline::parse::parse_top3;
pub use progress::{ClassificationProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use prompts::{build_prompt, TAXONOMY};
pub use session::{Session, SessionState, UploadStatus};
