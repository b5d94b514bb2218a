//! Progress-callback trait for classification events.
//!
//! Inject an [`Arc<dyn ClassificationProgressCallback>`] via
//! [`crate::config::ClassifierConfigBuilder::progress_callback`] to drive a
//! busy indicator while a classification runs. The model call can take
//! several seconds, and retries stretch that further, so the CLI uses these
//! events to keep its spinner message honest.
//!
//! # Example
//!
//! ```rust
//! use edgequake_cv2field::{ClassificationProgressCallback, ClassifierConfig, Stage};
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! impl ClassificationProgressCallback for Logger {
//!     fn on_stage(&self, stage: Stage) {
//!         eprintln!("→ {stage:?}");
//!     }
//! }
//!
//! let config = ClassifierConfig::builder()
//!     .progress_callback(Arc::new(Logger) as Arc<dyn ClassificationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Pipeline stages reported through [`ClassificationProgressCallback::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pulling text out of the PDF.
    Extracting,
    /// Sending the prompt to the model.
    CallingModel,
    /// Reading the three fields out of the response.
    Parsing,
}

/// Called by the session as it runs a classification.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`.
pub trait ClassificationProgressCallback: Send + Sync {
    /// Called when the pipeline enters `stage`.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called before sleeping ahead of retry number `attempt` (1-based).
    ///
    /// # Arguments
    /// * `attempt`: retry number about to be made
    /// * `max_retries`: configured retry bound
    /// * `backoff_ms`: delay before the retry
    /// * `error`: description of the failure being retried
    fn on_retry(&self, attempt: u32, max_retries: u32, backoff_ms: u64, error: &str) {
        let _ = (attempt, max_retries, backoff_ms, error);
    }

    /// Called once the pipeline finishes, successfully or not.
    ///
    /// `entries` is the number of parsed fields (0 when an error occurred
    /// before parsing).
    fn on_finish(&self, entries: usize) {
        let _ = entries;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ClassificationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClassifierConfig`].
pub type ProgressCallback = Arc<dyn ClassificationProgressCallback>;
