//! PDF text extraction.
//!
//! Extraction is a collaborator behind the [`TextExtractor`] trait: the
//! session only needs "bytes in, best-effort text out". The default
//! [`PdfTextExtractor`] wraps the `pdf-extract` crate.
//!
//! ## Why spawn_blocking?
//!
//! Decoding content streams is CPU-bound and can take a noticeable time on
//! large, image-heavy résumés. Running it on the blocking pool keeps the
//! Tokio workers free. It also contains panics: `pdf-extract` is known to
//! panic on some malformed fonts, and a panicking blocking task surfaces as
//! a `JoinError` we can turn into an ordinary extraction error.

use crate::error::ClassifyError;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Turns PDF bytes into plain text.
///
/// Implementations return `Ok(String::new())` for a document that is empty
/// or unreadable, and `Err` only when the extractor itself broke down.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from `content`. `name` is used for error messages only.
    async fn extract(&self, name: &str, content: &[u8]) -> Result<String, ClassifyError>;
}

/// Default extractor backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, name: &str, content: &[u8]) -> Result<String, ClassifyError> {
        if content.is_empty() {
            debug!("'{}' is empty; nothing to extract", name);
            return Ok(String::new());
        }

        let bytes = content.to_vec();
        let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| {
                warn!("Extraction task for '{}' panicked: {}", name, e);
                ClassifyError::Extraction {
                    name: name.to_string(),
                    detail: format!("extractor crashed: {e}"),
                }
            })?;

        // Unreadable counts as no text.
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read text from '{}': {}", name, e);
                String::new()
            }
        };

        debug!("Extracted {} chars from '{}'", text.chars().count(), name);
        Ok(text)
    }
}
