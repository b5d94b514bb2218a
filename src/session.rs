//! Session orchestration: the only code that mutates [`SessionState`].
//!
//! ## Pipeline
//!
//! ```text
//! upload ──▶ fingerprint ──▶ (invalidate?) ──▶ classify:
//!            extract ──▶ normalize ──▶ build prompt ──▶ model ──▶ parse ──▶ store
//! ```
//!
//! ## State rules
//!
//! - A new fingerprint clears `last_result` immediately, before any
//!   classification of the new document runs, and regardless of whether
//!   that classification later succeeds.
//! - Only a parse yielding exactly three entries overwrites `last_result`.
//! - Every error leaves `last_result` as it was when the action began.
//!
//! `classify` takes `&mut self`, so a session cannot start a second
//! classification while one is outstanding.

use crate::config::ClassifierConfig;
use crate::document::{self, Document};
use crate::error::ClassifyError;
use crate::output::{ClassificationOutcome, ClassificationResult};
use crate::pipeline::extract::{PdfTextExtractor, TextExtractor};
use crate::pipeline::fingerprint::{fingerprint, Fingerprint};
use crate::pipeline::llm::{ChatBackend, ClassificationClient};
use crate::pipeline::normalize::normalize;
use crate::pipeline::parse::parse_top3;
use crate::progress::Stage;
use crate::prompts::build_prompt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-session memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Fingerprint of the most recently observed upload (`None` before the
    /// first observation).
    pub last_fingerprint: Option<Fingerprint>,
    /// Last complete classification, if any.
    pub last_result: Option<ClassificationResult>,
}

impl SessionState {
    /// Record `fp` as the current upload. Returns `true` when it differs
    /// from the previous one, in which case the stored result is dropped.
    fn observe(&mut self, fp: Fingerprint) -> bool {
        if self.last_fingerprint.as_ref() == Some(&fp) {
            return false;
        }
        if self.last_result.take().is_some() {
            debug!("Upload changed; cleared previous result");
        }
        self.last_fingerprint = Some(fp);
        true
    }
}

/// Result of [`Session::upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// A different document than before; any previous result was cleared.
    New,
    /// Byte-identical head, same name and size; the result was kept.
    Unchanged,
}

/// One user's classification session.
pub struct Session {
    state: SessionState,
    document: Option<Document>,
    client: ClassificationClient,
    extractor: Arc<dyn TextExtractor>,
}

impl Session {
    /// Session using the `pdf-extract` extractor and the configured provider.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            state: SessionState::default(),
            document: None,
            client: ClassificationClient::new(config),
            extractor: Arc::new(PdfTextExtractor),
        }
    }

    /// Replace the chat backend (fakes in tests, custom middleware).
    pub fn with_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        let config = self.client.config().clone();
        self.client = ClassificationClient::with_backend(config, backend);
        self
    }

    /// Replace the text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &ClassifierConfig {
        self.client.config()
    }

    /// The document currently uploaded, if any.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// The stored classification, if any.
    pub fn result(&self) -> Option<&ClassificationResult> {
        self.state.last_result.as_ref()
    }

    /// Populate the credential slot for the rest of the process.
    pub fn set_api_key(&mut self, key: &str) {
        self.client.config_mut().set_api_key(key);
    }

    /// Accept an uploaded document.
    ///
    /// A name not ending in `.pdf` is rejected before anything else happens;
    /// state and the current document are untouched. Otherwise the document
    /// becomes current and its fingerprint is observed.
    pub fn upload(&mut self, doc: Document) -> Result<UploadStatus, ClassifyError> {
        document::validate(&doc)?;

        let fp = fingerprint(Some(&doc));
        let changed = self.state.observe(fp);
        info!(
            "Upload '{}' ({} bytes): {}",
            doc.name(),
            doc.size(),
            if changed { "new document" } else { "unchanged" }
        );
        self.document = Some(doc);

        Ok(if changed {
            UploadStatus::New
        } else {
            UploadStatus::Unchanged
        })
    }

    /// Withdraw the current document. Observing the empty fingerprint clears
    /// any stored result.
    pub fn remove_upload(&mut self) {
        self.document = None;
        self.state.observe(fingerprint(None));
    }

    /// Drop the stored result. The fingerprint is kept.
    pub fn clear(&mut self) {
        self.state.last_result = None;
    }

    /// Classify the current document.
    ///
    /// # Returns
    /// - `Classified`: three fields parsed; they are now the stored result
    /// - `Shortfall`: fewer than three; stored result unchanged
    ///
    /// # Errors
    /// Any [`ClassifyError`]; the stored result is left unchanged.
    pub async fn classify(&mut self) -> Result<ClassificationOutcome, ClassifyError> {
        let progress = self.client.config().progress_callback.clone();
        let outcome = self.run_pipeline().await;

        if let Some(ref cb) = progress {
            let entries = match &outcome {
                Ok(ClassificationOutcome::Classified { result }) => result.fields().len(),
                Ok(ClassificationOutcome::Shortfall { entries, .. }) => entries.len(),
                Err(_) => 0,
            };
            cb.on_finish(entries);
        }

        let outcome = outcome?;
        if let ClassificationOutcome::Classified { ref result } = outcome {
            let off = result.off_taxonomy();
            if !off.is_empty() {
                warn!("Model answered outside the taxonomy: {:?}", off);
            }
            self.state.last_result = Some(result.clone());
        }
        Ok(outcome)
    }

    async fn run_pipeline(&self) -> Result<ClassificationOutcome, ClassifyError> {
        let doc = self.document.as_ref().ok_or(ClassifyError::MissingDocument)?;
        let progress = self.client.config().progress_callback.as_ref();
        let stage = |s: Stage| {
            if let Some(cb) = progress {
                cb.on_stage(s);
            }
        };

        // Fail on a missing key before spending time on extraction.
        if self.client.config().effective_api_key().is_none() {
            return Err(ClassifyError::MissingCredential {
                env_var: self.client.config().api_key_env.clone(),
            });
        }

        stage(Stage::Extracting);
        let raw_text = self.extractor.extract(doc.name(), doc.content()).await?;
        let text = normalize(&raw_text);
        if text.is_empty() {
            return Err(ClassifyError::EmptyText {
                name: doc.name().to_string(),
            });
        }
        debug!("Normalised résumé: {} chars", text.chars().count());

        stage(Stage::CallingModel);
        let response = self.client.classify(&build_prompt(&text)).await?;

        stage(Stage::Parsing);
        let entries = parse_top3(&response);
        match ClassificationResult::from_entries(&entries) {
            Some(result) => {
                info!("Classified '{}': {:?}", doc.name(), result.fields());
                Ok(ClassificationOutcome::Classified { result })
            }
            None => {
                warn!(
                    "Parsed {} of 3 fields from '{}'; keeping previous result",
                    entries.len(),
                    doc.name()
                );
                Ok(ClassificationOutcome::Shortfall {
                    entries,
                    raw: response,
                })
            }
        }
    }
}
