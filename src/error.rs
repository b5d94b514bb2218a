//! Error types for the edgequake-cv2field library.
//!
//! Every failure a user action can hit is a [`ClassifyError`]. None of them
//! are fatal to the session: the orchestrator in [`crate::session`] returns
//! them to the caller, which renders [`ClassifyError::localized`] and keeps
//! going.
//!
//! A model response that yields fewer than three fields is *not* an error.
//! It surfaces as [`crate::output::ClassificationOutcome::Shortfall`] so the
//! raw response can be shown instead.

use crate::i18n::Locale;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse grouping of [`ClassifyError`] variants.
///
/// Callers that only need to branch on "what went wrong" (e.g. to pick an
/// icon or decide whether to prompt for a key) match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    Validation,
    Auth,
    Provider,
    EmptyResponse,
    Extraction,
    Io,
    Config,
}

/// All errors returned by the edgequake-cv2field library.
#[derive(Debug, Error)]
pub enum ClassifyError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The uploaded file name does not end in `.pdf`.
    #[error("'{name}' is not a PDF file. Upload a file ending in .pdf.")]
    NotAPdf { name: String },

    /// Classification was triggered with no document uploaded.
    #[error("No document uploaded. Upload a PDF résumé first.")]
    MissingDocument,

    /// The PDF was read but produced no text after normalisation.
    #[error("No text could be read from '{name}'. Scanned PDFs need OCR first.")]
    EmptyText { name: String },

    // ── Credential errors ─────────────────────────────────────────────────
    /// No API key was available when the call was about to be made.
    #[error("No API key configured. Set {env_var} (or put it in .env) or enter it interactively.")]
    MissingCredential { env_var: String },

    /// The provider rejected the key (401/403). Retrying will not help.
    #[error("Authentication rejected by provider '{provider}': {detail}")]
    AuthRejected { provider: String, detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The provider could not be constructed (unknown name, bad model id).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The remote call failed fatally or exhausted its retries.
    #[error("LLM call failed after {attempts} attempt(s): {detail}")]
    ProviderError { attempts: u32, detail: String },

    /// The model answered with no usable text.
    #[error("The model returned an empty response.")]
    EmptyResponse,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The text extractor raised instead of returning an empty string.
    #[error("Could not extract text from '{name}': {detail}")]
    Extraction { name: String, detail: String },

    // ── Document source errors ────────────────────────────────────────────
    /// A local document path does not exist or is unreadable.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Downloading a document given as a URL failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClassifyError {
    /// The [`ErrorKind`] this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifyError::NotAPdf { .. }
            | ClassifyError::MissingDocument
            | ClassifyError::EmptyText { .. } => ErrorKind::Validation,
            ClassifyError::MissingCredential { .. } | ClassifyError::AuthRejected { .. } => {
                ErrorKind::Auth
            }
            ClassifyError::ProviderNotConfigured { .. } | ClassifyError::ProviderError { .. } => {
                ErrorKind::Provider
            }
            ClassifyError::EmptyResponse => ErrorKind::EmptyResponse,
            ClassifyError::Extraction { .. } => ErrorKind::Extraction,
            ClassifyError::FileNotFound { .. } | ClassifyError::DownloadFailed { .. } => {
                ErrorKind::Io
            }
            ClassifyError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Human-readable message in the given locale.
    ///
    /// English reuses the `Display` text. Vietnamese mirrors the wording the
    /// tool has always shown its users.
    pub fn localized(&self, locale: Locale) -> String {
        match locale {
            Locale::En => self.to_string(),
            Locale::Vi => match self {
                ClassifyError::NotAPdf { .. } => "Vui lòng upload file PDF.".to_string(),
                ClassifyError::MissingDocument => "Vui lòng upload một file PDF.".to_string(),
                ClassifyError::EmptyText { .. } => {
                    "Không đọc được nội dung CV từ file PDF.".to_string()
                }
                ClassifyError::MissingCredential { env_var } => format!(
                    "Chưa có {env_var}. Hãy đặt trong .env hoặc nhập trực tiếp."
                ),
                ClassifyError::AuthRejected { detail, .. } => {
                    format!("API key không hợp lệ: {detail}")
                }
                ClassifyError::Extraction { detail, .. } => {
                    format!("Không thể trích xuất nội dung từ PDF: {detail}")
                }
                ClassifyError::EmptyResponse => "Mô hình không trả về nội dung.".to_string(),
                ClassifyError::ProviderNotConfigured { .. }
                | ClassifyError::ProviderError { .. } => {
                    format!("Lỗi khi gọi mô hình: {self}")
                }
                ClassifyError::FileNotFound { path } => {
                    format!("Không tìm thấy file: {}", path.display())
                }
                ClassifyError::DownloadFailed { url, reason } => {
                    format!("Không tải được '{url}': {reason}")
                }
                ClassifyError::InvalidConfig(msg) => format!("Cấu hình không hợp lệ: {msg}"),
            },
        }
    }
}
