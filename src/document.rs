//! Uploaded documents and where they come from.
//!
//! A [`Document`] is the immutable `{name, size, content}` triple the rest of
//! the pipeline reads. The CLI builds one from a local path or an HTTP(S)
//! URL via [`load_document`]; library callers that already hold the bytes
//! (a web upload, a database blob) use [`Document::new`] directly.
//!
//! Only the `.pdf` file-name suffix is enforced ([`is_pdf_name`]). A file
//! with the right name but the wrong bytes is logged and left to the text
//! extractor, which reports it as an extraction error instead.

use crate::error::ClassifyError;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An uploaded résumé.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    size: u64,
    content: Vec<u8>,
}

impl Document {
    /// Create a document whose declared size is the content length.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        let size = content.len() as u64;
        Self {
            name: name.into(),
            size,
            content,
        }
    }

    /// Create a document with a size declared by the upload source.
    ///
    /// Upload widgets report the size separately from the bytes; it is part
    /// of the fingerprint as declared, even if it disagrees with the content.
    pub fn with_declared_size(name: impl Into<String>, size: u64, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size,
            content,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Whether the content starts with the `%PDF` magic bytes.
    pub fn has_pdf_magic(&self) -> bool {
        self.content.starts_with(b"%PDF")
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .finish()
    }
}

/// Whether `name` ends in `.pdf`, ignoring ASCII case.
pub fn is_pdf_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

/// Reject documents whose name is not a PDF name.
pub fn validate(doc: &Document) -> Result<(), ClassifyError> {
    if !is_pdf_name(doc.name()) {
        return Err(ClassifyError::NotAPdf {
            name: doc.name().to_string(),
        });
    }
    if !doc.has_pdf_magic() {
        warn!(
            "'{}' has a .pdf name but does not start with %PDF; extraction may fail",
            doc.name()
        );
    }
    Ok(())
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a document from a local path or an HTTP(S) URL.
pub async fn load_document(source: &str, timeout_secs: u64) -> Result<Document, ClassifyError> {
    if is_url(source) {
        download_url(source, timeout_secs).await
    } else {
        load_local(Path::new(source)).await
    }
}

async fn load_local(path: &Path) -> Result<Document, ClassifyError> {
    let content = tokio::fs::read(path).await.map_err(|e| {
        debug!("Reading {} failed: {}", path.display(), e);
        ClassifyError::FileNotFound {
            path: path.to_path_buf(),
        }
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Loaded local document: {} ({} bytes)", path.display(), content.len());
    Ok(Document::new(name, content))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, ClassifyError> {
    let name = filename_from_url(url);
    if !is_pdf_name(&name) {
        return Err(ClassifyError::NotAPdf { name });
    }

    info!("Downloading document from: {}", url);

    let failed = |reason: String| ClassifyError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    info!("Downloaded {} bytes as '{}'", bytes.len(), name);
    Ok(Document::new(name, bytes.to_vec()))
}

/// Last non-empty path segment of the URL, or the URL itself when there is
/// none. No extension is invented, so a name-less URL fails the `.pdf` check.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| url.to_string())
}
