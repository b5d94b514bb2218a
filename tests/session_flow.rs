//! Session-level integration tests.
//!
//! The extractor and the chat backend are replaced with in-memory fakes, so
//! these run offline and check the state rules end to end: which actions
//! overwrite, keep, or drop the stored result.

use async_trait::async_trait;
use edgequake_cv2field::{
    BackendError, ChatBackend, ChatRequest, ClassificationOutcome, ClassifierConfig,
    ClassifyError, Document, ErrorKind, Session, TextExtractor, UploadStatus,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Returns a fixed text, or an extraction error for names containing "broken".
struct FakeExtractor {
    text: String,
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, name: &str, _content: &[u8]) -> Result<String, ClassifyError> {
        if name.contains("broken") {
            return Err(ClassifyError::Extraction {
                name: name.to_string(),
                detail: "corrupt xref".into(),
            });
        }
        Ok(self.text.clone())
    }
}

/// Plays back queued replies and records every prompt it receives.
#[derive(Default)]
struct FakeBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeBackend {
    fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            ..Default::default()
        })
    }

    fn push(&self, reply: Result<String, BackendError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.user.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Fatal("no reply queued".into())))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const GOOD_REPLY: &str =
    "Kết quả:\n1. Công nghệ - Thông tin\n2. Kinh doanh - Bán hàng\n3. Tài chính - Ngân hàng";

/// Credential given directly, under an env name nothing else reads.
fn config() -> ClassifierConfig {
    ClassifierConfig::builder()
        .api_key_env("CV2FIELD_TEST_SESSION_KEY")
        .api_key("test-key")
        .max_retries(0)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

fn session_with(backend: Arc<FakeBackend>, text: &str) -> Session {
    Session::new(config())
        .with_backend(backend)
        .with_extractor(Arc::new(FakeExtractor {
            text: text.to_string(),
        }))
}

fn pdf(name: &str, tag: &str) -> Document {
    Document::new(name, format!("%PDF-1.7 {tag}").into_bytes())
}

fn fields(session: &Session) -> Vec<String> {
    session
        .result()
        .map(|r| r.fields().to_vec())
        .unwrap_or_default()
}

// ── Happy paths ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn classifies_numbered_reply() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "Kỹ sư phần mềm\n\n  Python   Rust");
    session.upload(pdf("cv.pdf", "a")).unwrap();

    let outcome = session.classify().await.unwrap();
    assert!(outcome.is_classified());
    assert_eq!(
        fields(&session),
        [
            "Công nghệ - Thông tin",
            "Kinh doanh - Bán hàng",
            "Tài chính - Ngân hàng"
        ]
    );

    // The résumé reaches the model normalised and embedded in the template.
    let prompts = backend.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Kỹ sư phần mềm Python Rust"));
    assert!(!prompts[0].contains("--HERERESUME--"));
}

#[tokio::test]
async fn classifies_plain_line_reply() {
    let backend = FakeBackend::replying(&["Giáo dục\nY tế - Dược phẩm\nHành chính - Văn phòng"]);
    let mut session = session_with(backend, "giáo viên");
    session.upload(pdf("cv.pdf", "a")).unwrap();

    session.classify().await.unwrap();
    assert_eq!(
        fields(&session),
        ["Giáo dục", "Y tế - Dược phẩm", "Hành chính - Văn phòng"]
    );
}

#[tokio::test]
async fn strips_reasoning_before_parsing() {
    let backend = FakeBackend::replying(&[
        "<think>\n1. maybe Giáo dục\n</think>\n1. Nông nghiệp\n2. Sản xuất\n3. Khác",
    ]);
    let mut session = session_with(backend, "kỹ sư nông nghiệp");
    session.upload(pdf("cv.pdf", "a")).unwrap();

    session.classify().await.unwrap();
    assert_eq!(fields(&session), ["Nông nghiệp", "Sản xuất", "Khác"]);
}

// ── Shortfall ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn shortfall_keeps_previous_result() {
    let backend = FakeBackend::replying(&[GOOD_REPLY, "Kết quả:\n1. Giáo dục\n2. Khác"]);
    let mut session = session_with(backend, "text");
    session.upload(pdf("cv.pdf", "a")).unwrap();
    session.classify().await.unwrap();
    let before = fields(&session);

    match session.classify().await.unwrap() {
        ClassificationOutcome::Shortfall { entries, raw } => {
            assert_eq!(entries, ["Giáo dục", "Khác"]);
            assert!(raw.contains("2. Khác"));
        }
        other => panic!("expected shortfall, got {other:?}"),
    }
    assert_eq!(fields(&session), before);
}

#[tokio::test]
async fn shortfall_on_fresh_upload_leaves_no_result() {
    let backend = FakeBackend::replying(&["Tôi không chắc."]);
    let mut session = session_with(backend, "text");
    session.upload(pdf("cv.pdf", "a")).unwrap();

    let outcome = session.classify().await.unwrap();
    assert!(!outcome.is_classified());
    assert!(session.result().is_none());
}

// ── Cache invalidation ───────────────────────────────────────────────────────

#[tokio::test]
async fn new_upload_drops_result_before_classifying() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");
    session.upload(pdf("first.pdf", "a")).unwrap();
    session.classify().await.unwrap();
    assert!(session.result().is_some());

    let status = session.upload(pdf("second.pdf", "b")).unwrap();
    assert_eq!(status, UploadStatus::New);
    assert!(session.result().is_none());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn reuploading_same_file_keeps_result() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend, "text");
    session.upload(pdf("cv.pdf", "a")).unwrap();
    session.classify().await.unwrap();

    let status = session.upload(pdf("cv.pdf", "a")).unwrap();
    assert_eq!(status, UploadStatus::Unchanged);
    assert!(session.result().is_some());
}

#[tokio::test]
async fn new_upload_drops_result_even_if_next_classify_fails() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");
    session.upload(pdf("first.pdf", "a")).unwrap();
    session.classify().await.unwrap();

    session.upload(pdf("second.pdf", "b")).unwrap();
    backend.push(Err(BackendError::Fatal("model not found".into())));
    let err = session.classify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);
    assert!(session.result().is_none());
}

// ── Errors leave state untouched ─────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_upload_is_rejected_without_model_call() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");
    session.upload(pdf("cv.pdf", "a")).unwrap();
    session.classify().await.unwrap();
    let before = session.state().clone();

    let err = session
        .upload(Document::new("notes.docx", b"PK\x03\x04".to_vec()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(session.state(), &before);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn classify_without_document_fails() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");

    let err = session.classify().await.unwrap_err();
    assert!(matches!(err, ClassifyError::MissingDocument));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn missing_credential_is_reported_before_any_call() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let config = ClassifierConfig::builder()
        .api_key_env("CV2FIELD_TEST_KEY_THAT_IS_NEVER_SET")
        .build()
        .unwrap();
    let mut session = Session::new(config)
        .with_backend(backend.clone())
        .with_extractor(Arc::new(FakeExtractor {
            text: "text".into(),
        }));
    session.upload(pdf("cv.pdf", "a")).unwrap();

    let err = session.classify().await.unwrap_err();
    assert!(matches!(err, ClassifyError::MissingCredential { .. }));
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn extraction_failure_leaves_state_untouched() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");
    session.upload(pdf("broken.pdf", "a")).unwrap();
    let before = session.state().clone();

    let err = session.classify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert_eq!(session.state(), &before);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn whitespace_only_text_is_a_validation_error() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), " \n\t \r\n ");
    session.upload(pdf("scan.pdf", "a")).unwrap();

    let err = session.classify().await.unwrap_err();
    assert!(matches!(err, ClassifyError::EmptyText { .. }));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn unreadable_pdf_is_reported_as_empty_text() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = Session::new(config()).with_backend(backend.clone());
    session
        .upload(Document::new("scan.pdf", b"not really a pdf".to_vec()))
        .unwrap();

    let err = session.classify().await.unwrap_err();
    assert!(matches!(err, ClassifyError::EmptyText { .. }), "got: {err:?}");
    assert!(session.result().is_none());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn auth_rejection_keeps_result() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");
    session.upload(pdf("cv.pdf", "a")).unwrap();
    session.classify().await.unwrap();
    let before = fields(&session);

    backend.push(Err(BackendError::Auth("401 invalid api key".into())));
    let err = session.classify().await.unwrap_err();
    assert!(matches!(err, ClassifyError::AuthRejected { .. }));
    assert_eq!(fields(&session), before);
}

// ── Clear / remove ───────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_then_reclassify() {
    let backend = FakeBackend::replying(&[GOOD_REPLY, GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");
    session.upload(pdf("cv.pdf", "a")).unwrap();
    session.classify().await.unwrap();

    session.clear();
    assert!(session.result().is_none());
    assert!(session.document().is_some());

    session.classify().await.unwrap();
    assert!(session.result().is_some());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn remove_upload_disables_classification() {
    let backend = FakeBackend::replying(&[GOOD_REPLY]);
    let mut session = session_with(backend.clone(), "text");
    session.upload(pdf("cv.pdf", "a")).unwrap();
    session.classify().await.unwrap();

    session.remove_upload();
    assert!(session.result().is_none());
    let err = session.classify().await.unwrap_err();
    assert!(matches!(err, ClassifyError::MissingDocument));
    assert_eq!(backend.calls(), 1);
}

// ── Credential slot ──────────────────────────────────────────────────────────

#[tokio::test]
async fn builder_key_reaches_provider_environment() {
    const ENV: &str = "CV2FIELD_TEST_BUILDER_KEY";
    assert!(std::env::var(ENV).is_err());

    let config = ClassifierConfig::builder()
        .provider_name("cv2field-test-no-such-provider")
        .api_key_env(ENV)
        .api_key("gsk-from-builder")
        .max_retries(0)
        .build()
        .unwrap();
    let mut session = Session::new(config).with_extractor(Arc::new(FakeExtractor {
        text: "text".into(),
    }));
    session.upload(pdf("cv.pdf", "a")).unwrap();

    let outcome = session.classify().await;
    assert!(
        !matches!(outcome, Err(ClassifyError::MissingCredential { .. })),
        "got: {outcome:?}"
    );
    assert_eq!(std::env::var(ENV).as_deref(), Ok("gsk-from-builder"));
}
