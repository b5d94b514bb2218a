//! Model interaction: send the classification prompt and return raw text.
//!
//! [`ClassificationClient`] owns the retry/timeout policy. It talks to the
//! provider through the narrow [`ChatBackend`] trait so the policy can be
//! exercised against a fake in tests. [`ProviderBackend`] is the production
//! implementation over an `edgequake_llm::LLMProvider`.
//!
//! ## Retry Strategy
//!
//! Transient failures (network, timeout, 429, 5xx) are retried with
//! exponential backoff (`retry_backoff_ms * 2^(retry-1)`); with the default
//! 500 ms base and 2 retries the waits are 500 ms then 1 s. Authentication
//! and invalid-request failures are returned immediately.

use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// One `(system, human)` exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

/// Failure reported by a [`ChatBackend`], already sorted by retryability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Worth retrying: network blip, rate limit, 5xx, timeout.
    Transient(String),
    /// The credential was rejected. Never retried.
    Auth(String),
    /// The request itself is wrong (bad model, 4xx). Never retried.
    Fatal(String),
}

/// Narrow seam between the client and a chat-completion provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Run one chat completion and return the generated text.
    async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError>;
}

/// [`ChatBackend`] over an `edgequake_llm` provider.
pub struct ProviderBackend {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }

    /// Build the backend the config describes.
    ///
    /// A pre-built provider is used as-is; otherwise the named provider is
    /// created through `ProviderFactory`, which reads its key from the
    /// environment. Call this only after the credential check.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        if let Some(ref provider) = config.provider {
            return Ok(Self::new(config.provider_name.clone(), Arc::clone(provider)));
        }

        config.export_api_key();
        let provider = ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
            .map_err(|e| ClassifyError::ProviderNotConfigured {
                provider: config.provider_name.clone(),
                hint: format!("{e}"),
            })?;
        Ok(Self::new(config.provider_name.clone(), provider))
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: request.max_tokens,
            ..Default::default()
        };

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    self.name, response.prompt_tokens, response.completion_tokens
                );
                Ok(response.content)
            }
            Err(e) => Err(classify_provider_error(&e.to_string())),
        }
    }
}

static RE_HTTP_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s(\[:=])([45]\d{2})(?:$|[\s)\],:.;])").unwrap());

/// Sort a provider error message into a [`BackendError`].
///
/// Providers report status codes inside free-form messages. The first
/// standalone 4xx/5xx token decides; numbers embedded in longer tokens
/// (token counts, request ids) are ignored. Without a status code, a few
/// well-known phrases are checked, fatal ones before transient ones.
/// Anything unrecognised is treated as transient.
pub fn classify_provider_error(message: &str) -> BackendError {
    let status = RE_HTTP_STATUS
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok());

    if let Some(code) = status {
        return match code {
            401 | 403 => BackendError::Auth(message.to_string()),
            408 | 429 => BackendError::Transient(message.to_string()),
            400..=499 => BackendError::Fatal(message.to_string()),
            _ => BackendError::Transient(message.to_string()),
        };
    }

    let lower = message.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["unauthorized", "forbidden", "invalid api key", "invalid_api_key", "incorrect api key"]) {
        BackendError::Auth(message.to_string())
    } else if has(&["invalid request", "invalid_request", "model not found", "model_not_found", "not supported", "content_filter"]) {
        BackendError::Fatal(message.to_string())
    } else {
        BackendError::Transient(message.to_string())
    }
}

/// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
/// saturating instead of overflowing.
pub fn backoff_delay_ms(base_ms: u64, retry: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(retry.saturating_sub(1)))
}

static RE_THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?(?:</think>|\z)").unwrap());

/// Remove `<think>…</think>` reasoning traces emitted by reasoning models.
///
/// An unterminated block swallows the rest of the text: the answer never
/// came, so nothing after the tag is usable.
pub fn strip_reasoning(text: &str) -> String {
    RE_THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Sends classification prompts with retry, backoff and timeout.
///
/// The backend is resolved on every call, after the credential check, so a
/// key entered mid-session takes effect on the next classification and a
/// missing key never leads to a network call.
pub struct ClassificationClient {
    config: ClassifierConfig,
    backend: Option<Arc<dyn ChatBackend>>,
}

impl ClassificationClient {
    /// Client whose backend is built from `config` at call time.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    /// Client with an injected backend (fakes, custom middleware).
    pub fn with_backend(config: ClassifierConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ClassifierConfig {
        &mut self.config
    }

    /// Send `prompt` and return the model's answer text.
    ///
    /// # Errors
    /// - [`ClassifyError::MissingCredential`] before any network activity
    ///   when no key is configured
    /// - [`ClassifyError::AuthRejected`] when the provider refuses the key
    /// - [`ClassifyError::ProviderError`] on a fatal status or when retries
    ///   are exhausted
    /// - [`ClassifyError::EmptyResponse`] when no usable text came back
    pub async fn classify(&self, prompt: &str) -> Result<String, ClassifyError> {
        let config = &self.config;
        if config.effective_api_key().is_none() {
            return Err(ClassifyError::MissingCredential {
                env_var: config.api_key_env.clone(),
            });
        }

        let backend: Arc<dyn ChatBackend> = match self.backend {
            Some(ref b) => Arc::clone(b),
            None => Arc::new(ProviderBackend::from_config(config)?),
        };

        let request = ChatRequest {
            system: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            user: prompt.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let start = Instant::now();
        let raw = self.call_with_retry(backend.as_ref(), &request).await?;
        info!(
            "{} answered in {}ms ({} chars)",
            backend.name(),
            start.elapsed().as_millis(),
            raw.len()
        );

        let text = strip_reasoning(&raw);
        if text.is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }
        Ok(text)
    }

    async fn call_with_retry(
        &self,
        backend: &dyn ChatBackend,
        request: &ChatRequest,
    ) -> Result<String, ClassifyError> {
        let config = &self.config;
        let per_call = Duration::from_secs(config.api_timeout_secs);
        let mut last_err: Option<String> = None;

        for attempt in 0..=config.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay_ms(config.retry_backoff_ms, attempt);
                let reason = last_err.as_deref().unwrap_or("unknown error");
                warn!(
                    "retry {}/{} after {}ms",
                    attempt, config.max_retries, backoff
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_retry(attempt, config.max_retries, backoff, reason);
                }
                sleep(Duration::from_millis(backoff)).await;
            }

            let outcome = match timeout(per_call, backend.chat(request)).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Transient(format!(
                    "timed out after {}s",
                    config.api_timeout_secs
                ))),
            };

            match outcome {
                Ok(text) => return Ok(text),
                Err(BackendError::Auth(detail)) => {
                    return Err(ClassifyError::AuthRejected {
                        provider: backend.name().to_string(),
                        detail,
                    });
                }
                Err(BackendError::Fatal(detail)) => {
                    return Err(ClassifyError::ProviderError {
                        attempts: attempt + 1,
                        detail,
                    });
                }
                Err(BackendError::Transient(detail)) => {
                    warn!("attempt {} failed: {}", attempt + 1, detail);
                    last_err = Some(detail);
                }
            }
        }

        Err(ClassifyError::ProviderError {
            attempts: config.max_retries + 1,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results and counts calls.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, BackendError>>>,
        calls: AtomicU32,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Transient("script exhausted".into())))
        }
    }

    /// Never answers; used to exercise the per-attempt timeout.
    struct Hanging;

    #[async_trait]
    impl ChatBackend for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<String, BackendError> {
            sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_NEVER_SET_LLM")
            .api_key("test-key")
            .retry_backoff_ms(0)
            .build()
            .unwrap()
    }

    #[test]
    fn error_classification() {
        assert!(matches!(classify_provider_error("HTTP 401 Unauthorized"), BackendError::Auth(_)));
        assert!(matches!(classify_provider_error("429 rate limit"), BackendError::Transient(_)));
        assert!(matches!(classify_provider_error("503 Service Unavailable"), BackendError::Transient(_)));
        assert!(matches!(classify_provider_error("400 invalid request"), BackendError::Fatal(_)));
        assert!(matches!(classify_provider_error("something odd"), BackendError::Transient(_)));
    }

    #[test]
    fn client_errors_win_over_server_looking_numbers() {
        let msg = "400 Bad Request: prompt is 8500 tokens, limit is 6000";
        assert!(matches!(classify_provider_error(msg), BackendError::Fatal(_)));

        let msg = "status: 404, model 'x' does not exist (req_5030403)";
        assert!(matches!(classify_provider_error(msg), BackendError::Fatal(_)));
    }

    #[test]
    fn auth_needs_a_real_status_or_phrase() {
        let msg = "upstream error (request id 7f403a1c-authentication-svc)";
        assert!(matches!(classify_provider_error(msg), BackendError::Transient(_)));
        assert!(matches!(
            classify_provider_error("Error: Invalid API Key"),
            BackendError::Auth(_)
        ));
    }

    #[tokio::test]
    async fn oversized_prompt_is_not_retried() {
        let backend = Scripted::new(vec![
            Err(classify_provider_error("400 Bad Request: prompt is 8500 tokens")),
            Ok("never reached".into()),
        ]);
        let client = ClassificationClient::with_backend(config(), backend.clone());

        let err = client.classify("PROMPT").await.unwrap_err();
        assert!(matches!(err, ClassifyError::ProviderError { attempts: 1, .. }), "got {err:?}");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 2), 1000);
        assert_eq!(backoff_delay_ms(500, 3), 2000);
        assert_eq!(backoff_delay_ms(u64::MAX / 2, 3), u64::MAX);
        assert_eq!(backoff_delay_ms(u64::MAX, 10), u64::MAX);
    }

    #[test]
    fn strips_reasoning_blocks() {
        assert_eq!(
            strip_reasoning("<think>hmm\nlet me see</think>\n\nKết quả:\n1. A"),
            "Kết quả:\n1. A"
        );
        assert_eq!(strip_reasoning("<think>never closed"), "");
        assert_eq!(strip_reasoning("  plain  "), "plain");
    }

    #[tokio::test]
    async fn sends_system_then_prompt_deterministically() {
        let backend = Scripted::new(vec![Ok("1. A\n2. B\n3. C".into())]);
        let client = ClassificationClient::with_backend(config(), backend.clone());

        let text = client.classify("PROMPT").await.unwrap();
        assert_eq!(text, "1. A\n2. B\n3. C");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(seen[0].user, "PROMPT");
        assert_eq!(seen[0].temperature, 0.0);
        assert_eq!(seen[0].max_tokens, None);
    }

    #[tokio::test]
    async fn missing_credential_makes_no_call() {
        let backend = Scripted::new(vec![Ok("x".into())]);
        let cfg = ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_NEVER_SET_LLM")
            .build()
            .unwrap();
        let client = ClassificationClient::with_backend(cfg, backend.clone());

        let err = client.classify("PROMPT").await.unwrap_err();
        assert!(matches!(err, ClassifyError::MissingCredential { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_up_to_bound() {
        let backend = Scripted::new(vec![
            Err(BackendError::Transient("503".into())),
            Err(BackendError::Transient("503".into())),
            Err(BackendError::Transient("503".into())),
            Ok("never reached".into()),
        ]);
        let client = ClassificationClient::with_backend(config(), backend.clone());

        let err = client.classify("PROMPT").await.unwrap_err();
        assert!(matches!(err, ClassifyError::ProviderError { attempts: 3, .. }), "got {err:?}");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_transient_error() {
        let backend = Scripted::new(vec![
            Err(BackendError::Transient("connection reset".into())),
            Ok("1. A\n2. B\n3. C".into()),
        ]);
        let client = ClassificationClient::with_backend(config(), backend.clone());

        assert!(client.classify("PROMPT").await.is_ok());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let backend = Scripted::new(vec![Err(BackendError::Auth("401".into()))]);
        let client = ClassificationClient::with_backend(config(), backend.clone());

        let err = client.classify("PROMPT").await.unwrap_err();
        assert!(matches!(err, ClassifyError::AuthRejected { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let backend = Scripted::new(vec![Err(BackendError::Fatal("404 model not found".into()))]);
        let client = ClassificationClient::with_backend(config(), backend.clone());

        let err = client.classify("PROMPT").await.unwrap_err();
        assert!(matches!(err, ClassifyError::ProviderError { attempts: 1, .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_or_reasoning_only_reply_is_empty_response() {
        let backend = Scripted::new(vec![Ok("<think>...</think>\n  ".into())]);
        let client = ClassificationClient::with_backend(config(), backend);

        let err = client.classify("PROMPT").await.unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyResponse));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_transient() {
        let cfg = ClassifierConfig::builder()
            .api_key("test-key")
            .api_key_env("CV2FIELD_TEST_NEVER_SET_LLM")
            .api_timeout_secs(1)
            .max_retries(1)
            .retry_backoff_ms(0)
            .build()
            .unwrap();
        let client = ClassificationClient::with_backend(cfg, Arc::new(Hanging));

        let err = client.classify("PROMPT").await.unwrap_err();
        match err {
            ClassifyError::ProviderError { attempts, detail } => {
                assert_eq!(attempts, 2);
                assert!(detail.contains("timed out"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
