//! Configuration types for résumé classification.
//!
//! All classification behaviour is controlled through [`ClassifierConfig`],
//! built via its [`ClassifierConfigBuilder`]. Retry, backoff and timeout are
//! explicit fields rather than SDK defaults so a fake backend can exercise
//! them in tests.

use crate::error::ClassifyError;
use crate::i18n::Locale;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Provider used when none is configured.
pub const DEFAULT_PROVIDER: &str = "groq";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";

/// Environment variable holding the provider credential by default.
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Upper bound for the initial retry delay (one minute).
pub const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

/// Configuration for a classification session.
///
/// # Example
/// ```rust
/// use edgequake_cv2field::ClassifierConfig;
///
/// let config = ClassifierConfig::builder()
///     .model("llama-3.3-70b-versatile")
///     .max_retries(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.temperature, 0.0);
/// ```
#[derive(Clone)]
pub struct ClassifierConfig {
    /// LLM provider name passed to `ProviderFactory`. Default: `groq`.
    pub provider_name: String,

    /// Model identifier. Default: `deepseek-r1-distill-llama-70b`.
    pub model: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Environment variable the credential is read from. Default: `GROQ_API_KEY`.
    pub api_key_env: String,

    /// Credential supplied directly (CLI flag or interactive prompt).
    /// Overrides the environment variable when set.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.0, the most deterministic setting.
    pub temperature: f32,

    /// Output token cap. Default: `None` (no artificial cap); three short
    /// lines plus a reasoning trace must never be truncated.
    pub max_tokens: Option<usize>,

    /// Retries after the first attempt on a transient failure. Default: 2.
    ///
    /// Authentication and invalid-request errors are never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubling per retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-attempt timeout for the model call in seconds. Default: 60.
    ///
    /// A timed-out attempt counts as transient and is retried.
    pub api_timeout_secs: u64,

    /// Download timeout for documents given as URLs, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Custom system persona. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Language for user-facing messages. Default: Vietnamese.
    pub locale: Locale,

    /// Receives stage and retry events while a classification runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: None,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            system_prompt: None,
            locale: Locale::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("locale", &self.locale)
            .finish()
    }
}

impl ClassifierConfig {
    /// Create a new builder for `ClassifierConfig`.
    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder {
            config: Self::default(),
        }
    }

    /// The credential in effect right now, if any.
    ///
    /// An explicitly set key wins over the environment. Blank values count
    /// as absent.
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }

    /// Populate the credential slot for the rest of the process.
    ///
    /// The key is stored on the config and exported to `api_key_env`, which
    /// is where `ProviderFactory` looks when it builds the provider.
    pub fn set_api_key(&mut self, key: &str) {
        let key = key.trim();
        if key.is_empty() {
            return;
        }
        self.api_key = Some(key.to_string());
        self.export_api_key();
    }

    /// Copy an explicitly set key to `api_key_env`.
    ///
    /// Keys given through the builder live only on the config until this
    /// runs; the provider is built from the environment, so this must happen
    /// before `ProviderFactory` is asked for one. No-op without an explicit
    /// key.
    pub fn export_api_key(&self) {
        let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
            return;
        };
        if std::env::var(&self.api_key_env).as_deref() != Ok(key) {
            debug!("Exporting configured API key to {}", self.api_key_env);
            std::env::set_var(&self.api_key_env, key);
        }
    }
}

/// Builder for [`ClassifierConfig`].
#[derive(Debug)]
pub struct ClassifierConfigBuilder {
    config: ClassifierConfig,
}

impl ClassifierConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_key_env(mut self, name: impl Into<String>) -> Self {
        self.config.api_key_env = name.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: Option<usize>) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    /// Initial retry delay, capped at [`MAX_RETRY_BACKOFF_MS`].
    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms.min(MAX_RETRY_BACKOFF_MS);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.config.locale = locale;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClassifierConfig, ClassifyError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ClassifyError::InvalidConfig("model must not be empty".into()));
        }
        if c.provider.is_none() && c.provider_name.trim().is_empty() {
            return Err(ClassifyError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        if c.api_key_env.trim().is_empty() {
            return Err(ClassifyError::InvalidConfig(
                "credential environment variable name must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ClassifyError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_retries > 10 {
            return Err(ClassifyError::InvalidConfig(format!(
                "max retries must be ≤ 10, got {}",
                c.max_retries
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_deterministic_and_uncapped() {
        let c = ClassifierConfig::default();
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.max_tokens, None);
        assert_eq!(c.max_retries, 2);
        assert_eq!(c.api_key_env, "GROQ_API_KEY");
    }

    #[test]
    fn builder_rejects_empty_model() {
        let err = ClassifierConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(ClassifierConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn backoff_is_capped() {
        let c = ClassifierConfig::builder().retry_backoff_ms(u64::MAX).build().unwrap();
        assert_eq!(c.retry_backoff_ms, MAX_RETRY_BACKOFF_MS);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ClassifierConfig::builder().temperature(-1.0).build().unwrap();
        assert_eq!(c.temperature, 0.0);
    }

    #[test]
    fn explicit_key_wins_and_blank_is_absent() {
        let c = ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_NEVER_SET_A")
            .api_key("  ")
            .build()
            .unwrap();
        assert_eq!(c.effective_api_key(), None);

        let c = ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_NEVER_SET_A")
            .api_key(" sk-test ")
            .build()
            .unwrap();
        assert_eq!(c.effective_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn set_api_key_populates_env_slot() {
        let mut c = ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_SET_KEY_SLOT")
            .build()
            .unwrap();
        c.set_api_key("gsk-interactive");
        assert_eq!(c.effective_api_key().as_deref(), Some("gsk-interactive"));
        assert_eq!(
            std::env::var("CV2FIELD_TEST_SET_KEY_SLOT").as_deref(),
            Ok("gsk-interactive")
        );
    }

    #[test]
    fn builder_key_is_exported_on_demand() {
        let c = ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_EXPORT_SLOT")
            .api_key(" gsk-builder ")
            .build()
            .unwrap();
        assert!(std::env::var("CV2FIELD_TEST_EXPORT_SLOT").is_err());
        c.export_api_key();
        assert_eq!(
            std::env::var("CV2FIELD_TEST_EXPORT_SLOT").as_deref(),
            Ok("gsk-builder")
        );
    }

    #[test]
    fn export_without_explicit_key_is_noop() {
        let c = ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_EXPORT_NOOP")
            .build()
            .unwrap();
        c.export_api_key();
        assert!(std::env::var("CV2FIELD_TEST_EXPORT_NOOP").is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let c = ClassifierConfig::builder()
            .api_key_env("CV2FIELD_TEST_NEVER_SET_B")
            .api_key("secret-value")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-value"));
        assert!(dbg.contains("<redacted>"));
    }
}
