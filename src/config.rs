use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "context-distiller";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Large-context model used for distillation.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Env vars consulted by `DistillerConfig::from_env`, in priority order for the key.
const API_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];
const MODEL_VAR: &str = "DISTILLER_MODEL";
const BASE_URL_VAR: &str = "DISTILLER_BASE_URL";
const POLL_TIMEOUT_VAR: &str = "DISTILLER_POLL_TIMEOUT_SECS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "warn,context_distiller=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No API key configured (set GOOGLE_API_KEY or GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

// ═══════════════════════════════════════════════════════════
// Policies
// ═══════════════════════════════════════════════════════════

/// How the media uploader waits for remote processing to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two status checks.
    pub interval: Duration,
    /// Upper bound on the total time spent polling one media item.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// Bounded retry with exponential backoff for transient backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff to sleep before attempt number `attempt` (1-based, > 1).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Distiller configuration
// ═══════════════════════════════════════════════════════════

/// Explicit configuration for the backend client and the media uploader.
///
/// Built once by the caller and handed to constructors; the pipeline never
/// reads credentials or model settings from process state on its own.
#[derive(Clone)]
pub struct DistillerConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Per-HTTP-request timeout. Generation over a large payload is slow.
    pub request_timeout: Duration,
    pub poll: PollPolicy,
    pub retry: RetryPolicy,
}

impl DistillerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(600),
            poll: PollPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build a config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env`, with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|var| lookup(var))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(url) = lookup(BASE_URL_VAR).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(POLL_TIMEOUT_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: POLL_TIMEOUT_VAR,
                value: raw.clone(),
            })?;
            config.poll.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

impl fmt::Debug for DistillerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistillerConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("poll", &self.poll)
            .field("retry", &self.retry)
            .finish()
    }
}
