use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadline_core::{ThreadlineError, ThreadlineResult};

/// Name of the header the Assistants API requires on every call.
pub const BETA_HEADER_NAME: &str = "OpenAI-Beta";

/// Connection settings for the remote assistant API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Bearer token. May be left empty in the config file and supplied through the environment.
    #[serde(default)]
    pub api_key: String,
    /// Assistant every run is scoped to.
    pub assistant_id: String,
    /// Overrides the default `https://api.openai.com`.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Value sent in the [`BETA_HEADER_NAME`] header.
    #[serde(default = "default_beta_header")]
    pub beta_header: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_beta_header() -> String {
    "assistants=v2".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl AssistantConfig {
    /// Config with defaults for everything but the credentials.
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            api_base_url: None,
            beta_header: default_beta_header(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// API root without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/')
    }

    /// Rejects configs that cannot authenticate or start runs.
    pub fn validate(&self) -> ThreadlineResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ThreadlineError::Config("assistant.api_key is empty".into()));
        }
        if self.assistant_id.trim().is_empty() {
            return Err(ThreadlineError::Config(
                "assistant.assistant_id is empty".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ThreadlineError::Config(
                "assistant.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fixed-interval polling policy for run completion.
///
/// The worst-case wait is `interval * max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay before each status query, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum number of status queries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    10
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollPolicy {
    /// Delay before each status query.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// A policy must allow at least one status query.
    pub fn validate(&self) -> ThreadlineResult<()> {
        if self.max_attempts == 0 {
            return Err(ThreadlineError::Config(
                "polling.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
