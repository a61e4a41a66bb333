use serde::Deserialize;
use std::path::{Path, PathBuf};
use threadline_assistant::{AssistantConfig, PollPolicy};
use threadline_core::ThreadlineResult;
use threadline_gateway::SessionConfig;

/// Environment variable consulted when `assistant.api_key` is empty.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable consulted when `assistant.assistant_id` is empty.
pub const ASSISTANT_ID_ENV: &str = "THREADLINE_ASSISTANT_ID";

/// Contents of `threadline.toml`.
#[derive(Debug, Deserialize)]
pub struct ThreadlineConfig {
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub polling: PollPolicy,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Diagnostic log location; defaults to `<data_dir>/log.txt`.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl ThreadlineConfig {
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Fills empty credentials from `lookup` (normally the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.assistant.api_key.trim().is_empty() {
            if let Some(key) = lookup(API_KEY_ENV) {
                self.assistant.api_key = key;
            }
        }
        if self.assistant.assistant_id.trim().is_empty() {
            if let Some(id) = lookup(ASSISTANT_ID_ENV) {
                self.assistant.assistant_id = id;
            }
        }
    }

    pub fn validate(&self) -> ThreadlineResult<()> {
        self.assistant.validate()?;
        self.polling.validate()
    }

    /// Directory holding one record file per thread.
    pub fn threads_dir(&self) -> PathBuf {
        self.data_dir.join("threads")
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("log.txt"))
    }

    /// Resolves relative data paths against the config file's directory.
    pub fn rebase(&mut self, base: &Path) {
        if self.data_dir.is_relative() {
            self.data_dir = base.join(&self.data_dir);
        }
        if let Some(log) = &self.log_file {
            if log.is_relative() {
                self.log_file = Some(base.join(log));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        data_dir = "/var/lib/threadline"

        [assistant]
        api_key = "sk-file"
        assistant_id = "asst_1"
        api_base_url = "http://localhost:9000"

        [polling]
        interval_ms = 250
        max_attempts = 20

        [server]
        port = 8080

        [session]
        cookie_name = "thread"
        max_age_days = 7
    "#;

    #[test]
    fn parses_full_config() {
        let config = ThreadlineConfig::from_toml(FULL).unwrap();
        assert_eq!(config.assistant.base_url(), "http://localhost:9000");
        assert_eq!(config.polling.max_attempts, 20);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.cookie_name, "thread");
        assert_eq!(config.threads_dir(), PathBuf::from("/var/lib/threadline/threads"));
        assert_eq!(config.log_path(), PathBuf::from("/var/lib/threadline/log.txt"));
        config.validate().unwrap();
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = ThreadlineConfig::from_toml(
            r#"
            [assistant]
            api_key = "sk"
            assistant_id = "asst_1"
            "#,
        )
        .unwrap();
        assert_eq!(config.polling, PollPolicy::default());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.session.max_age_days, 30);
        assert_eq!(config.assistant.beta_header, "assistants=v2");
    }

    #[test]
    fn env_fills_missing_credentials_only() {
        let mut config = ThreadlineConfig::from_toml(
            r#"
            [assistant]
            assistant_id = "asst_file"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        config.apply_env(|name| match name {
            API_KEY_ENV => Some("sk-env".to_string()),
            ASSISTANT_ID_ENV => Some("asst_env".to_string()),
            _ => None,
        });
        assert_eq!(config.assistant.api_key, "sk-env");
        assert_eq!(config.assistant.assistant_id, "asst_file");
        config.validate().unwrap();
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = ThreadlineConfig::from_toml(FULL).unwrap();
        config.polling.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rebase_relative_paths() {
        let mut config = ThreadlineConfig::from_toml(
            r#"
            log_file = "logs/chat.log"
            [assistant]
            assistant_id = "asst_1"
            "#,
        )
        .unwrap();
        config.rebase(Path::new("/etc/threadline"));
        assert_eq!(config.data_dir, PathBuf::from("/etc/threadline/./data"));
        assert_eq!(config.log_path(), PathBuf::from("/etc/threadline/logs/chat.log"));
    }
}
