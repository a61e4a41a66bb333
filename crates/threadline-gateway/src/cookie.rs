use axum::http::{header::COOKIE, HeaderMap};
use serde::{Deserialize, Serialize};
use threadline_core::is_valid_thread_id;
use tracing::warn;

/// How the session identifier is kept on the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cookie holding the thread id.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Cookie lifetime.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// Adds the `Secure` attribute (HTTPS deployments).
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_name() -> String {
    "chat_thread".to_string()
}

fn default_max_age_days() -> u32 {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            max_age_days: default_max_age_days(),
            secure: false,
        }
    }
}

impl SessionConfig {
    /// Thread id carried by the request's session cookie.
    ///
    /// Values that are not valid thread ids are ignored, so the request is
    /// treated as having no session.
    pub fn thread_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.trim())?;

        if value.is_empty() {
            return None;
        }
        if !is_valid_thread_id(value) {
            warn!(cookie = %self.cookie_name, "Ignoring malformed session cookie");
            return None;
        }
        Some(value.to_string())
    }

    /// `Set-Cookie` value binding the client to `thread_id`.
    pub fn set_cookie(&self, thread_id: &str) -> String {
        let max_age = u64::from(self.max_age_days) * 24 * 60 * 60;
        let secure = if self.secure { " Secure;" } else { "" };
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax;{} Max-Age={}",
            self.cookie_name, thread_id, secure, max_age
        )
    }
}
