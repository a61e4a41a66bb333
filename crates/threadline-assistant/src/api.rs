use async_trait::async_trait;
use serde_json::Value;
use threadline_core::{Message, MessageContent, Role, ThreadlineError, ThreadlineResult};
use tracing::debug;

/// Status of a remote run as reported by the assistant API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Waiting to be picked up.
    Queued,
    /// Being processed.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Any other value, including a missing status field (empty string).
    Other(String),
}

impl RunStatus {
    /// Maps a wire status string.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            other => RunStatus::Other(other.to_string()),
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Other(s) => s,
        }
    }
}

/// One status query result.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    /// Parsed status.
    pub status: RunStatus,
    /// Full response body, kept for logging.
    pub raw: Value,
}

/// Confirmation returned when a message is appended to a thread.
#[derive(Debug, Clone)]
pub struct MessageReceipt {
    /// Remote message id.
    pub id: String,
    /// Full response body.
    pub raw: Value,
}

/// Operations against the remote, thread-based assistant API.
///
/// Implementations perform no retries: a single failure is returned to the
/// caller as [`ThreadlineError::RemoteUnavailable`] (transport) or
/// [`ThreadlineError::RemoteProtocol`] (unexpected response).
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Creates a thread seeded with one user message. Returns the thread id.
    async fn create_conversation(&self, initial_message: &str) -> ThreadlineResult<String>;

    /// Appends a message to an existing thread.
    async fn append_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> ThreadlineResult<MessageReceipt>;

    /// Starts a run of `assistant_id` on the thread. Returns the run id.
    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> ThreadlineResult<String>;

    /// Fetches the current status of a run.
    async fn get_run_status(&self, thread_id: &str, run_id: &str) -> ThreadlineResult<RunSnapshot>;

    /// Lists the thread's messages in server order (newest first).
    async fn list_messages(&self, thread_id: &str) -> ThreadlineResult<Vec<Message>>;
}

/// Extracts the `id` field of a create/append/run response.
pub fn parse_id(op: &str, body: &Value) -> ThreadlineResult<String> {
    body["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ThreadlineError::RemoteProtocol(format!("{op}: response has no id: {body}")))
}

/// Parses a run object. A missing `status` maps to `RunStatus::Other("")`.
///
/// A body without a run id is a protocol error, like every other response.
pub fn parse_run_snapshot(body: Value) -> ThreadlineResult<RunSnapshot> {
    parse_id("get_run_status", &body)?;
    let status = RunStatus::from_wire(body["status"].as_str().unwrap_or_default());
    Ok(RunSnapshot { status, raw: body })
}

/// Parses one page of a message listing, preserving server order.
///
/// Entries without a role or content, or with a role other than user and
/// assistant, are skipped.
pub fn parse_message_page(body: &Value) -> ThreadlineResult<Vec<Message>> {
    let data = body["data"].as_array().ok_or_else(|| {
        ThreadlineError::RemoteProtocol(format!("list_messages: response has no data array: {body}"))
    })?;

    let messages = data
        .iter()
        .filter_map(|entry| {
            let role = entry["role"].as_str().and_then(Role::parse);
            let content = entry.get("content").filter(|c| !c.is_null());
            match (role, content) {
                (Some(role), Some(content)) => Some(Message::new(role, content_from_wire(content))),
                _ => {
                    debug!(entry = %entry, "Skipping message without usable role/content");
                    None
                }
            }
        })
        .collect();
    Ok(messages)
}

fn content_from_wire(content: &Value) -> MessageContent {
    match content.as_str() {
        Some(text) => MessageContent::Text(text.to_string()),
        None => MessageContent::Structured(content.clone()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("start_run", &json!({"id": "run_1"})).unwrap(), "run_1");

        let err = parse_id("start_run", &json!({"error": {"message": "bad"}})).unwrap_err();
        assert!(matches!(err, ThreadlineError::RemoteProtocol(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_run_status_mapping() {
        assert_eq!(RunStatus::from_wire("completed"), RunStatus::Completed);
        assert_eq!(RunStatus::from_wire("in_progress"), RunStatus::InProgress);
        assert_eq!(
            RunStatus::from_wire("requires_action"),
            RunStatus::Other("requires_action".into())
        );
        assert_eq!(RunStatus::Other("expired".into()).as_str(), "expired");
    }

    #[test]
    fn test_missing_status_is_not_terminal() {
        let snapshot = parse_run_snapshot(json!({"id": "run_1"})).unwrap();
        assert_eq!(snapshot.status, RunStatus::Other(String::new()));
        assert!(parse_run_snapshot(json!("oops")).is_err());
    }

    #[test]
    fn test_run_snapshot_requires_id() {
        for body in [json!({}), json!({"status": "in_progress"}), json!({"id": ""})] {
            let err = parse_run_snapshot(body).unwrap_err();
            assert!(matches!(err, ThreadlineError::RemoteProtocol(_)));
        }
    }

    #[test]
    fn test_parse_message_page_skips_incomplete_entries() {
        let body = json!({
            "object": "list",
            "data": [
                {"id": "m3", "role": "assistant", "content": [{"type": "text", "text": {"value": "Hi!"}}]},
                {"id": "m2", "role": "user"},
                {"id": "m1", "role": "user", "content": "Hello"}
            ]
        });
        let messages = parse_message_page(&body).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content.text(), "Hi!");
        assert_eq!(messages[1], Message::user("Hello"));
    }

    #[test]
    fn test_parse_message_page_requires_data() {
        let err = parse_message_page(&json!({"object": "list"})).unwrap_err();
        assert!(matches!(err, ThreadlineError::RemoteProtocol(_)));
    }
}
