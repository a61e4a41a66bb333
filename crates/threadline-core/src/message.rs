use serde::{Deserialize, Serialize};

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The remote assistant.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parses a wire role name. Roles other than user/assistant yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body: either plain text or the structured content blocks returned
/// by the assistant API, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Structured content (typically an array of typed blocks).
    Structured(serde_json::Value),
}

impl MessageContent {
    /// Best-effort plain-text rendering.
    ///
    /// Structured arrays contribute their `text` blocks, whether the block
    /// carries `{"text": {"value": ...}}` or `{"text": "..."}`.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Structured(value) => {
                let blocks = match value.as_array() {
                    Some(blocks) => blocks,
                    None => return value.as_str().unwrap_or_default().to_string(),
                };
                blocks
                    .iter()
                    .filter_map(|block| {
                        let text = &block["text"];
                        text["value"].as_str().or_else(|| text.as_str())
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

/// A single message of a conversation thread. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The message body.
    pub content: MessageContent,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.text(), "Hello");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn test_structured_content_text() {
        let content = MessageContent::Structured(json!([
            {"type": "text", "text": {"value": "Hi there", "annotations": []}},
            {"type": "image_file", "image_file": {"file_id": "file_1"}},
            {"type": "text", "text": "second"}
        ]));
        assert_eq!(content.text(), "Hi there\nsecond");
    }

    #[test]
    fn test_content_untagged_serialization() {
        let text = serde_json::to_value(Message::assistant("plain")).unwrap();
        assert_eq!(text, json!({"role": "assistant", "content": "plain"}));

        let raw = json!({"role": "user", "content": [{"type": "text", "text": {"value": "x"}}]});
        let parsed: Message = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(parsed.content, MessageContent::Structured(_)));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }
}
