use serde::{Deserialize, Serialize};
use threadline_core::Message;

/// Local copy of one thread's messages, stored oldest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Remote thread id; empty when there is no session yet.
    pub thread: String,
    /// Messages, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationRecord {
    /// A record with no messages.
    pub fn empty(thread: impl Into<String>) -> Self {
        Self {
            thread: thread.into(),
            messages: Vec::new(),
        }
    }

    /// Replaces the local messages with the remote canonical list.
    ///
    /// `remote_newest_first` is in server order; it is reversed so the record
    /// stays oldest-first. Local-only messages are dropped.
    pub fn reconcile(mut self, remote_newest_first: Vec<Message>) -> Self {
        self.messages = remote_newest_first;
        self.messages.reverse();
        self
    }

    /// Copy with messages newest-first, the order responses use.
    pub fn newest_first(&self) -> Self {
        Self {
            thread: self.thread.clone(),
            messages: self.messages.iter().rev().cloned().collect(),
        }
    }

    /// Number of messages.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}
