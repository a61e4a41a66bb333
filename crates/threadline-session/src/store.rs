use crate::backend::RecordBackend;
use crate::record::ConversationRecord;
use std::sync::Arc;
use threadline_core::{DiagnosticLog, Message, ThreadlineError, ThreadlineResult};
use tracing::{debug, error, warn};

/// Loads, reconciles and persists conversation records, one per thread.
pub struct ConversationStore {
    backend: Arc<dyn RecordBackend>,
    diagnostics: Arc<DiagnosticLog>,
}

impl ConversationStore {
    /// Store over `backend`, reporting problems to `diagnostics`.
    pub fn new(backend: Arc<dyn RecordBackend>, diagnostics: Arc<DiagnosticLog>) -> Self {
        Self {
            backend,
            diagnostics,
        }
    }

    /// Record for `thread_id`.
    ///
    /// Never fails: a missing record is empty, and an unreadable or corrupt
    /// one is logged and treated as empty.
    pub async fn load(&self, thread_id: &str) -> ConversationRecord {
        let data = match self.backend.load(thread_id).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!(thread_id, "No stored conversation");
                return ConversationRecord::empty(thread_id);
            }
            Err(e) => {
                warn!(thread_id, error = %e, "Failed to read conversation");
                self.diagnostics
                    .record(format!("Failed to read conversation {thread_id}: {e}"))
                    .await;
                return ConversationRecord::empty(thread_id);
            }
        };

        match serde_json::from_str::<ConversationRecord>(&data) {
            Ok(mut record) => {
                record.thread = thread_id.to_string();
                record
            }
            Err(e) => {
                warn!(thread_id, error = %e, "Corrupt conversation record, starting empty");
                self.diagnostics
                    .record(format!("Failed to decode conversation {thread_id}: {e}"))
                    .await;
                ConversationRecord::empty(thread_id)
            }
        }
    }

    /// Persists `record` under its thread id, replacing what was stored.
    pub async fn save(&self, record: &ConversationRecord) -> ThreadlineResult<()> {
        let json = serde_json::to_string(record)?;
        if let Err(e) = self.backend.save(&record.thread, &json).await {
            error!(thread_id = %record.thread, error = %e, "Failed to save conversation");
            self.diagnostics
                .record(format!("Failed to save conversation {}: {e}", record.thread))
                .await;
            return Err(if matches!(e, ThreadlineError::Persistence(_)) {
                e
            } else {
                ThreadlineError::Persistence(e.to_string())
            });
        }
        debug!(thread_id = %record.thread, messages = record.message_count(), "Conversation saved");
        Ok(())
    }

    /// Replaces the record's messages with the remote list (newest-first in,
    /// oldest-first stored).
    pub fn reconcile(
        &self,
        record: ConversationRecord,
        remote_newest_first: Vec<Message>,
    ) -> ConversationRecord {
        record.reconcile(remote_newest_first)
    }
}
