//! Local mirror of remote conversations.
//!
//! A [`ConversationRecord`] per thread, persisted through a keyed
//! [`RecordBackend`] and managed by [`ConversationStore`].

pub mod backend;
pub mod record;
pub mod store;

pub use backend::{FileRecordBackend, MemoryRecordBackend, RecordBackend};
pub use record::ConversationRecord;
pub use store::ConversationStore;
