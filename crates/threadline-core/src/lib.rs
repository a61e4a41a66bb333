//! Core types and error definitions for Threadline.
//!
//! This crate provides the types shared across all Threadline crates.
//!
//! # Main types
//!
//! - [`ThreadlineError`]: Unified error enum for every failure a chat request can hit.
//! - [`ThreadlineResult`]: Convenience alias for `Result<T, ThreadlineError>`.
//! - [`Role`]: Message author (user or assistant).
//! - [`Message`]: A single entry of a conversation thread.
//! - [`MessageContent`]: Plain text or the remote API's structured content blocks.
//! - [`DiagnosticLog`]: Timestamped, append-only error/status log.

/// Append-only diagnostic log file.
pub mod diagnostic;
/// Error types.
pub mod error;
/// Conversation message types.
pub mod message;

pub use diagnostic::DiagnosticLog;
pub use error::{ThreadlineError, ThreadlineResult};
pub use message::{Message, MessageContent, Role};

/// Longest thread identifier accepted from a client.
pub const MAX_THREAD_ID_LEN: usize = 128;

/// Returns true if `id` is safe to use as a thread identifier.
///
/// Thread ids arrive from a client-held cookie and end up in storage keys, so
/// only ASCII alphanumerics, `_` and `-` are allowed.
pub fn is_valid_thread_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_THREAD_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
