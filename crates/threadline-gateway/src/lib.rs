//! HTTP boundary of Threadline.
//!
//! `GET /chat` returns the stored conversation and `POST /chat` submits a
//! message, runs the assistant and returns the reconciled conversation. Both
//! answer newest-first and every failure becomes `{"error": ...}`.

pub mod chat;
pub mod cookie;
pub mod server;

pub use cookie::SessionConfig;
pub use server::{AppState, ChatServer};
