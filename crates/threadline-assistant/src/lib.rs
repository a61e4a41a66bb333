//! Remote conversation client and run orchestration for Threadline.
//!
//! [`AssistantApi`] is the seam to the stateful assistant API (threads,
//! messages, runs); [`HttpAssistantClient`] implements it over HTTP.
//! [`RunOrchestrator`] starts a run and polls it to a terminal state.

pub mod api;
pub mod config;
pub mod http;
pub mod run;

pub use api::{AssistantApi, MessageReceipt, RunSnapshot, RunStatus};
pub use config::{AssistantConfig, PollPolicy};
pub use http::{HttpAssistantClient, MAX_LIST_PAGES};
pub use run::{RunOrchestrator, RunPhase, RunReport};
