use crate::chat::{get_chat, post_chat};
use crate::cookie::SessionConfig;
use axum::{response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use threadline_assistant::{AssistantApi, RunOrchestrator};
use threadline_core::DiagnosticLog;
use threadline_session::ConversationStore;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    /// Remote conversation client.
    pub api: Arc<dyn AssistantApi>,
    /// Drives runs to completion.
    pub orchestrator: Arc<RunOrchestrator>,
    /// Local conversation records.
    pub store: Arc<ConversationStore>,
    /// Diagnostic log for request failures.
    pub diagnostics: Arc<DiagnosticLog>,
    /// Session cookie settings.
    pub session: SessionConfig,
}

/// The chat HTTP server.
pub struct ChatServer;

impl ChatServer {
    /// Router serving `/chat` and `/health`.
    pub fn build(state: AppState) -> Router {
        Router::new()
            .route("/chat", get(get_chat).post(post_chat))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(state))
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "threadline"}))
}
