use crate::server::AppState;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        HeaderMap,
    },
    response::{AppendHeaders, IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use threadline_core::{Role, ThreadlineError};
use threadline_session::ConversationRecord;
use tracing::{error, info, warn};

/// The `message` field of a chat submission.
///
/// Accepts `application/x-www-form-urlencoded` and `multipart/form-data`.
/// Anything unreadable yields `message: None`, which the handler reports as
/// an empty message.
#[derive(Debug, Default)]
pub struct ChatForm {
    /// Raw, untrimmed field value.
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct MessageField {
    message: Option<String>,
}

impl<S> FromRequest<S> for ChatForm
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let message = if is_multipart {
            read_multipart_message(req, state).await
        } else {
            Form::<MessageField>::from_request(req, state)
                .await
                .ok()
                .and_then(|Form(field)| field.message)
        };
        Ok(Self { message })
    }
}

async fn read_multipart_message<S: Send + Sync>(req: Request, state: &S) -> Option<String> {
    let mut multipart = Multipart::from_request(req, state).await.ok()?;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("message") {
            return field.text().await.ok();
        }
    }
    None
}

/// A failed chat step: the generic text shown to the client and the cause
/// kept for the logs.
struct ChatFailure {
    public: &'static str,
    cause: ThreadlineError,
}

impl ChatFailure {
    fn at(public: &'static str) -> impl FnOnce(ThreadlineError) -> ChatFailure {
        move |cause| ChatFailure { public, cause }
    }
}

fn error_body(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message }))
}

/// `GET /chat`: the stored conversation, newest first.
pub async fn get_chat(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let record = match state.session.thread_from_headers(&headers) {
        Some(thread_id) => state.store.load(&thread_id).await.newest_first(),
        None => ConversationRecord::empty(""),
    };
    Json(record).into_response()
}

/// `POST /chat`: submit a message and return the updated conversation.
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: ChatForm,
) -> Response {
    let message = form.message.as_deref().unwrap_or_default().trim();
    if message.is_empty() {
        state.diagnostics.record("Empty message submitted").await;
        return error_body(&ThreadlineError::EmptyInput.to_string()).into_response();
    }

    let existing = state.session.thread_from_headers(&headers);
    let thread_id = match open_thread(&state, existing.as_deref(), message).await {
        Ok(thread_id) => thread_id,
        Err(failure) => return fail(&state, None, failure).await.into_response(),
    };

    // A new thread's cookie is set even when a later step fails.
    let new_cookie = existing
        .is_none()
        .then(|| (SET_COOKIE, state.session.set_cookie(&thread_id)));

    match complete_turn(&state, &thread_id).await {
        Ok(record) => {
            info!(thread_id = %thread_id, messages = record.message_count(), "Chat turn completed");
            (AppendHeaders(new_cookie), Json(record.newest_first())).into_response()
        }
        Err(failure) => {
            let body = fail(&state, Some(&thread_id), failure).await;
            (AppendHeaders(new_cookie), body).into_response()
        }
    }
}

/// Creates a thread seeded with `message`, or appends `message` to `existing`.
async fn open_thread(
    state: &AppState,
    existing: Option<&str>,
    message: &str,
) -> Result<String, ChatFailure> {
    match existing {
        Some(thread_id) => {
            state
                .api
                .append_message(thread_id, Role::User, message)
                .await
                .map_err(ChatFailure::at("Failed to append message"))?;
            Ok(thread_id.to_string())
        }
        None => {
            let thread_id = state
                .api
                .create_conversation(message)
                .await
                .map_err(ChatFailure::at("Failed to create conversation"))?;
            info!(thread_id = %thread_id, "Conversation created");
            Ok(thread_id)
        }
    }
}

/// Runs the assistant, then reconciles and persists the canonical history.
async fn complete_turn(state: &AppState, thread_id: &str) -> Result<ConversationRecord, ChatFailure> {
    state
        .orchestrator
        .execute_run(thread_id)
        .await
        .map_err(ChatFailure::at("Failed to execute run"))?;

    let remote = state
        .api
        .list_messages(thread_id)
        .await
        .map_err(ChatFailure::at("Failed to list messages"))?;
    state
        .diagnostics
        .record(format!("Listed {} messages for {thread_id}", remote.len()))
        .await;

    let record = state.store.load(thread_id).await;
    let record = state.store.reconcile(record, remote);
    state
        .store
        .save(&record)
        .await
        .map_err(ChatFailure::at("Failed to save conversation"))?;
    Ok(record)
}

async fn fail(state: &AppState, thread_id: Option<&str>, failure: ChatFailure) -> Json<serde_json::Value> {
    let ChatFailure { public, cause } = failure;
    let thread_id = thread_id.unwrap_or_default();
    if cause.is_remote() {
        warn!(thread_id, kind = cause.kind(), error = %cause, "{public}");
    } else {
        error!(thread_id, kind = cause.kind(), error = %cause, "{public}");
    }
    state.diagnostics.record(format!("{public}: {cause}")).await;
    error_body(public)
}
