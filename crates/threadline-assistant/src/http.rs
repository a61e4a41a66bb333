use crate::api::{parse_id, parse_message_page, parse_run_snapshot, AssistantApi, MessageReceipt, RunSnapshot};
use crate::config::{AssistantConfig, BETA_HEADER_NAME};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use threadline_core::{Message, Role, ThreadlineError, ThreadlineResult};
use tracing::{debug, warn};

/// Page size requested when listing thread messages.
const LIST_PAGE_SIZE: u32 = 100;
/// Upper bound on pages fetched by one listing. A longer listing is an
/// error rather than a partial history.
pub const MAX_LIST_PAGES: usize = 50;

/// HTTP client for the OpenAI Assistants (v2) thread API.
pub struct HttpAssistantClient {
    config: AssistantConfig,
    http: reqwest::Client,
}

impl HttpAssistantClient {
    /// Builds a client from config. The request timeout applies to every call.
    pub fn new(config: AssistantConfig) -> ThreadlineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ThreadlineError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url(), path)
    }

    fn add_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header(BETA_HEADER_NAME, &self.config.beta_header)
    }

    /// Sends a request and decodes the JSON body.
    ///
    /// Transport failures map to `RemoteUnavailable`; non-success statuses and
    /// undecodable bodies map to `RemoteProtocol` with the raw payload.
    async fn send(&self, op: &str, request: reqwest::RequestBuilder) -> ThreadlineResult<Value> {
        let resp = self.add_headers(request).send().await.map_err(|e| {
            warn!(op, error = %e, "Assistant API transport error");
            ThreadlineError::RemoteUnavailable(format!("{op}: {e}"))
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            warn!(op, error = %e, "Failed to read assistant API response");
            ThreadlineError::RemoteUnavailable(format!("{op}: {e}"))
        })?;
        debug!(op, status = %status, bytes = text.len(), "Assistant API response");

        if !status.is_success() {
            return Err(ThreadlineError::RemoteProtocol(format!(
                "{op}: HTTP {status}: {text}"
            )));
        }
        serde_json::from_str(&text).map_err(|e| {
            ThreadlineError::RemoteProtocol(format!("{op}: invalid JSON ({e}): {text}"))
        })
    }
}

#[async_trait]
impl AssistantApi for HttpAssistantClient {
    async fn create_conversation(&self, initial_message: &str) -> ThreadlineResult<String> {
        if initial_message.trim().is_empty() {
            return Err(ThreadlineError::EmptyInput);
        }
        let body = serde_json::json!({
            "messages": [{ "role": "user", "content": initial_message }]
        });
        let resp = self
            .send("create_conversation", self.http.post(self.url("threads")).json(&body))
            .await?;
        parse_id("create_conversation", &resp)
    }

    async fn append_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> ThreadlineResult<MessageReceipt> {
        let body = serde_json::json!({ "role": role.as_str(), "content": content });
        let url = self.url(&format!("threads/{thread_id}/messages"));
        let resp = self
            .send("append_message", self.http.post(url).json(&body))
            .await?;
        let id = parse_id("append_message", &resp)?;
        Ok(MessageReceipt { id, raw: resp })
    }

    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> ThreadlineResult<String> {
        let body = serde_json::json!({ "assistant_id": assistant_id });
        let url = self.url(&format!("threads/{thread_id}/runs"));
        let resp = self.send("start_run", self.http.post(url).json(&body)).await?;
        parse_id("start_run", &resp)
    }

    async fn get_run_status(&self, thread_id: &str, run_id: &str) -> ThreadlineResult<RunSnapshot> {
        let url = self.url(&format!("threads/{thread_id}/runs/{run_id}"));
        let resp = self.send("get_run_status", self.http.get(url)).await?;
        parse_run_snapshot(resp)
    }

    async fn list_messages(&self, thread_id: &str) -> ThreadlineResult<Vec<Message>> {
        let url = self.url(&format!("threads/{thread_id}/messages"));
        let limit = LIST_PAGE_SIZE.to_string();
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut request = self
                .http
                .get(&url)
                .query(&[("limit", limit.as_str()), ("order", "desc")]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor.as_str())]);
            }
            let page = self.send("list_messages", request).await?;
            messages.extend(parse_message_page(&page)?);

            after = match (page["has_more"].as_bool(), page["last_id"].as_str()) {
                (Some(true), Some(last_id)) => Some(last_id.to_string()),
                _ => return Ok(messages),
            };
        }

        warn!(thread_id, pages = MAX_LIST_PAGES, "Message listing exceeds page limit");
        Err(ThreadlineError::RemoteProtocol(format!(
            "list_messages: more than {MAX_LIST_PAGES} pages for {thread_id}"
        )))
    }
}
