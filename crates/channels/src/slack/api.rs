//! Slack Web API client.
//!
//! Implements the platform traits from `coderelay-core` over plain HTTPS
//! calls to `https://slack.com/api/<method>` with the bot token. Slack
//! answers HTTP 200 with `{"ok": false, "error": "..."}` for most failures,
//! so every response is checked for `ok` before its payload is read.

use async_trait::async_trait;
use coderelay_core::channel::{
    AssistantThread, FunctionExecution, FunctionOutputs, SuggestedPrompt, ThreadLookup, ThreadRef,
};
use coderelay_core::error::ChannelError;
use coderelay_core::message::{RawThreadEvent, TranspiledText};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Slack error code for reading a channel the bot has not joined.
const NOT_IN_CHANNEL: &str = "not_in_channel";

/// Thin client over the Slack Web API methods the assistant uses.
#[derive(Clone)]
pub struct SlackClient {
    api_base: String,
    bot_token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_base", &self.api_base)
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

impl SlackClient {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            client,
        }
    }

    /// Build a client from the `[slack]` config section.
    pub fn from_config(config: &coderelay_config::SlackConfig) -> Result<Self, ChannelError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ChannelError::NotConfigured("slack.bot_token is not set".into()))?;
        Ok(Self::new(&config.api_base, token))
    }

    /// POST a JSON body to a write method.
    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, ChannelError> {
        debug!(method, "Slack API call");
        let response = self
            .client
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| api_failed(method, e))?;
        Self::read(method, response).await
    }

    /// GET a read method with query parameters.
    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ChannelError> {
        debug!(method, "Slack API call");
        let response = self
            .client
            .get(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await
            .map_err(|e| api_failed(method, e))?;
        Self::read(method, response).await
    }

    async fn read<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, ChannelError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::ApiFailed {
                method: method.into(),
                reason: format!("HTTP {status}"),
            });
        }

        let value: serde_json::Value = response.json().await.map_err(|e| api_failed(method, e))?;
        let header: OkHeader =
            serde_json::from_value(value.clone()).map_err(|e| api_failed(method, e))?;
        if !header.ok {
            let reason = header.error.unwrap_or_else(|| "unknown_error".into());
            return Err(ChannelError::ApiFailed {
                method: method.into(),
                reason,
            });
        }
        serde_json::from_value(value).map_err(|e| api_failed(method, e))
    }

    async fn post_ok(&self, method: &str, body: serde_json::Value) -> Result<(), ChannelError> {
        self.post::<serde_json::Value>(method, body).await.map(|_| ())
    }
}

fn api_failed(method: &str, e: impl std::fmt::Display) -> ChannelError {
    ChannelError::ApiFailed {
        method: method.into(),
        reason: e.to_string(),
    }
}

/// Turn Slack's `not_in_channel` code into the classified membership gap.
fn classify_membership(channel_id: &str, err: ChannelError) -> ChannelError {
    match err {
        ChannelError::ApiFailed { reason, .. } if reason == NOT_IN_CHANNEL => {
            ChannelError::NotInChannel(channel_id.to_string())
        }
        other => other,
    }
}

#[async_trait]
impl ThreadLookup for SlackClient {
    async fn replies(&self, thread: &ThreadRef) -> Result<Vec<RawThreadEvent>, ChannelError> {
        let page: MessagesPage = self
            .get(
                "conversations.replies",
                &[
                    ("channel", thread.channel_id.as_str()),
                    ("ts", thread.thread_ts.as_str()),
                    ("oldest", thread.thread_ts.as_str()),
                ],
            )
            .await
            .map_err(|e| classify_membership(&thread.channel_id, e))?;
        Ok(page.messages.into_iter().map(WireMessage::into_event).collect())
    }

    async fn history(
        &self,
        channel_id: &str,
        message_ts: &str,
    ) -> Result<RawThreadEvent, ChannelError> {
        let page: MessagesPage = self
            .get(
                "conversations.history",
                &[
                    ("channel", channel_id),
                    ("latest", message_ts),
                    ("inclusive", "true"),
                    ("limit", "1"),
                ],
            )
            .await
            .map_err(|e| classify_membership(channel_id, e))?;

        page.messages
            .into_iter()
            .find(|m| m.ts == message_ts)
            .map(WireMessage::into_event)
            .ok_or_else(|| ChannelError::MessageNotFound(format!("{channel_id}/{message_ts}")))
    }

    async fn join(&self, channel_id: &str) -> Result<(), ChannelError> {
        self.post_ok("conversations.join", json!({ "channel": channel_id }))
            .await
    }
}

#[async_trait]
impl AssistantThread for SlackClient {
    async fn say(&self, thread: &ThreadRef, text: &TranspiledText) -> Result<(), ChannelError> {
        self.post_ok(
            "chat.postMessage",
            json!({
                "channel": thread.channel_id,
                "thread_ts": thread.thread_ts,
                "text": text.as_str(),
            }),
        )
        .await
        .map_err(|e| ChannelError::DeliveryFailed {
            channel: thread.channel_id.clone(),
            reason: e.to_string(),
        })
    }

    async fn set_status(&self, thread: &ThreadRef, status: &str) -> Result<(), ChannelError> {
        self.post_ok(
            "assistant.threads.setStatus",
            json!({
                "channel_id": thread.channel_id,
                "thread_ts": thread.thread_ts,
                "status": status,
            }),
        )
        .await
    }

    async fn set_title(&self, thread: &ThreadRef, title: &str) -> Result<(), ChannelError> {
        self.post_ok(
            "assistant.threads.setTitle",
            json!({
                "channel_id": thread.channel_id,
                "thread_ts": thread.thread_ts,
                "title": title,
            }),
        )
        .await
    }

    async fn set_suggested_prompts(
        &self,
        thread: &ThreadRef,
        title: &str,
        prompts: &[SuggestedPrompt],
    ) -> Result<(), ChannelError> {
        self.post_ok(
            "assistant.threads.setSuggestedPrompts",
            json!({
                "channel_id": thread.channel_id,
                "thread_ts": thread.thread_ts,
                "title": title,
                "prompts": prompts,
            }),
        )
        .await
    }
}

#[async_trait]
impl FunctionExecution for SlackClient {
    async fn complete(
        &self,
        execution_id: &str,
        outputs: &FunctionOutputs,
    ) -> Result<(), ChannelError> {
        self.post_ok(
            "functions.completeSuccess",
            json!({
                "function_execution_id": execution_id,
                "outputs": outputs,
            }),
        )
        .await
    }

    async fn fail(&self, execution_id: &str, reason: &str) -> Result<(), ChannelError> {
        self.post_ok(
            "functions.completeError",
            json!({
                "function_execution_id": execution_id,
                "error": reason,
            }),
        )
        .await
    }
}

// --- Slack API types (internal) ---

#[derive(Debug, Deserialize)]
struct OkHeader {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    text: String,
    ts: String,
    #[serde(default)]
    bot_id: Option<String>,
}

impl WireMessage {
    fn into_event(self) -> RawThreadEvent {
        RawThreadEvent::new(self.bot_id.is_some(), self.text, self.ts)
    }
}
