//! Channel traits: the abstraction over the chat platform.
//!
//! The platform (Slack) is an external collaborator. CodeRelay only needs
//! three capabilities from it: read history (with a join-on-demand escape
//! hatch), talk inside an assistant thread, and finish a workflow function
//! step. Each is a trait here; `coderelay-channels` adapts Slack to them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::message::{RawThreadEvent, TranspiledText};

/// Locates an assistant thread: the channel plus the thread's root `ts`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRef {
    pub channel_id: String,
    pub thread_ts: String,
}

impl ThreadRef {
    pub fn new(channel_id: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_ts: thread_ts.into(),
        }
    }
}

impl std::fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.thread_ts)
    }
}

/// A new message in a tracked conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The message text
    pub text: String,

    /// Where the message was posted
    pub thread: ThreadRef,

    /// Whether a bot sent it
    #[serde(default)]
    pub author_is_bot: bool,

    /// Platform user id of the sender (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Inputs of a one-shot workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionInputs {
    /// Answer about one historical message, resolved by id.
    MessageRef {
        channel_id: String,
        message_ts: String,
    },
    /// Answer a question passed in directly.
    Question { question: String },
}

/// A workflow function invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInvocation {
    /// Platform execution id used to complete or fail the step
    pub execution_id: String,

    /// The function's callback id
    pub callback_id: String,

    pub inputs: FunctionInputs,
}

/// Every event CodeRelay reacts to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A user opened a new assistant thread
    ThreadStarted(ThreadRef),
    /// A message arrived in an assistant thread
    Message(InboundMessage),
    /// A workflow step asked for a one-shot answer
    FunctionExecuted(FunctionInvocation),
}

/// A clickable prompt suggestion shown in a fresh assistant thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedPrompt {
    pub title: String,
    pub message: String,
}

/// Outputs of a completed workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionOutputs {
    pub message: TranspiledText,
}

/// Tri-state result of one history lookup attempt.
#[derive(Debug, Clone)]
pub enum RetryOutcome {
    /// The message was found
    Found(RawThreadEvent),
    /// The bot is not in the channel; joining may fix it
    NotAMember,
    /// Anything else; not recoverable by joining
    Failed(ChannelError),
}

impl From<std::result::Result<RawThreadEvent, ChannelError>> for RetryOutcome {
    fn from(result: std::result::Result<RawThreadEvent, ChannelError>) -> Self {
        match result {
            Ok(event) => RetryOutcome::Found(event),
            Err(ChannelError::NotInChannel(_)) => RetryOutcome::NotAMember,
            Err(e) => RetryOutcome::Failed(e),
        }
    }
}

/// Read access to conversation history.
#[async_trait]
pub trait ThreadLookup: Send + Sync {
    /// All messages of a thread, oldest first.
    async fn replies(
        &self,
        thread: &ThreadRef,
    ) -> std::result::Result<Vec<RawThreadEvent>, ChannelError>;

    /// Exactly one historical message, by id.
    ///
    /// Must return `ChannelError::NotInChannel` when the bot lacks membership.
    async fn history(
        &self,
        channel_id: &str,
        message_ts: &str,
    ) -> std::result::Result<RawThreadEvent, ChannelError>;

    /// Join a channel so its history becomes readable.
    async fn join(&self, channel_id: &str) -> std::result::Result<(), ChannelError>;
}

/// The conversational surface of an assistant thread.
#[async_trait]
pub trait AssistantThread: Send + Sync {
    /// Post a reply into the thread.
    async fn say(
        &self,
        thread: &ThreadRef,
        text: &TranspiledText,
    ) -> std::result::Result<(), ChannelError>;

    /// Show a transient status line ("is thinking...").
    async fn set_status(
        &self,
        thread: &ThreadRef,
        status: &str,
    ) -> std::result::Result<(), ChannelError>;

    /// Set the thread title shown in the assistant history list.
    async fn set_title(&self, thread: &ThreadRef, title: &str)
    -> std::result::Result<(), ChannelError>;

    /// Offer clickable prompts at the start of a thread.
    async fn set_suggested_prompts(
        &self,
        thread: &ThreadRef,
        title: &str,
        prompts: &[SuggestedPrompt],
    ) -> std::result::Result<(), ChannelError>;
}

/// Completion primitive for a one-shot workflow step.
#[async_trait]
pub trait FunctionExecution: Send + Sync {
    async fn complete(
        &self,
        execution_id: &str,
        outputs: &FunctionOutputs,
    ) -> std::result::Result<(), ChannelError>;

    async fn fail(&self, execution_id: &str, reason: &str)
    -> std::result::Result<(), ChannelError>;
}
