//! Message and prompt domain types.
//!
//! These are the value objects that flow through a single turn:
//! Slack event → `RawThreadEvent`s → `PromptSequence` → provider → `TranspiledText`.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (assistant behavior)
    System,
    /// A human in the thread
    User,
    /// A previous reply from the bot
    Assistant,
}

impl Role {
    /// The wire name used by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single role-tagged message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: Role,
    content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// An ordered prompt: one leading system message, zero or more historical
/// turns, one trailing user message.
///
/// The only constructor takes those three parts separately, so a value of
/// this type always satisfies the shape the inference endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PromptSequence {
    messages: Vec<ChatMessage>,
}

impl PromptSequence {
    /// Build a prompt from its system instruction, history, and current question.
    ///
    /// `history` is kept in the given (chronological) order.
    pub fn new(
        system: impl Into<String>,
        history: impl IntoIterator<Item = ChatMessage>,
        question: impl Into<String>,
    ) -> Self {
        let history = history.into_iter();
        let mut messages = Vec::with_capacity(history.size_hint().0 + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history);
        messages.push(ChatMessage::user(question));
        Self { messages }
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The leading system instruction.
    pub fn system(&self) -> &ChatMessage {
        &self.messages[0]
    }

    /// The trailing user message being answered.
    pub fn question(&self) -> &ChatMessage {
        &self.messages[self.messages.len() - 1]
    }

    /// Historical turns between the system instruction and the question.
    pub fn history(&self) -> &[ChatMessage] {
        &self.messages[1..self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Rough token estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}

/// A message as read back from the platform. Read-only input to the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawThreadEvent {
    /// Whether a bot (including this assistant) authored the message
    pub author_is_bot: bool,

    /// The message text, verbatim
    pub text: String,

    /// Platform message id (Slack `ts`)
    pub ts: String,
}

impl RawThreadEvent {
    pub fn new(author_is_bot: bool, text: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            author_is_bot,
            text: text.into(),
            ts: ts.into(),
        }
    }
}

/// Text ready for the platform: no runs of three or more newlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranspiledText(String);

impl TranspiledText {
    /// Wrap `text`, collapsing every run of 3+ newlines down to exactly 2.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.contains("\n\n\n") {
            return Self(text);
        }

        let mut out = String::with_capacity(text.len());
        let mut run = 0usize;
        for ch in text.chars() {
            if ch == '\n' {
                run += 1;
                if run > 2 {
                    continue;
                }
            } else {
                run = 0;
            }
            out.push(ch);
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TranspiledText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TranspiledText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
