//! Shared test doubles for the assembler, invoker and turn handler tests.

use async_trait::async_trait;
use coderelay_core::channel::{
    AssistantThread, FunctionExecution, FunctionOutputs, SuggestedPrompt, ThreadLookup, ThreadRef,
};
use coderelay_core::error::{ChannelError, ProviderError};
use coderelay_core::message::{RawThreadEvent, TranspiledText};
use coderelay_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted results and records
/// every request it receives.
pub struct ScriptedProvider {
    results: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(results: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that answers once with `text`.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    /// Create a provider whose only call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: no more scripted results")
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
        finish_reason: Some("stop".into()),
    }
}

/// A history source with scripted `history` results, a fixed thread for
/// `replies`, and call counters.
pub struct ScriptedLookup {
    history: Mutex<VecDeque<Result<RawThreadEvent, ChannelError>>>,
    thread: Result<Vec<RawThreadEvent>, ChannelError>,
    join_error: Option<ChannelError>,
    history_calls: Mutex<usize>,
    joined: Mutex<Vec<String>>,
}

impl ScriptedLookup {
    pub fn new(history: Vec<Result<RawThreadEvent, ChannelError>>) -> Self {
        Self {
            history: Mutex::new(history.into()),
            thread: Ok(Vec::new()),
            join_error: None,
            history_calls: Mutex::new(0),
            joined: Mutex::new(Vec::new()),
        }
    }

    /// Create a lookup whose `replies` returns `thread`.
    pub fn with_thread(thread: Vec<RawThreadEvent>) -> Self {
        Self {
            thread: Ok(thread),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_replies_error(mut self, error: ChannelError) -> Self {
        self.thread = Err(error);
        self
    }

    pub fn with_join_error(mut self, error: ChannelError) -> Self {
        self.join_error = Some(error);
        self
    }

    pub fn history_calls(&self) -> usize {
        *self.history_calls.lock().unwrap()
    }

    pub fn join_calls(&self) -> usize {
        self.joined.lock().unwrap().len()
    }

    pub fn joined_channels(&self) -> Vec<String> {
        self.joined.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThreadLookup for ScriptedLookup {
    async fn replies(&self, _thread: &ThreadRef) -> Result<Vec<RawThreadEvent>, ChannelError> {
        self.thread.clone()
    }

    async fn history(
        &self,
        channel_id: &str,
        _message_ts: &str,
    ) -> Result<RawThreadEvent, ChannelError> {
        *self.history_calls.lock().unwrap() += 1;
        self.history
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChannelError::MessageNotFound(channel_id.to_string())))
    }

    async fn join(&self, channel_id: &str) -> Result<(), ChannelError> {
        self.joined.lock().unwrap().push(channel_id.to_string());
        match &self.join_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// One outbound platform action, as recorded by [`RecordingSlack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Say(String),
    Status(String),
    Title(String),
    SuggestedPrompts { title: String, count: usize },
    Complete { execution_id: String, message: String },
    Fail { execution_id: String, reason: String },
}

/// Records every outbound action in order. Individual actions can be made
/// to fail.
#[derive(Default)]
pub struct RecordingSlack {
    actions: Mutex<Vec<Action>>,
    fail_status: bool,
    fail_say: bool,
}

impl RecordingSlack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_status(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub fn failing_say(mut self) -> Self {
        self.fail_say = true;
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn said(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Say(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl AssistantThread for RecordingSlack {
    async fn say(&self, thread: &ThreadRef, text: &TranspiledText) -> Result<(), ChannelError> {
        self.record(Action::Say(text.as_str().to_string()));
        if self.fail_say {
            return Err(ChannelError::DeliveryFailed {
                channel: thread.channel_id.clone(),
                reason: "scripted".into(),
            });
        }
        Ok(())
    }

    async fn set_status(&self, _thread: &ThreadRef, status: &str) -> Result<(), ChannelError> {
        self.record(Action::Status(status.to_string()));
        if self.fail_status {
            return Err(ChannelError::ApiFailed {
                method: "assistant.threads.setStatus".into(),
                reason: "scripted".into(),
            });
        }
        Ok(())
    }

    async fn set_title(&self, _thread: &ThreadRef, title: &str) -> Result<(), ChannelError> {
        self.record(Action::Title(title.to_string()));
        Ok(())
    }

    async fn set_suggested_prompts(
        &self,
        _thread: &ThreadRef,
        title: &str,
        prompts: &[SuggestedPrompt],
    ) -> Result<(), ChannelError> {
        self.record(Action::SuggestedPrompts {
            title: title.to_string(),
            count: prompts.len(),
        });
        Ok(())
    }
}

#[async_trait]
impl FunctionExecution for RecordingSlack {
    async fn complete(
        &self,
        execution_id: &str,
        outputs: &FunctionOutputs,
    ) -> Result<(), ChannelError> {
        self.record(Action::Complete {
            execution_id: execution_id.to_string(),
            message: outputs.message.as_str().to_string(),
        });
        Ok(())
    }

    async fn fail(&self, execution_id: &str, reason: &str) -> Result<(), ChannelError> {
        self.record(Action::Fail {
            execution_id: execution_id.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }
}
