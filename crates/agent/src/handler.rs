//! Per-turn event handling.
//!
//! A turn is one inbound event taken to its single outbound action:
//!
//! ```text
//! event → assemble → invoke → to_mrkdwn → say | complete | fail
//! ```
//!
//! Every failure is caught here. The threaded flow answers with a fixed
//! apology, the one-shot flow fails the workflow step with the reason.

use std::sync::Arc;

use coderelay_channels::to_mrkdwn;
use coderelay_config::{AppConfig, AssistantConfig};
use coderelay_core::channel::{
    AssistantThread, FunctionExecution, FunctionInputs, FunctionInvocation, FunctionOutputs,
    InboundEvent, InboundMessage, ThreadLookup, ThreadRef,
};
use coderelay_core::error::{ChannelError, LookupError, ProviderError};
use coderelay_core::message::{ChatMessage, PromptSequence, TranspiledText};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::assembler::{assemble_from_lookup, assemble_from_thread};
use crate::invoker::InferenceInvoker;

/// Why a turn could not produce an answer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Inference(#[from] ProviderError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Handles inbound events end to end. Cheap to clone; share one per process.
#[derive(Clone)]
pub struct TurnHandler {
    invoker: InferenceInvoker,
    lookup: Arc<dyn ThreadLookup>,
    thread: Arc<dyn AssistantThread>,
    functions: Arc<dyn FunctionExecution>,
    assistant: Arc<AssistantConfig>,
    function_callback_id: String,
}

impl TurnHandler {
    /// Build a handler over one platform client that provides all three
    /// platform capabilities.
    pub fn new<P>(invoker: InferenceInvoker, platform: Arc<P>, config: &AppConfig) -> Self
    where
        P: ThreadLookup + AssistantThread + FunctionExecution + 'static,
    {
        Self {
            invoker,
            lookup: platform.clone(),
            thread: platform.clone(),
            functions: platform,
            assistant: Arc::new(config.assistant.clone()),
            function_callback_id: config.slack.function_callback_id.clone(),
        }
    }

    /// Route one event to its flow.
    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::ThreadStarted(thread) => self.on_thread_started(&thread).await,
            InboundEvent::Message(message) => self.on_message(&message).await,
            InboundEvent::FunctionExecuted(invocation) => self.on_function(&invocation).await,
        }
    }

    /// Greet a fresh assistant thread and offer suggested prompts.
    #[instrument(skip_all, fields(thread = %thread))]
    pub async fn on_thread_started(&self, thread: &ThreadRef) {
        if let Err(e) = self.greet(thread).await {
            error!(error = %e, "Failed to greet new thread");
        }
    }

    async fn greet(&self, thread: &ThreadRef) -> Result<(), ChannelError> {
        self.thread
            .say(thread, &TranspiledText::new(&self.assistant.greeting))
            .await?;
        if !self.assistant.suggested_prompts.is_empty() {
            self.thread
                .set_suggested_prompts(
                    thread,
                    &self.assistant.suggested_prompts_title,
                    &self.assistant.suggested_prompts,
                )
                .await?;
        }
        Ok(())
    }

    /// Answer a user message inside an assistant thread.
    #[instrument(skip_all, fields(thread = %message.thread))]
    pub async fn on_message(&self, message: &InboundMessage) {
        if message.author_is_bot {
            debug!("Ignoring bot-authored message");
            return;
        }

        match self.answer_in_thread(message).await {
            Ok(()) => info!("Replied in thread"),
            Err(e) => {
                error!(error = %e, "Turn failed, sending apology");
                let apology = TranspiledText::new(&self.assistant.apology);
                if let Err(e) = self.thread.say(&message.thread, &apology).await {
                    error!(error = %e, "Failed to deliver apology");
                }
            }
        }
    }

    async fn answer_in_thread(&self, message: &InboundMessage) -> Result<(), TurnError> {
        let thread = &message.thread;

        self.thread.set_title(thread, &message.text).await?;
        self.thread
            .set_status(thread, &self.assistant.thinking_status)
            .await?;

        let history = self.lookup.replies(thread).await?;
        let prompt = assemble_from_thread(&history, &message.text, &self.assistant.system_prompt);
        let answer = self.invoker.invoke(prompt).await?;

        self.thread
            .set_status(thread, &self.assistant.typing_status)
            .await?;
        self.thread.say(thread, &to_mrkdwn(&answer)).await?;
        Ok(())
    }

    /// Run a one-shot workflow step and complete or fail it.
    #[instrument(skip_all, fields(execution = %invocation.execution_id))]
    pub async fn on_function(&self, invocation: &FunctionInvocation) {
        if invocation.callback_id != self.function_callback_id {
            debug!(callback_id = %invocation.callback_id, "Ignoring unknown function");
            return;
        }

        let delivered = match self.answer_function(&invocation.inputs).await {
            Ok(message) => {
                info!("Completing function step");
                self.functions
                    .complete(&invocation.execution_id, &FunctionOutputs { message })
                    .await
            }
            Err(e) => {
                error!(error = %e, "Function step failed");
                self.functions
                    .fail(
                        &invocation.execution_id,
                        &format!("Failed to complete the step: {e}"),
                    )
                    .await
            }
        };

        if let Err(e) = delivered {
            error!(error = %e, "Failed to report function result");
        }
    }

    async fn answer_function(&self, inputs: &FunctionInputs) -> Result<TranspiledText, TurnError> {
        let system = &self.assistant.system_prompt;
        let prompt = match inputs {
            FunctionInputs::Question { question } => {
                PromptSequence::new(system, Vec::<ChatMessage>::new(), question)
            }
            FunctionInputs::MessageRef {
                channel_id,
                message_ts,
            } => assemble_from_lookup(channel_id, message_ts, self.lookup.as_ref(), system).await?,
        };

        let answer = self.invoker.invoke(prompt).await?;
        Ok(to_mrkdwn(&answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{Action, RecordingSlack, ScriptedLookup, ScriptedProvider};
    use async_trait::async_trait;
    use coderelay_core::channel::SuggestedPrompt;
    use coderelay_core::message::{RawThreadEvent, Role};
    use coderelay_core::provider::Provider;

    const APOLOGY: &str =
        "I'm sorry, I ran into an error processing your request. Please try again.";

    /// Lookup and outbound fakes glued into one platform, as the real Slack
    /// client is.
    struct FakePlatform {
        lookup: ScriptedLookup,
        slack: RecordingSlack,
    }

    #[async_trait]
    impl ThreadLookup for FakePlatform {
        async fn replies(&self, thread: &ThreadRef) -> Result<Vec<RawThreadEvent>, ChannelError> {
            self.lookup.replies(thread).await
        }
        async fn history(&self, c: &str, ts: &str) -> Result<RawThreadEvent, ChannelError> {
            self.lookup.history(c, ts).await
        }
        async fn join(&self, c: &str) -> Result<(), ChannelError> {
            self.lookup.join(c).await
        }
    }

    #[async_trait]
    impl AssistantThread for FakePlatform {
        async fn say(&self, t: &ThreadRef, text: &TranspiledText) -> Result<(), ChannelError> {
            self.slack.say(t, text).await
        }
        async fn set_status(&self, t: &ThreadRef, s: &str) -> Result<(), ChannelError> {
            self.slack.set_status(t, s).await
        }
        async fn set_title(&self, t: &ThreadRef, s: &str) -> Result<(), ChannelError> {
            self.slack.set_title(t, s).await
        }
        async fn set_suggested_prompts(
            &self,
            t: &ThreadRef,
            title: &str,
            prompts: &[SuggestedPrompt],
        ) -> Result<(), ChannelError> {
            self.slack.set_suggested_prompts(t, title, prompts).await
        }
    }

    #[async_trait]
    impl FunctionExecution for FakePlatform {
        async fn complete(&self, id: &str, outputs: &FunctionOutputs) -> Result<(), ChannelError> {
            self.slack.complete(id, outputs).await
        }
        async fn fail(&self, id: &str, reason: &str) -> Result<(), ChannelError> {
            self.slack.fail(id, reason).await
        }
    }

    fn handler(
        provider: Arc<ScriptedProvider>,
        lookup: ScriptedLookup,
        slack: RecordingSlack,
    ) -> (TurnHandler, Arc<FakePlatform>) {
        let config = AppConfig::default();
        let provider: Arc<dyn Provider> = provider;
        let platform = Arc::new(FakePlatform { lookup, slack });
        let invoker = InferenceInvoker::from_config(provider, &config);
        (
            TurnHandler::new(invoker, platform.clone(), &config),
            platform,
        )
    }

    fn user_message(text: &str) -> InboundMessage {
        InboundMessage {
            text: text.into(),
            thread: ThreadRef::new("D1", "1.0"),
            author_is_bot: false,
            user_id: Some("U1".into()),
        }
    }

    fn invocation(inputs: FunctionInputs) -> FunctionInvocation {
        FunctionInvocation {
            execution_id: "Fx1".into(),
            callback_id: "code_assist".into(),
            inputs,
        }
    }

    #[tokio::test]
    async fn thread_started_greets_then_suggests() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let (handler, platform) = handler(provider, ScriptedLookup::new(vec![]), RecordingSlack::new());

        handler
            .handle(InboundEvent::ThreadStarted(ThreadRef::new("D1", "1.0")))
            .await;

        assert_eq!(
            platform.slack.actions(),
            vec![
                Action::Say("Hi! I'm your coding assistant. Ask me any questions about code!".into()),
                Action::SuggestedPrompts {
                    title: "Here are some questions you can ask:".into(),
                    count: 3,
                },
            ]
        );
    }

    #[tokio::test]
    async fn message_flow_in_order() {
        let provider = Arc::new(ScriptedProvider::single_text("Use **iter().rev()**"));
        let lookup = ScriptedLookup::with_thread(vec![
            RawThreadEvent::new(true, "Hi! Ask me anything", "1.0"),
            RawThreadEvent::new(false, "How do I reverse a Vec?", "1.1"),
        ]);
        let (handler, platform) = handler(provider.clone(), lookup, RecordingSlack::new());

        handler.on_message(&user_message("How do I reverse a Vec?")).await;

        assert_eq!(
            platform.slack.actions(),
            vec![
                Action::Title("How do I reverse a Vec?".into()),
                Action::Status("is thinking...".into()),
                Action::Status("is typing...".into()),
                Action::Say("Use *iter().rev()*".into()),
            ]
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let roles: Vec<Role> = requests[0].messages.messages().iter().map(|m| m.role()).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::Assistant, Role::User, Role::User]
        );
        assert_eq!(requests[0].max_tokens, Some(2000));
        assert_eq!(requests[0].model, "Qwen/Qwen2.5-Coder-32B-Instruct");
    }

    #[tokio::test]
    async fn bot_messages_are_ignored() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let (handler, platform) = handler(provider.clone(), ScriptedLookup::new(vec![]), RecordingSlack::new());

        let mut message = user_message("I am a bot");
        message.author_is_bot = true;
        handler.handle(InboundEvent::Message(message)).await;

        assert!(platform.slack.actions().is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn inference_failure_sends_apology() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Timeout("120s".into())));
        let (handler, platform) = handler(provider, ScriptedLookup::with_thread(vec![]), RecordingSlack::new());

        handler.on_message(&user_message("hello")).await;

        assert_eq!(platform.slack.said(), vec![APOLOGY.to_string()]);
        assert!(!platform
            .slack
            .actions()
            .contains(&Action::Status("is typing...".into())));
    }

    #[tokio::test]
    async fn replies_failure_sends_apology_without_inference() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let lookup = ScriptedLookup::with_thread(vec![])
            .with_replies_error(ChannelError::NotInChannel("D1".into()));
        let (handler, platform) = handler(provider.clone(), lookup, RecordingSlack::new());

        handler.on_message(&user_message("hello")).await;

        assert_eq!(platform.slack.said(), vec![APOLOGY.to_string()]);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn status_failure_sends_apology() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let (handler, platform) = handler(
            provider.clone(),
            ScriptedLookup::with_thread(vec![]),
            RecordingSlack::new().failing_status(),
        );

        handler.on_message(&user_message("hello")).await;

        assert_eq!(platform.slack.said(), vec![APOLOGY.to_string()]);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn failed_reply_delivery_falls_back_to_apology() {
        let provider = Arc::new(ScriptedProvider::single_text("answer"));
        let (handler, platform) = handler(
            provider,
            ScriptedLookup::with_thread(vec![]),
            RecordingSlack::new().failing_say(),
        );

        handler.on_message(&user_message("hello")).await;

        assert_eq!(
            platform.slack.said(),
            vec!["answer".to_string(), APOLOGY.to_string()]
        );
    }

    #[tokio::test]
    async fn function_with_question_completes() {
        let provider = Arc::new(ScriptedProvider::single_text("## Lifetimes\n- scopes"));
        let (handler, platform) = handler(provider.clone(), ScriptedLookup::new(vec![]), RecordingSlack::new());

        handler
            .on_function(&invocation(FunctionInputs::Question {
                question: "What is a lifetime?".into(),
            }))
            .await;

        assert_eq!(
            platform.slack.actions(),
            vec![Action::Complete {
                execution_id: "Fx1".into(),
                message: "*Lifetimes*\n• scopes".into(),
            }]
        );
        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages.question().content(), "What is a lifetime?");
    }

    #[tokio::test]
    async fn function_with_message_ref_joins_and_retries() {
        let provider = Arc::new(ScriptedProvider::single_text("fixed"));
        let lookup = ScriptedLookup::new(vec![
            Err(ChannelError::NotInChannel("C7".into())),
            Ok(RawThreadEvent::new(false, "why does this panic?", "9.9")),
        ]);
        let (handler, platform) = handler(provider.clone(), lookup, RecordingSlack::new());

        handler
            .on_function(&invocation(FunctionInputs::MessageRef {
                channel_id: "C7".into(),
                message_ts: "9.9".into(),
            }))
            .await;

        assert_eq!(platform.lookup.join_calls(), 1);
        assert_eq!(platform.lookup.history_calls(), 2);
        assert_eq!(
            provider.requests()[0].messages.question().content(),
            "why does this panic?"
        );
        assert!(matches!(
            platform.slack.actions().as_slice(),
            [Action::Complete { .. }]
        ));
    }

    #[tokio::test]
    async fn function_lookup_failure_fails_step_without_inference() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let lookup = ScriptedLookup::new(vec![Err(ChannelError::ApiFailed {
            method: "conversations.history".into(),
            reason: "channel_not_found".into(),
        })]);
        let (handler, platform) = handler(provider.clone(), lookup, RecordingSlack::new());

        handler
            .on_function(&invocation(FunctionInputs::MessageRef {
                channel_id: "C7".into(),
                message_ts: "9.9".into(),
            }))
            .await;

        assert_eq!(provider.call_count(), 0);
        assert_eq!(platform.lookup.join_calls(), 0);
        match platform.slack.actions().as_slice() {
            [Action::Fail { execution_id, reason }] => {
                assert_eq!(execution_id, "Fx1");
                assert!(reason.starts_with("Failed to complete the step: "));
                assert!(reason.contains("channel_not_found"));
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[tokio::test]
    async fn function_inference_failure_fails_step() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::AuthenticationFailed(
            "bad token".into(),
        )));
        let (handler, platform) = handler(provider, ScriptedLookup::new(vec![]), RecordingSlack::new());

        handler
            .on_function(&invocation(FunctionInputs::Question {
                question: "q".into(),
            }))
            .await;

        assert_eq!(
            platform.slack.actions(),
            vec![Action::Fail {
                execution_id: "Fx1".into(),
                reason: "Failed to complete the step: Authentication failed: bad token".into(),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_function_is_ignored() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let (handler, platform) = handler(provider.clone(), ScriptedLookup::new(vec![]), RecordingSlack::new());

        let mut other = invocation(FunctionInputs::Question { question: "q".into() });
        other.callback_id = "something_else".into();
        handler.handle(InboundEvent::FunctionExecuted(other)).await;

        assert!(platform.slack.actions().is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
