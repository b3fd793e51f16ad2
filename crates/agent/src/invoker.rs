//! Inference invocation: one prompt in, one completion text out.

use std::sync::Arc;

use coderelay_config::AppConfig;
use coderelay_core::error::ProviderError;
use coderelay_core::message::PromptSequence;
use coderelay_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info};

/// Sends assembled prompts to the configured model.
#[derive(Clone)]
pub struct InferenceInvoker {
    provider: Arc<dyn Provider>,

    /// Model id passed on every request
    model: String,

    /// Cap on generated tokens
    max_tokens: u32,

    temperature: f32,
}

impl InferenceInvoker {
    /// Create an invoker with the default limits (2000 tokens, temperature 0.7).
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 2000,
            temperature: 0.7,
        }
    }

    /// Create an invoker with the model and limits from `config`.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, &config.model)
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one completion and return the text of the first choice.
    ///
    /// Called once per turn; failures are returned, never retried.
    pub async fn invoke(&self, prompt: PromptSequence) -> Result<String, ProviderError> {
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = prompt.len(),
            estimated_tokens = prompt.estimated_tokens(),
            "Invoking model"
        );

        let request = ProviderRequest::new(&self.model, prompt)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);
        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            info!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        Ok(response.content)
    }
}
