//! Inference provider implementations for CodeRelay.
//!
//! All providers implement the `coderelay_core::Provider` trait. CodeRelay
//! talks to exactly one endpoint, chosen by configuration.

pub mod openai_compat;

use std::sync::Arc;
use std::time::Duration;

use coderelay_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured inference provider.
pub fn build_from_config(config: &coderelay_config::AppConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_default();
    Arc::new(OpenAiCompatProvider::with_timeout(
        provider_name(&config.api_url),
        &config.api_url,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    ))
}

/// Short label for logs, derived from the endpoint host.
fn provider_name(api_url: &str) -> &'static str {
    if api_url.contains("huggingface") {
        "huggingface"
    } else if api_url.contains("api.openai.com") {
        "openai"
    } else {
        "custom"
    }
}
