//! Configuration loading, validation, and management for CodeRelay.
//!
//! Loads configuration from `~/.coderelay/config.toml` (or an explicit path)
//! with environment variable overrides. Validated once at startup and then
//! passed down to the collaborators; nothing else reads the environment.

use coderelay_core::channel::SuggestedPrompt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.coderelay/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inference API key (Hugging Face access token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible inference endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier sent with every completion request
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP timeout for one inference call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Slack credentials and endpoints
    #[serde(default)]
    pub slack: SlackConfig,

    /// Assistant wording: system prompt, greeting, statuses
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Events gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://router.huggingface.co/v1".into()
}
fn default_model() -> String {
    "Qwen/Qwen2.5-Coder-32B-Instruct".into()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("slack", &self.slack)
            .field("assistant", &self.assistant)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (xoxb-...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Signing secret used to verify Events API requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_secret: Option<String>,

    /// Web API base URL
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,

    /// Callback id of the one-shot workflow function
    #[serde(default = "default_function_callback_id")]
    pub function_callback_id: String,
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".into()
}
fn default_function_callback_id() -> String {
    "code_assist".into()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            signing_secret: None,
            api_base: default_slack_api_base(),
            function_callback_id: default_function_callback_id(),
        }
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("signing_secret", &redact(&self.signing_secret))
            .field("api_base", &self.api_base)
            .field("function_callback_id", &self.function_callback_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Fixed instruction sent as the first message of every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Said when a new assistant thread starts
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Said when a threaded turn fails
    #[serde(default = "default_apology")]
    pub apology: String,

    #[serde(default = "default_thinking_status")]
    pub thinking_status: String,

    #[serde(default = "default_typing_status")]
    pub typing_status: String,

    #[serde(default = "default_suggested_prompts_title")]
    pub suggested_prompts_title: String,

    #[serde(default = "default_suggested_prompts")]
    pub suggested_prompts: Vec<SuggestedPrompt>,
}

fn default_system_prompt() -> String {
    "You're an AI assistant specialized in answering questions about code.\n\
You'll analyze code-related questions and provide clear, accurate responses.\n\
When you include markdown text, convert them to Slack compatible ones.\n\
When you include code examples, convert them to Slack compatible ones.\n\
When a prompt has Slack's special syntax like <@USER_ID> or <#CHANNEL_ID>, you must keep them as-is in your response."
        .into()
}
fn default_greeting() -> String {
    "Hi! I'm your coding assistant. Ask me any questions about code!".into()
}
fn default_apology() -> String {
    "I'm sorry, I ran into an error processing your request. Please try again.".into()
}
fn default_thinking_status() -> String {
    "is thinking...".into()
}
fn default_typing_status() -> String {
    "is typing...".into()
}
fn default_suggested_prompts_title() -> String {
    "Here are some questions you can ask:".into()
}
fn default_suggested_prompts() -> Vec<SuggestedPrompt> {
    vec![
        SuggestedPrompt {
            title: "Code Example".into(),
            message: "Show me an example of implementing a binary search tree in Rust.".into(),
        },
        SuggestedPrompt {
            title: "Code Review".into(),
            message: "What are best practices for writing clean, maintainable code?".into(),
        },
        SuggestedPrompt {
            title: "Debug Help".into(),
            message: "How do I debug memory leaks in a long-running service?".into(),
        },
    ]
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
            apology: default_apology(),
            thinking_status: default_thinking_status(),
            typing_status: default_typing_status(),
            suggested_prompts_title: default_suggested_prompts_title(),
            suggested_prompts: default_suggested_prompts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted age of a signed Slack request
    #[serde(default = "default_signature_tolerance_secs")]
    pub signature_tolerance_secs: u64,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_signature_tolerance_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            signature_tolerance_secs: default_signature_tolerance_secs(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Secrets from the environment win over the file:
    /// - `HUGGINGFACE_API_KEY`, then `CODERELAY_API_KEY`
    /// - `SLACK_BOT_TOKEN`, `SLACK_SIGNING_SECRET`
    /// - `CODERELAY_MODEL`, `CODERELAY_API_URL`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("HUGGINGFACE_API_KEY").or_else(|| non_empty("CODERELAY_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(token) = non_empty("SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(token);
        }
        if let Some(secret) = non_empty("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = Some(secret);
        }
        if let Some(model) = non_empty("CODERELAY_MODEL") {
            self.model = model;
        }
        if let Some(url) = non_empty("CODERELAY_API_URL") {
            self.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".coderelay")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than 0".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if self.assistant.system_prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "assistant.system_prompt must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check that everything needed to run the Slack gateway is present.
    pub fn require_runtime_secrets(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("HUGGINGFACE_API_KEY");
        }
        if self.slack.bot_token.is_none() {
            missing.push("SLACK_BOT_TOKEN");
        }
        if self.slack.signing_secret.is_none() {
            missing.push("SLACK_SIGNING_SECRET");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingSecrets(missing.join(", ")))
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            slack: SlackConfig::default(),
            assistant: AssistantConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required secrets: {0}")]
    MissingSecrets(String),
}
