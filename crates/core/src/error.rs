//! Error types for the CodeRelay domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type.

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider returned no completion")]
    EmptyCompletion,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// The bot user is not a member of the channel it tried to read.
    #[error("Not a member of channel {0}")]
    NotInChannel(String),

    #[error("Platform API call {method} failed: {reason}")]
    ApiFailed { method: String, reason: String },

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Failure to resolve a single historical message into a prompt.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("History lookup failed: {0}")]
    Failed(String),

    #[error("Joining channel {channel} failed: {reason}")]
    JoinFailed { channel: String, reason: String },

    #[error("History lookup failed after joining channel {channel}: {reason}")]
    RetryExhausted { channel: String, reason: String },
}
