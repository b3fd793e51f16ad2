//! # CodeRelay Core
//!
//! Domain types, collaborator traits, and error definitions for the CodeRelay
//! Slack coding assistant. This crate has **no platform or HTTP dependencies**:
//! it defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (inference endpoint, chat platform) is a trait
//! here. Implementations live in their respective crates, which keeps the
//! assembler and turn handler testable with in-memory fakes.

pub mod channel;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use channel::{
    AssistantThread, FunctionExecution, FunctionInputs, FunctionInvocation, FunctionOutputs,
    InboundEvent, InboundMessage, RetryOutcome, SuggestedPrompt, ThreadLookup, ThreadRef,
};
pub use error::{ChannelError, LookupError, ProviderError};
pub use message::{ChatMessage, PromptSequence, RawThreadEvent, Role, TranspiledText};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
