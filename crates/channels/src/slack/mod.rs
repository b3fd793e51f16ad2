//! Slack platform adapter: Web API client, Events API payloads, and request
//! signature verification.

pub mod api;
pub mod events;
pub mod signature;

pub use api::SlackClient;
pub use events::{Envelope, parse_envelope};
pub use signature::{SignatureError, SignatureVerifier};
