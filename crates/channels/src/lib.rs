//! Slack channel support for CodeRelay.
//!
//! - **mrkdwn**: Markdown to Slack mrkdwn transpiler (pure, total)
//! - **slack**: Web API client implementing the `coderelay-core` platform
//!   traits, Events API payload decoding, and request signature verification

pub mod mrkdwn;
pub mod slack;

pub use mrkdwn::to_mrkdwn;
pub use slack::{Envelope, SignatureError, SignatureVerifier, SlackClient, parse_envelope};
