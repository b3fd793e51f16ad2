//! Conversation context assembly.
//!
//! Turns platform history into a [`PromptSequence`]. Two entry points:
//!
//! 1. **Threaded**: every message of an assistant thread becomes one turn,
//!    bot messages as `assistant`, everyone else as `user`.
//! 2. **Lookup**: a single historical message, resolved by id. If the bot is
//!    not a member of the channel, it joins once and retries once.
//!
//! Assembly is deterministic: the same history always yields the same prompt.

use coderelay_core::channel::{RetryOutcome, ThreadLookup};
use coderelay_core::error::LookupError;
use coderelay_core::message::{ChatMessage, PromptSequence, RawThreadEvent};
use tracing::{debug, info, warn};

/// Map one platform message to a prompt turn.
fn to_turn(event: &RawThreadEvent) -> ChatMessage {
    if event.author_is_bot {
        ChatMessage::assistant(&event.text)
    } else {
        ChatMessage::user(&event.text)
    }
}

/// Build a prompt from a full thread plus the message being answered.
///
/// `thread` is expected oldest first; order is preserved.
pub fn assemble_from_thread(
    thread: &[RawThreadEvent],
    new_user_text: &str,
    system: &str,
) -> PromptSequence {
    PromptSequence::new(system, thread.iter().map(to_turn), new_user_text)
}

/// Build a one-turn prompt from a single historical message.
///
/// A membership gap triggers exactly one `join` and exactly one retried
/// `history` call. Any other failure returns immediately.
pub async fn assemble_from_lookup(
    channel_id: &str,
    message_ts: &str,
    lookup: &dyn ThreadLookup,
    system: &str,
) -> Result<PromptSequence, LookupError> {
    let first = RetryOutcome::from(lookup.history(channel_id, message_ts).await);

    let event = match first {
        RetryOutcome::Found(event) => event,
        RetryOutcome::Failed(e) => {
            warn!(channel = %channel_id, error = %e, "History lookup failed");
            return Err(LookupError::Failed(e.to_string()));
        }
        RetryOutcome::NotAMember => {
            info!(channel = %channel_id, "Not a member of channel, joining before retry");
            lookup
                .join(channel_id)
                .await
                .map_err(|e| LookupError::JoinFailed {
                    channel: channel_id.to_string(),
                    reason: e.to_string(),
                })?;

            match RetryOutcome::from(lookup.history(channel_id, message_ts).await) {
                RetryOutcome::Found(event) => event,
                RetryOutcome::NotAMember => {
                    return Err(LookupError::RetryExhausted {
                        channel: channel_id.to_string(),
                        reason: "still not a member after joining".into(),
                    });
                }
                RetryOutcome::Failed(e) => {
                    return Err(LookupError::RetryExhausted {
                        channel: channel_id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    };

    debug!(channel = %channel_id, ts = %event.ts, "Resolved historical message");
    Ok(PromptSequence::new(system, Vec::<ChatMessage>::new(), event.text))
}
