//! Slack Events API payloads.
//!
//! Decodes the HTTP body Slack posts to the events endpoint into either a
//! URL-verification challenge or a domain [`InboundEvent`]. Everything the
//! assistant does not react to decodes to [`Envelope::Ignored`].

use coderelay_core::channel::{
    FunctionInputs, FunctionInvocation, InboundEvent, InboundMessage, ThreadRef,
};
use coderelay_core::error::ChannelError;
use serde::Deserialize;

/// A decoded events request.
#[derive(Debug, Clone)]
pub enum Envelope {
    /// Echo `challenge` back to finish registering the request URL.
    Challenge(String),
    /// An event the assistant handles. `event_id` is Slack's delivery-independent
    /// id, the same on every redelivery of one event.
    Event {
        event_id: Option<String>,
        event: InboundEvent,
    },
    /// Anything else (other event types, edits, joins, retries of unknown shape).
    Ignored,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: WireEvent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    AssistantThreadStarted {
        assistant_thread: WireAssistantThread,
    },
    Message(WireMessage),
    FunctionExecuted {
        function: WireFunction,
        function_execution_id: String,
        #[serde(default)]
        inputs: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireAssistantThread {
    channel_id: String,
    thread_ts: String,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    channel: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    callback_id: String,
}

/// Decode an events request body.
pub fn parse_envelope(body: &[u8]) -> Result<Envelope, ChannelError> {
    let wire: WireEnvelope =
        serde_json::from_slice(body).map_err(|e| ChannelError::InvalidPayload(e.to_string()))?;

    match wire {
        WireEnvelope::UrlVerification { challenge } => Ok(Envelope::Challenge(challenge)),
        WireEnvelope::EventCallback { event_id, event } => Ok(match event_from_wire(event)? {
            Some(event) => Envelope::Event { event_id, event },
            None => Envelope::Ignored,
        }),
        WireEnvelope::Other => Ok(Envelope::Ignored),
    }
}

fn event_from_wire(event: WireEvent) -> Result<Option<InboundEvent>, ChannelError> {
    let event = match event {
        WireEvent::AssistantThreadStarted { assistant_thread } => InboundEvent::ThreadStarted(
            ThreadRef::new(assistant_thread.channel_id, assistant_thread.thread_ts),
        ),

        // Only plain messages inside a thread belong to an assistant conversation.
        WireEvent::Message(message) => {
            let Some(thread_ts) = message.thread_ts else {
                return Ok(None);
            };
            if message
                .subtype
                .as_deref()
                .is_some_and(|subtype| subtype != "bot_message")
            {
                return Ok(None);
            }
            InboundEvent::Message(InboundMessage {
                text: message.text,
                thread: ThreadRef::new(message.channel, thread_ts),
                author_is_bot: message.bot_id.is_some(),
                user_id: message.user,
            })
        }

        WireEvent::FunctionExecuted {
            function,
            function_execution_id,
            inputs,
        } => {
            let inputs: FunctionInputs = serde_json::from_value(inputs).map_err(|e| {
                ChannelError::InvalidPayload(format!(
                    "function {} inputs: {e}",
                    function.callback_id
                ))
            })?;
            InboundEvent::FunctionExecuted(FunctionInvocation {
                execution_id: function_execution_id,
                callback_id: function.callback_id,
                inputs,
            })
        }

        WireEvent::Other => return Ok(None),
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Envelope {
        parse_envelope(value.to_string().as_bytes()).unwrap()
    }

    fn callback(event: serde_json::Value) -> Envelope {
        parse(json!({"type": "event_callback", "team_id": "T1", "event": event}))
    }

    #[test]
    fn url_verification() {
        let envelope = parse(json!({"type": "url_verification", "token": "t", "challenge": "abc123"}));
        assert!(matches!(envelope, Envelope::Challenge(c) if c == "abc123"));
    }

    #[test]
    fn event_id_is_kept() {
        let envelope = parse(json!({
            "type": "event_callback",
            "event_id": "Ev08MFMKH6",
            "event": {"type": "message", "channel": "D1", "text": "hi", "ts": "2.0", "thread_ts": "1.0"}
        }));
        assert!(matches!(
            envelope,
            Envelope::Event { event_id: Some(ref id), .. } if id == "Ev08MFMKH6"
        ));
    }

    #[test]
    fn thread_started() {
        let envelope = callback(json!({
            "type": "assistant_thread_started",
            "assistant_thread": {
                "user_id": "U1",
                "context": {"channel_id": "C9"},
                "channel_id": "D1",
                "thread_ts": "1729999327.187299"
            },
            "event_ts": "1715873754.429808"
        }));
        match envelope {
            Envelope::Event { event: InboundEvent::ThreadStarted(thread), .. } => {
                assert_eq!(thread, ThreadRef::new("D1", "1729999327.187299"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn user_message_in_thread() {
        let envelope = callback(json!({
            "type": "message",
            "channel": "D1",
            "user": "U1",
            "text": "How do I reverse a Vec?",
            "ts": "2.0",
            "thread_ts": "1.0",
            "channel_type": "im"
        }));
        match envelope {
            Envelope::Event { event: InboundEvent::Message(m), .. } => {
                assert_eq!(m.text, "How do I reverse a Vec?");
                assert_eq!(m.thread, ThreadRef::new("D1", "1.0"));
                assert!(!m.author_is_bot);
                assert_eq!(m.user_id.as_deref(), Some("U1"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bot_message_is_flagged() {
        let envelope = callback(json!({
            "type": "message",
            "subtype": "bot_message",
            "channel": "D1",
            "bot_id": "B1",
            "text": "Hi, how can I help?",
            "ts": "2.0",
            "thread_ts": "1.0"
        }));
        assert!(matches!(
            envelope,
            Envelope::Event { event: InboundEvent::Message(m), .. } if m.author_is_bot
        ));
    }

    #[test]
    fn unthreaded_and_edited_messages_are_ignored() {
        let top_level = callback(json!({"type": "message", "channel": "C1", "text": "hi", "ts": "1.0"}));
        assert!(matches!(top_level, Envelope::Ignored));

        let edited = callback(json!({
            "type": "message",
            "subtype": "message_changed",
            "channel": "D1",
            "ts": "3.0",
            "thread_ts": "1.0"
        }));
        assert!(matches!(edited, Envelope::Ignored));
    }

    #[test]
    fn function_with_question() {
        let envelope = callback(json!({
            "type": "function_executed",
            "function": {"id": "Fn1", "callback_id": "code_assist", "title": "Code Assist"},
            "inputs": {"question": "What is a lifetime?"},
            "function_execution_id": "Fx1",
            "event_ts": "1.0"
        }));
        match envelope {
            Envelope::Event { event: InboundEvent::FunctionExecuted(f), .. } => {
                assert_eq!(f.execution_id, "Fx1");
                assert_eq!(f.callback_id, "code_assist");
                assert_eq!(
                    f.inputs,
                    FunctionInputs::Question {
                        question: "What is a lifetime?".into()
                    }
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn function_with_message_reference() {
        let envelope = callback(json!({
            "type": "function_executed",
            "function": {"callback_id": "code_assist"},
            "inputs": {"channel_id": "C1", "message_ts": "5.5"},
            "function_execution_id": "Fx2"
        }));
        assert!(matches!(
            envelope,
            Envelope::Event {
                event: InboundEvent::FunctionExecuted(FunctionInvocation {
                    inputs: FunctionInputs::MessageRef { .. },
                    ..
                }),
                ..
            }
        ));
    }

    #[test]
    fn function_with_unknown_inputs_is_invalid() {
        let body = json!({
            "type": "event_callback",
            "event": {
                "type": "function_executed",
                "function": {"callback_id": "code_assist"},
                "inputs": {"something": 1},
                "function_execution_id": "Fx3"
            }
        });
        let err = parse_envelope(body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPayload(_)));
    }

    #[test]
    fn unknown_types_are_ignored() {
        assert!(matches!(parse(json!({"type": "app_rate_limited"})), Envelope::Ignored));
        assert!(matches!(
            callback(json!({"type": "reaction_added", "reaction": "tada"})),
            Envelope::Ignored
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let err = parse_envelope(b"not json").unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPayload(_)));
    }
}
