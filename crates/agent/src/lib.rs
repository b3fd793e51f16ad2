//! The CodeRelay turn pipeline.
//!
//! One inbound Slack event becomes one outbound action:
//!
//! 1. **Assemble** an ordered, role-tagged prompt from thread history or a
//!    single looked-up message ([`assembler`])
//! 2. **Invoke** the model once with the configured limits ([`invoker`])
//! 3. **Transpile** the Markdown answer to Slack mrkdwn
//! 4. **Dispatch** it: `say` in the thread, or `complete`/`fail` a workflow
//!    step ([`handler`])

pub mod assembler;
pub mod handler;
pub mod invoker;

pub use assembler::{assemble_from_lookup, assemble_from_thread};
pub use handler::{TurnError, TurnHandler};
pub use invoker::InferenceInvoker;

#[cfg(test)]
pub(crate) mod test_helpers;
