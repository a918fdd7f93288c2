//! # Pan Reasoning
//!
//! The conversation core. An utterance flows through
//!
//! 1. the [`UserResolver`](pan_memory::UserResolver) (who is speaking),
//! 2. the [`CommandRouter`] (what they want),
//! 3. a handler or the [`Generator`](pan_core::Generator) (what to say),
//! 4. tone framing, the short-term buffer and the mood update,
//!
//! and comes out as a [`Reply`](pan_core::Reply). The [`IdleLoop`] runs
//! alongside and speaks up on its own when the user has been quiet.

pub mod engine;
mod handlers;
pub mod idle;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod router;

pub use engine::{Capabilities, ConversationEngine, CoreState};
pub use idle::{IdleLoop, IdleOutcome};
pub use llm::{ChatMessage, CompletionParams, LlmClient, LlmGenerator};
pub use router::{Command, CommandRouter, CommandRule, SmallTalk};
