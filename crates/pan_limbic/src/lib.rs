//! # Pan Limbic System
//!
//! Fast, non-verbal state regulation for the assistant. A single
//! [`MoodEngine`] owns the process-wide [`MoodState`](pan_core::MoodState) and
//! moves it in response to interaction events:
//!
//! - sentiment of an utterance (positive, negative, inquisitive, neutral)
//! - affinity shifts toward the current speaker
//! - capability failures and unrecognized input, which hold the mood
//! - elapsed idle time, which decays intensity toward the baseline
//!
//! The engine is a plain state machine; callers own it and serialize access.

mod engine;

pub use engine::{MoodEngine, MoodEvent};
