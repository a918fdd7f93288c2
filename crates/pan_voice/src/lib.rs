//! Voice module for Pan
//!
//! Provides speech capture (STT) and synthesis (TTS) abstractions. The
//! bundled implementations are line-oriented console stand-ins; real engines
//! plug in behind the same traits.

mod stt;
mod tts;

pub use stt::{LineMicrophone, SpeechToText};
pub use tts::{ConsoleSpeaker, TextToSpeech};
