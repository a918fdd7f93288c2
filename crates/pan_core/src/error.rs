use thiserror::Error;

/// Failure of an external service (weather, news, search, generation).
///
/// Network failures, bad payloads and missing API keys all collapse into
/// `Unavailable`; callers only ever need to know whether they can fall back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("{capability} unavailable: {reason}")]
    Unavailable { capability: String, reason: String },
    #[error("{capability} timed out")]
    TimedOut { capability: String },
}

impl CapabilityError {
    pub fn unavailable(capability: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            capability: capability.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timed_out(capability: impl Into<String>) -> Self {
        Self::TimedOut {
            capability: capability.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("no speech detected")]
    NoSpeechDetected,
    #[error("speech recognition failed: {0}")]
    Recognition(String),
    #[error("input closed")]
    Closed,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpeechError {
    #[error("speech synthesis unavailable: {0}")]
    SynthesisUnavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
