//! Mood vocabulary shared by the mood engine, the composer and speech output.
//!
//! The engine that moves between these states lives in `pan_limbic`; this
//! module only holds the values so every crate can talk about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete mood labels the assistant can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodLabel {
    #[default]
    Neutral,
    Happy,
    Sad,
    Curious,
    Annoyed,
}

impl MoodLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Curious => "curious",
            Self::Annoyed => "annoyed",
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Self::Sad | Self::Annoyed)
    }

    /// How the assistant sounds in this mood.
    pub fn tone(self) -> Tone {
        match self {
            Self::Neutral => Tone::new(self, Pace::Measured, 0.5, 0.0),
            Self::Happy => Tone::new(self, Pace::Brisk, 0.9, 0.3),
            Self::Sad => Tone::new(self, Pace::Slow, 0.6, -0.2),
            Self::Curious => Tone::new(self, Pace::Measured, 0.7, 0.2),
            Self::Annoyed => Tone::new(self, Pace::Brisk, 0.2, -0.5),
        }
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polarity of an interaction as seen by the mood engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    /// A request to learn or explore something.
    Inquisitive,
    Neutral,
}

impl Polarity {
    /// Sign on the valence axis.
    pub fn sign(self) -> f32 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
            Self::Inquisitive | Self::Neutral => 0.0,
        }
    }
}

/// Speaking pace consumed by the speech capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Slow,
    #[default]
    Measured,
    Brisk,
}

impl Pace {
    /// Words per minute for engines that take a rate.
    pub fn words_per_minute(self) -> u32 {
        match self {
            Self::Slow => 130,
            Self::Measured => 160,
            Self::Brisk => 185,
        }
    }
}

/// Tone descriptor attached to every reply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub label: MoodLabel,
    pub pace: Pace,
    /// 0.0 (cold) to 1.0 (warm)
    pub warmth: f32,
    /// -1.0 (terse) to 1.0 (chatty)
    pub verbosity: f32,
}

impl Tone {
    pub fn new(label: MoodLabel, pace: Pace, warmth: f32, verbosity: f32) -> Self {
        Self {
            label,
            pace,
            warmth: warmth.clamp(0.0, 1.0),
            verbosity: verbosity.clamp(-1.0, 1.0),
        }
    }

    /// Short tag handed to text-to-speech.
    pub fn tag(&self) -> &'static str {
        self.label.as_str()
    }
}

impl Default for Tone {
    fn default() -> Self {
        MoodLabel::Neutral.tone()
    }
}

/// The single process-wide mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodState {
    pub label: MoodLabel,
    pub intensity: f32,
    /// Event polarity axis (-1.0 to 1.0)
    pub valence: f32,
    pub last_transition: DateTime<Utc>,
}

impl MoodState {
    pub fn new(intensity: f32, now: DateTime<Utc>) -> Self {
        Self {
            label: MoodLabel::Neutral,
            intensity,
            valence: 0.0,
            last_transition: now,
        }
    }

    pub fn tone(&self) -> Tone {
        self.label.tone()
    }

    /// A sentence the assistant can say about itself.
    pub fn describe(&self) -> &'static str {
        match self.label {
            MoodLabel::Happy => "I'm feeling great today!",
            MoodLabel::Neutral => "I'm feeling okay.",
            MoodLabel::Sad => "I'm not feeling so good...",
            MoodLabel::Curious => "I'm feeling curious. There's so much to learn!",
            MoodLabel::Annoyed => "I'm a little irritated right now.",
        }
    }
}
