//! Simple keyword-based English sentiment analysis.
//!
//! Shared across crates to avoid duplicating word lists. Feeds both the
//! affinity nudge (warm / neutral / hostile) and the mood engine (polarity).

use crate::affect::Polarity;

const POSITIVE: &[&str] = &[
    "thanks", "thank", "great", "love", "awesome", "nice", "good", "wonderful", "amazing",
    "happy", "glad", "cool", "brilliant", "excellent", "appreciate", "fantastic", "kind",
];

const NEGATIVE: &[&str] = &[
    "hate", "stupid", "idiot", "useless", "terrible", "awful", "dumb", "shut", "annoying",
    "worst", "bad", "sad", "angry", "upset", "horrible", "down", "lonely",
];

/// Words aimed at the assistant rather than describing the speaker's day.
const HOSTILE: &[&str] = &["hate you", "stupid", "idiot", "useless", "shut up", "dumb", "worst"];

const INQUISITIVE: &[&str] = &[
    "why", "how", "what", "explain", "tell me about", "curious", "wonder", "learn", "research",
];

const INTENSE: &[&str] = &["very", "really", "so", "extremely", "totally", "!"];

/// How the interaction treats the assistant, for affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warmth {
    Warm,
    Neutral,
    Hostile,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    /// In `[-1.0, 1.0]`
    pub valence: f32,
    /// In `[0.1, 1.0]`
    pub intensity: f32,
    pub polarity: Polarity,
    pub warmth: Warmth,
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Counts whole-word hits for single words and substring hits for phrases.
fn count_hits(lower: &str, tokens: &[String], list: &[&str]) -> usize {
    list.iter()
        .filter(|needle| {
            if needle.contains(' ') || !needle.chars().all(char::is_alphanumeric) {
                lower.contains(*needle)
            } else {
                tokens.iter().any(|t| t == *needle)
            }
        })
        .count()
}

/// Analyze text for emotional valence and intensity.
///
/// Returns `(valence, intensity)` where:
/// - `valence` is in `[-1.0, 1.0]` (negative to positive)
/// - `intensity` is in `[0.1, 1.0]`
pub fn analyze_sentiment(text: &str) -> (f32, f32) {
    let lower = text.to_lowercase();
    let tokens = words(&lower);
    let pos = count_hits(&lower, &tokens, POSITIVE) as f32;
    let neg = count_hits(&lower, &tokens, NEGATIVE) as f32;
    let int = count_hits(&lower, &tokens, INTENSE) as f32;

    let valence = (pos - neg) / (pos + neg + 1.0);
    let intensity = ((pos + neg + int) / 5.0).clamp(0.1, 1.0);

    (valence, intensity)
}

/// Full classification of one utterance.
pub fn classify(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let tokens = words(&lower);
    let (valence, intensity) = analyze_sentiment(text);

    let hostile = count_hits(&lower, &tokens, HOSTILE) > 0;
    let warmth = if hostile {
        Warmth::Hostile
    } else if valence > 0.0 {
        Warmth::Warm
    } else {
        Warmth::Neutral
    };

    let polarity = if valence > 0.0 {
        Polarity::Positive
    } else if valence < 0.0 {
        Polarity::Negative
    } else if lower.trim_end().ends_with('?') || count_hits(&lower, &tokens, INQUISITIVE) > 0 {
        Polarity::Inquisitive
    } else {
        Polarity::Neutral
    };

    Sentiment {
        valence,
        intensity,
        polarity,
        warmth,
    }
}
