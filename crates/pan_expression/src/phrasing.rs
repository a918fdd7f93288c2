//! Mood-dependent framing of reply text.
//!
//! Framing only ever adds a lead-in around the text; the text itself is
//! passed through untouched so quoted stances, headlines and temperatures
//! survive any mood.

use pan_core::{MoodLabel, Tone};

fn lead_in(label: MoodLabel) -> Option<&'static str> {
    match label {
        MoodLabel::Happy => Some("Oh! "),
        MoodLabel::Sad => Some("Well... "),
        MoodLabel::Curious => Some("Hmm, "),
        MoodLabel::Annoyed => Some("Fine. "),
        MoodLabel::Neutral => None,
    }
}

/// Frame `text` for the given tone.
pub fn apply_tone(text: &str, tone: &Tone) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    match lead_in(tone.label) {
        Some(prefix) if !text.starts_with(prefix.trim_end()) => {
            let mut framed = String::with_capacity(prefix.len() + text.len() + 1);
            framed.push_str(prefix);
            framed.push_str(text);
            if tone.label == MoodLabel::Happy && framed.ends_with('.') {
                framed.pop();
                framed.push('!');
            }
            framed
        }
        _ => text.to_string(),
    }
}

/// Greeting for the hour of day (0..=23).
pub fn time_of_day_greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_moods_frame_differently() {
        let text = "It is 15°C and clear.";
        assert_eq!(apply_tone(text, &MoodLabel::Neutral.tone()), text);
        assert_eq!(apply_tone(text, &MoodLabel::Sad.tone()), "Well... It is 15°C and clear.");
        assert_eq!(apply_tone(text, &MoodLabel::Happy.tone()), "Oh! It is 15°C and clear!");
        assert!(apply_tone(text, &MoodLabel::Annoyed.tone()).starts_with("Fine."));
    }

    #[test]
    fn test_no_double_framing() {
        let once = apply_tone("there you go", &MoodLabel::Sad.tone());
        assert_eq!(apply_tone(&once, &MoodLabel::Sad.tone()), once);
    }

    #[test]
    fn test_greeting_by_hour() {
        assert_eq!(time_of_day_greeting(8), "Good morning");
        assert_eq!(time_of_day_greeting(13), "Good afternoon");
        assert_eq!(time_of_day_greeting(22), "Good evening");
        assert_eq!(time_of_day_greeting(2), "Good evening");
    }

    proptest! {
        #[test]
        fn quoted_content_survives(body in "[a-zA-Z0-9 ,']{1,40}") {
            let quoted = format!("I think \"{}\"", body);
            for label in [MoodLabel::Neutral, MoodLabel::Happy, MoodLabel::Sad, MoodLabel::Curious, MoodLabel::Annoyed] {
                let out = apply_tone(&quoted, &label.tone());
                let needle = format!("\"{}\"", body);
                prop_assert!(out.contains(&needle));
            }
        }
    }
}
