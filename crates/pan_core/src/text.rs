//! Small text helpers shared by the store, resolver and router.

/// Canonical key for names and topics: trimmed, inner whitespace collapsed,
/// lower-cased, trailing punctuation dropped.
pub fn normalize_key(raw: &str) -> String {
    raw.trim_end_matches(|c: char| matches!(c, '?' | '!' | '.' | ',') || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lower-cased alphanumeric words, for keyword relevance scans.
pub fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// The normalized topic followed by its distinct keywords.
pub fn search_terms(topic: &str) -> Vec<String> {
    let mut terms = vec![normalize_key(topic)];
    for word in keywords(topic) {
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

const STOP_WORDS: &[&str] = &[
    "the", "and", "you", "your", "are", "what", "how", "about", "tell", "that", "this", "with",
    "for", "can", "was", "who", "why", "does", "did", "have", "has", "know", "please", "me",
];
