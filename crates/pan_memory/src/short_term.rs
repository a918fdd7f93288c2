use pan_core::text::keywords;
use pan_core::Exchange;
use std::collections::VecDeque;

/// The last N exchanges, oldest evicted first.
#[derive(Debug, Clone)]
pub struct ShortTermBuffer {
    capacity: usize,
    exchanges: VecDeque<Exchange>,
}

impl ShortTermBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            exchanges: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, utterance: impl Into<String>, response: impl Into<String>) {
        if self.exchanges.len() == self.capacity {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            utterance: utterance.into(),
            response: response.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn latest(&self) -> Option<&Exchange> {
        self.exchanges.back()
    }

    /// Exchanges sharing a keyword with `text`, most recent first.
    pub fn relevant(&self, text: &str) -> Vec<Exchange> {
        let wanted = keywords(text);
        if wanted.is_empty() {
            return Vec::new();
        }
        self.exchanges
            .iter()
            .rev()
            .filter(|ex| {
                let haystack = format!("{} {}", ex.utterance, ex.response).to_lowercase();
                wanted.iter().any(|w| haystack.contains(w.as_str()))
            })
            .cloned()
            .collect()
    }

    pub fn to_vec(&self) -> Vec<Exchange> {
        self.exchanges.iter().cloned().collect()
    }
}
