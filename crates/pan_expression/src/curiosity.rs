//! Topics the assistant wants to look into on its own.

use pan_core::text::normalize_key;
use std::collections::{HashSet, VecDeque};

const MAX_QUEUED: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct CuriosityQueue {
    unanswered: VecDeque<String>,
    interests: Vec<String>,
    /// Interests already looked into this session.
    explored: HashSet<String>,
}

impl CuriosityQueue {
    pub fn new<I, S>(interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = Vec::new();
        for interest in interests {
            let key = normalize_key(interest.as_ref());
            if !key.is_empty() && !seen.contains(&key) {
                seen.push(key);
            }
        }
        Self {
            unanswered: VecDeque::new(),
            interests: seen,
            explored: HashSet::new(),
        }
    }

    /// Remember a topic that could not be answered. Oldest entries fall off.
    pub fn enqueue(&mut self, topic: &str) {
        let key = normalize_key(topic);
        if key.is_empty() || self.unanswered.contains(&key) {
            return;
        }
        if self.unanswered.len() == MAX_QUEUED {
            self.unanswered.pop_front();
        }
        tracing::debug!("Queued '{}' for later research", key);
        self.unanswered.push_back(key);
    }

    pub fn pop_unanswered(&mut self) -> Option<String> {
        self.unanswered.pop_front()
    }

    /// Drop a topic once it has been answered some other way.
    pub fn resolve(&mut self, topic: &str) {
        let key = normalize_key(topic);
        self.unanswered.retain(|t| *t != key);
    }

    pub fn unanswered(&self) -> impl Iterator<Item = &str> {
        self.unanswered.iter().map(String::as_str)
    }

    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    /// Interests not yet explored this session, in configured order.
    pub fn unexplored(&self) -> impl Iterator<Item = &str> {
        self.interests
            .iter()
            .filter(|i| !self.explored.contains(*i))
            .map(String::as_str)
    }

    pub fn mark_explored(&mut self, topic: &str) {
        let key = normalize_key(topic);
        if self.interests.contains(&key) {
            self.explored.insert(key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unanswered.is_empty() && self.interests.is_empty()
    }
}
