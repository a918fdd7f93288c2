use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A person the assistant has talked to. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Normalized (trimmed, lower-cased) unique name.
    pub name: String,
    /// Name as first spoken.
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub preferences: HashMap<String, String>,
}

impl User {
    pub fn preference(&self, key: &str) -> Option<&str> {
        self.preferences.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityRecord {
    pub user_id: Uuid,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    UserTold,
    SelfResearched,
}

impl MemorySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserTold => "user_told",
            Self::SelfResearched => "self_researched",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user_told" => Some(Self::UserTold),
            "self_researched" => Some(Self::SelfResearched),
            _ => None,
        }
    }
}

/// A memory about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub topic: String,
    pub content: String,
    pub source: MemorySource,
    pub user_id: Option<Uuid>,
    /// Caller's clock in epoch milliseconds. The store may bump it forward.
    pub created_at: i64,
}

/// A persisted memory. Append-only; the newest row per topic wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub topic: String,
    pub content: String,
    pub source: MemorySource,
    /// Epoch milliseconds, strictly increasing per topic.
    pub created_at: i64,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    pub topic: String,
    /// Stored verbatim.
    pub stance: String,
    /// Epoch milliseconds, strictly increasing per topic.
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArchiveEntry {
    pub id: i64,
    pub headline: String,
    pub source: String,
    pub fetched_at: i64,
}

impl From<&NewsArchiveEntry> for Headline {
    fn from(entry: &NewsArchiveEntry) -> Self {
        Self {
            title: entry.headline.clone(),
            source: entry.source.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub condition: String,
    /// Degrees Celsius.
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

/// One (utterance, response) pair in the short-term buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub utterance: String,
    pub response: String,
}

/// Milliseconds since the epoch.
pub fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
