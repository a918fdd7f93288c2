//! # Pan Core
//!
//! Shared vocabulary for every Pan crate: the persisted records, the mood and
//! tone types, the structured reply, configuration, and the capability traits
//! that external collaborators (speech, HTTP services, the language model,
//! the persistent store) implement.

pub mod affect;
pub mod config;
pub mod error;
pub mod records;
pub mod reply;
pub mod sentiment;
pub mod text;

pub use affect::{MoodLabel, MoodState, Pace, Polarity, Tone};
pub use config::PanConfig;
pub use error::{CapabilityError, CaptureError, ConfigError, SpeechError};
pub use records::{
    AffinityRecord, Exchange, Headline, MemoryRecord, MemorySource, NewMemory, NewsArchiveEntry,
    Opinion, SearchHit, User, WeatherReport,
};
pub use reply::{CommandKind, Reply};

use async_trait::async_trait;
use uuid::Uuid;

// ============================================================================
// External capabilities
// ============================================================================

#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherReport, CapabilityError>;
}

#[async_trait]
pub trait NewsService: Send + Sync {
    /// Latest headlines, most important first.
    async fn fetch_news(&self, limit: usize) -> Result<Vec<Headline>, CapabilityError>;
}

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Ordered results, best match first.
    async fn web_search(&self, query: &str) -> Result<Vec<SearchHit>, CapabilityError>;
}

/// Everything a generator needs besides the prompt itself.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub assistant_name: String,
    pub user_name: String,
    pub tone: Tone,
    pub mood_description: String,
    pub recent_exchanges: Vec<Exchange>,
    pub memories: Vec<MemoryRecord>,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        context: &GenerationContext,
    ) -> Result<String, CapabilityError>;

    fn name(&self) -> &str;
}

// ============================================================================
// Persistent store
// ============================================================================

/// Keyed storage for users, affinity, memories, opinions and the news archive.
///
/// Every method is a single-row insert, upsert or read; implementations rely
/// on the engine's own statement atomicity.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Upsert by normalized name. Returns the user and whether it was created.
    /// `last_seen` never moves backwards.
    async fn resolve_user(&self, name: &str, display_name: &str) -> anyhow::Result<(User, bool)>;

    async fn set_user_preference(&self, user_id: Uuid, key: &str, value: &str)
        -> anyhow::Result<()>;

    /// Returns the record, creating it with `initial` when missing.
    async fn affinity(&self, user_id: Uuid, initial: i64) -> anyhow::Result<AffinityRecord>;

    /// Add `delta` and clamp to `[min, max]`, creating the record from
    /// `initial` when missing.
    async fn adjust_affinity(
        &self,
        user_id: Uuid,
        delta: i64,
        initial: i64,
        min: i64,
        max: i64,
    ) -> anyhow::Result<AffinityRecord>;

    /// Users whose score is at least `threshold`, highest first.
    async fn users_with_affinity_at_least(
        &self,
        threshold: i64,
    ) -> anyhow::Result<Vec<(User, i64)>>;

    async fn insert_memory(&self, memory: &NewMemory) -> anyhow::Result<MemoryRecord>;

    /// Most recent memory for a topic key.
    async fn latest_memory(&self, topic: &str) -> anyhow::Result<Option<MemoryRecord>>;

    /// Latest memory per matching topic, newest first, for any of `terms`.
    async fn search_memories(&self, terms: &[String], limit: usize)
        -> anyhow::Result<Vec<MemoryRecord>>;

    /// Every memory with `from_ms <= created_at < to_ms`, oldest first.
    async fn memories_between(&self, from_ms: i64, to_ms: i64) -> anyhow::Result<Vec<MemoryRecord>>;

    async fn upsert_opinion(&self, topic: &str, stance: &str) -> anyhow::Result<Opinion>;

    /// Insert only when the topic has no opinion yet. Returns true if inserted.
    async fn seed_opinion(&self, topic: &str, stance: &str) -> anyhow::Result<bool>;

    async fn opinion(&self, topic: &str) -> anyhow::Result<Option<Opinion>>;

    async fn opinions(&self) -> anyhow::Result<Vec<Opinion>>;

    /// Append one batch of headlines sharing a single fetch timestamp.
    async fn archive_headlines(&self, headlines: &[Headline]) -> anyhow::Result<Vec<NewsArchiveEntry>>;

    /// Entries of the most recent fetch batch.
    async fn latest_news_batch(&self, limit: usize) -> anyhow::Result<Vec<NewsArchiveEntry>>;

    /// Most recent archive entries across batches, newest first.
    async fn recent_news(&self, limit: usize) -> anyhow::Result<Vec<NewsArchiveEntry>>;
}
