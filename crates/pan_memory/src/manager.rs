use crate::short_term::ShortTermBuffer;
use crate::store::StoreHandle;
use pan_core::config::SeedOpinion;
use pan_core::text::{normalize_key, search_terms};
use pan_core::{Exchange, Headline, MemoryRecord, MemorySource, NewMemory, NewsArchiveEntry, Opinion};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Result of looking a topic up in long-term memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Recall {
    Found(MemoryRecord),
    Unknown,
    /// The store is down; only short-term memory is available.
    Degraded,
}

/// Short-term buffer plus the gateway to long-term memory, opinions and the
/// news archive. Never surfaces a store error to the caller.
pub struct MemoryManager {
    short_term: ShortTermBuffer,
    store: StoreHandle,
    long_term_limit: usize,
    /// Opinions changed while the store is degraded.
    session_opinions: BTreeMap<String, Opinion>,
}

impl MemoryManager {
    pub fn new(short_term_capacity: usize, long_term_limit: usize, store: StoreHandle) -> Self {
        Self {
            short_term: ShortTermBuffer::new(short_term_capacity),
            store,
            long_term_limit,
            session_opinions: BTreeMap::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }

    // ------------------------------------------------------------------------
    // Short-term
    // ------------------------------------------------------------------------

    pub fn record_exchange(&mut self, utterance: &str, response: &str) {
        self.short_term.push(utterance, response);
    }

    pub fn short_term(&self) -> &ShortTermBuffer {
        &self.short_term
    }

    /// Exchanges worth replaying for `text`: every one sharing a keyword with
    /// it plus the last `recent`, in conversation order.
    pub fn context_exchanges(&self, text: &str, recent: usize) -> Vec<Exchange> {
        let relevant = self.short_term.relevant(text);
        let len = self.short_term.len();
        self.short_term
            .iter()
            .enumerate()
            .filter(|&(i, ex)| i + recent >= len || relevant.contains(ex))
            .map(|(_, ex)| ex.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Long-term
    // ------------------------------------------------------------------------

    pub async fn recall(&self, topic: &str) -> Recall {
        recall(&self.store, topic).await
    }

    /// Up to K long-term memories related to `topic`.
    pub async fn context_memories(&self, topic: &str) -> Vec<MemoryRecord> {
        let terms = search_terms(topic);
        let limit = self.long_term_limit;
        self.store
            .call("memory search", |s| async move {
                s.search_memories(&terms, limit).await
            })
            .await
            .unwrap_or_default()
    }

    /// Everything learned in `[from_ms, to_ms)`, oldest first.
    pub async fn history(&self, from_ms: i64, to_ms: i64) -> Vec<MemoryRecord> {
        self.store
            .call("memory range", |s| s.memories_between(from_ms, to_ms))
            .await
            .unwrap_or_default()
    }

    pub async fn remember(
        &self,
        topic: &str,
        content: &str,
        source: MemorySource,
        user_id: Option<Uuid>,
        now_ms: i64,
    ) -> Option<MemoryRecord> {
        remember(&self.store, topic, content, source, user_id, now_ms).await
    }

    // ------------------------------------------------------------------------
    // Opinions
    // ------------------------------------------------------------------------

    pub async fn seed_opinions(&self, seeds: &[SeedOpinion]) {
        for seed in seeds {
            let inserted = self
                .store
                .call("opinion seed", |s| s.seed_opinion(&seed.topic, &seed.stance))
                .await;
            if inserted == Some(true) {
                tracing::debug!("Seeded opinion on '{}'", seed.topic);
            }
        }
    }

    pub async fn opinion(&self, topic: &str) -> Option<Opinion> {
        let key = normalize_key(topic);
        if let Some(op) = self.session_opinions.get(&key) {
            return Some(op.clone());
        }
        self.store.call("opinion read", |s| s.opinion(&key)).await.flatten()
    }

    /// Set or replace a stance. Falls back to session memory when degraded.
    pub async fn set_opinion(&mut self, topic: &str, stance: &str, now_ms: i64) -> Opinion {
        let key = normalize_key(topic);
        if let Some(op) = self.store.call("opinion write", |s| s.upsert_opinion(&key, stance)).await {
            return op;
        }
        let updated_at = self
            .session_opinions
            .get(&key)
            .map_or(now_ms, |prev| now_ms.max(prev.updated_at + 1));
        let opinion = Opinion {
            topic: key.clone(),
            stance: stance.to_string(),
            updated_at,
        };
        self.session_opinions.insert(key, opinion.clone());
        opinion
    }

    pub async fn opinions(&self) -> Vec<Opinion> {
        let mut all: BTreeMap<String, Opinion> = self
            .store
            .call("opinion list", |s| s.opinions())
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|op| (op.topic.clone(), op))
            .collect();
        for (k, op) in &self.session_opinions {
            all.insert(k.clone(), op.clone());
        }
        all.into_values().collect()
    }

    // ------------------------------------------------------------------------
    // News archive
    // ------------------------------------------------------------------------

    pub async fn archive_news(&self, headlines: &[Headline]) -> bool {
        self.store
            .call("news archive write", |s| s.archive_headlines(headlines))
            .await
            .is_some()
    }

    pub async fn latest_news_batch(&self, limit: usize) -> Vec<NewsArchiveEntry> {
        self.store
            .call("news archive read", |s| s.latest_news_batch(limit))
            .await
            .unwrap_or_default()
    }

    pub async fn recent_news(&self, limit: usize) -> Vec<NewsArchiveEntry> {
        self.store
            .call("news archive list", |s| s.recent_news(limit))
            .await
            .unwrap_or_default()
    }
}

/// Most recent memory for a topic.
pub async fn recall(store: &StoreHandle, topic: &str) -> Recall {
    if store.is_degraded() {
        return Recall::Degraded;
    }
    let key = normalize_key(topic);
    match store.call("memory read", |s| s.latest_memory(&key)).await {
        Some(Some(record)) => Recall::Found(record),
        Some(None) => Recall::Unknown,
        None => Recall::Degraded,
    }
}

/// Append a memory. Usable without holding the core lock.
pub async fn remember(
    store: &StoreHandle,
    topic: &str,
    content: &str,
    source: MemorySource,
    user_id: Option<Uuid>,
    now_ms: i64,
) -> Option<MemoryRecord> {
    let memory = NewMemory {
        topic: normalize_key(topic),
        content: content.to_string(),
        source,
        user_id,
        created_at: now_ms,
    };
    store.call("memory write", |s| s.insert_memory(&memory)).await
}
