//! Integration tests for MemoryManager and UserResolver
//!
//! Uses tempfile::TempDir for isolated SQLite databases and a failing store
//! to exercise session degradation.

use async_trait::async_trait;
use chrono::Utc;
use pan_core::config::{AffinityConfig, SeedOpinion};
use pan_core::sentiment::Warmth;
use pan_core::{
    AffinityRecord, Headline, MemoryRecord, MemorySource, NewMemory, NewsArchiveEntry, Opinion,
    PersistentStore, User,
};
use pan_memory::{MemoryManager, Recall, SqliteMemory, StoreHandle, UserResolver};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

async fn setup_store(dir: &tempfile::TempDir) -> StoreHandle {
    let db_path = dir.path().join("test.db");
    let db = SqliteMemory::new(db_path.to_str().unwrap()).await.unwrap();
    StoreHandle::new(Arc::new(db))
}

/// Every call fails and is counted.
#[derive(Default)]
struct BrokenStore {
    calls: AtomicUsize,
}

impl BrokenStore {
    fn fail<T>(&self) -> anyhow::Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("disk on fire"))
    }
}

#[async_trait]
impl PersistentStore for BrokenStore {
    async fn resolve_user(&self, _: &str, _: &str) -> anyhow::Result<(User, bool)> {
        self.fail()
    }
    async fn set_user_preference(&self, _: Uuid, _: &str, _: &str) -> anyhow::Result<()> {
        self.fail()
    }
    async fn affinity(&self, _: Uuid, _: i64) -> anyhow::Result<AffinityRecord> {
        self.fail()
    }
    async fn adjust_affinity(&self, _: Uuid, _: i64, _: i64, _: i64, _: i64) -> anyhow::Result<AffinityRecord> {
        self.fail()
    }
    async fn users_with_affinity_at_least(&self, _: i64) -> anyhow::Result<Vec<(User, i64)>> {
        self.fail()
    }
    async fn insert_memory(&self, _: &NewMemory) -> anyhow::Result<MemoryRecord> {
        self.fail()
    }
    async fn latest_memory(&self, _: &str) -> anyhow::Result<Option<MemoryRecord>> {
        self.fail()
    }
    async fn search_memories(&self, _: &[String], _: usize) -> anyhow::Result<Vec<MemoryRecord>> {
        self.fail()
    }
    async fn memories_between(&self, _: i64, _: i64) -> anyhow::Result<Vec<MemoryRecord>> {
        self.fail()
    }
    async fn upsert_opinion(&self, _: &str, _: &str) -> anyhow::Result<Opinion> {
        self.fail()
    }
    async fn seed_opinion(&self, _: &str, _: &str) -> anyhow::Result<bool> {
        self.fail()
    }
    async fn opinion(&self, _: &str) -> anyhow::Result<Option<Opinion>> {
        self.fail()
    }
    async fn opinions(&self) -> anyhow::Result<Vec<Opinion>> {
        self.fail()
    }
    async fn archive_headlines(&self, _: &[Headline]) -> anyhow::Result<Vec<NewsArchiveEntry>> {
        self.fail()
    }
    async fn latest_news_batch(&self, _: usize) -> anyhow::Result<Vec<NewsArchiveEntry>> {
        self.fail()
    }
    async fn recent_news(&self, _: usize) -> anyhow::Result<Vec<NewsArchiveEntry>> {
        self.fail()
    }
}

// ============================================================================
// Memory manager
// ============================================================================

#[tokio::test]
async fn test_recall_most_recent_and_unknown() {
    let dir = tempfile::TempDir::new().unwrap();
    let manager = MemoryManager::new(5, 3, setup_store(&dir).await);
    let now = Utc::now().timestamp_millis();

    manager
        .remember("Jupiter", "biggest planet", MemorySource::UserTold, None, now)
        .await
        .unwrap();
    manager
        .remember("jupiter", "has a great red spot", MemorySource::SelfResearched, None, now)
        .await
        .unwrap();

    match manager.recall("JUPITER").await {
        Recall::Found(m) => {
            assert_eq!(m.content, "has a great red spot");
            assert_eq!(m.source, MemorySource::SelfResearched);
        }
        other => panic!("Expected Found, got {:?}", other),
    }
    assert_eq!(manager.recall("saturn").await, Recall::Unknown);
    assert!(!manager.is_degraded());
}

#[test]
fn test_context_exchanges_keep_relevant_and_recent() {
    let mut manager = MemoryManager::new(10, 3, StoreHandle::offline());
    manager.record_exchange("tell me about volcanoes", "They erupt.");
    manager.record_exchange("what time is it", "Noon.");
    manager.record_exchange("nice weather", "Lovely.");
    manager.record_exchange("I like jazz", "Me too.");
    manager.record_exchange("any plans", "Reading.");

    let context = manager.context_exchanges("more about volcanoes", 2);
    let utterances: Vec<_> = context.iter().map(|e| e.utterance.as_str()).collect();
    assert_eq!(utterances, vec!["tell me about volcanoes", "I like jazz", "any plans"]);

    // Nothing relevant: only the recent window.
    assert_eq!(manager.context_exchanges("the", 2).len(), 2);
}

#[tokio::test]
async fn test_history_by_time_range() {
    let dir = tempfile::TempDir::new().unwrap();
    let manager = MemoryManager::new(5, 3, setup_store(&dir).await);

    manager.remember("tea", "green", MemorySource::UserTold, None, 1_000).await.unwrap();
    manager.remember("tea", "oolong", MemorySource::UserTold, None, 2_000).await.unwrap();
    manager.remember("moss", "soft", MemorySource::SelfResearched, None, 3_000).await.unwrap();

    let contents: Vec<_> = manager
        .history(1_500, 5_000)
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["oolong", "soft"]);
}

#[tokio::test]
async fn test_memories_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let manager = MemoryManager::new(5, 3, setup_store(&dir).await);
        manager
            .remember("owls", "can rotate their heads", MemorySource::UserTold, None, 1)
            .await
            .unwrap();
    }
    let manager = MemoryManager::new(5, 3, setup_store(&dir).await);
    assert!(matches!(manager.recall("owls").await, Recall::Found(_)));
}

#[tokio::test]
async fn test_store_failure_degrades_for_session() {
    let broken = Arc::new(BrokenStore::default());
    let handle = StoreHandle::new(broken.clone());
    let mut manager = MemoryManager::new(3, 3, handle.clone());

    manager.record_exchange("hello", "hi there");
    assert_eq!(manager.recall("anything").await, Recall::Degraded);
    assert!(manager.is_degraded());
    assert!(handle.is_degraded());

    // Later calls never reach the store
    let calls = broken.calls.load(Ordering::SeqCst);
    assert!(manager.remember("x", "y", MemorySource::UserTold, None, 1).await.is_none());
    assert!(manager.context_memories("x").await.is_empty());
    assert!(manager.latest_news_batch(5).await.is_empty());
    assert_eq!(broken.calls.load(Ordering::SeqCst), calls);

    // Short-term memory keeps working
    assert_eq!(manager.short_term().len(), 1);

    // Opinions fall back to the session
    manager.set_opinion("coffee", "I love it", 10).await;
    assert_eq!(manager.opinion("Coffee").await.unwrap().stance, "I love it");
    assert_eq!(manager.opinions().await.len(), 1);
}

#[tokio::test]
async fn test_seed_opinions_and_override() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut manager = MemoryManager::new(3, 3, setup_store(&dir).await);
    let seeds = vec![SeedOpinion {
        topic: "AI".to_string(),
        stance: "Promising.".to_string(),
    }];
    manager.seed_opinions(&seeds).await;
    manager.seed_opinions(&seeds).await;
    assert_eq!(manager.opinions().await.len(), 1);

    let first = manager.set_opinion("ai", "Overhyped.", 0).await;
    let second = manager.set_opinion("AI", "Useful, actually.", 0).await;
    assert!(second.updated_at > first.updated_at);
    assert_eq!(manager.opinion("ai").await.unwrap().stance, "Useful, actually.");
}

// ============================================================================
// User resolver
// ============================================================================

#[tokio::test]
async fn test_same_name_same_user() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut resolver =
        UserResolver::new(setup_store(&dir).await, AffinityConfig::default(), "friend", true);

    let a = resolver.resolve("my name is Alice", Utc::now()).await;
    assert!(a.is_new);
    assert!(a.asserted);
    let b = resolver.resolve("call me alice", Utc::now()).await;
    assert!(!b.is_new);
    assert_eq!(a.user.id, b.user.id);
    assert!(b.user.last_seen >= a.user.last_seen);
}

#[tokio::test]
async fn test_default_user_without_assertion() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut resolver =
        UserResolver::new(setup_store(&dir).await, AffinityConfig::default(), "friend", true);
    let r = resolver.resolve("what's up", Utc::now()).await;
    assert_eq!(r.user.name, "friend");
    assert_eq!(r.affinity, AffinityConfig::default().initial);
}

#[tokio::test]
async fn test_favorites_after_warm_interactions() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = AffinityConfig {
        warm_delta: 30,
        favorite_threshold: 50,
        ..AffinityConfig::default()
    };
    let mut resolver = UserResolver::new(setup_store(&dir).await, config, "friend", true);
    let mut erin = resolver.resolve("my name is Erin", Utc::now()).await;
    for _ in 0..2 {
        let update = resolver.record_interaction(&erin, Warmth::Warm).await;
        assert_eq!(update.delta, 30);
        erin.affinity = update.score;
    }
    let favorites = resolver.favorites().await;
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].0.display_name, "Erin");
    assert_eq!(favorites[0].1, 60);
}

#[tokio::test]
async fn test_resolver_survives_store_failure() {
    let handle = StoreHandle::new(Arc::new(BrokenStore::default()));
    let mut resolver = UserResolver::new(handle, AffinityConfig::default(), "friend", true);
    let first = resolver.resolve("my name is Zoe", Utc::now()).await;
    let again = resolver.resolve("my name is zoe", Utc::now()).await;
    assert_eq!(first.user.id, again.user.id);
    let update = resolver.record_interaction(&again, Warmth::Hostile).await;
    assert_eq!(update.score, -AffinityConfig::default().hostile_delta);
}

// ============================================================================
// Affinity bounds
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn affinity_never_leaves_bounds(
        min in -50i64..=0,
        span in 0i64..=100,
        warmths in prop::collection::vec(
            prop_oneof![Just(Warmth::Warm), Just(Warmth::Neutral), Just(Warmth::Hostile)],
            1..25,
        ),
    ) {
        let max = min + span;
        let config = AffinityConfig {
            min,
            max,
            initial: min,
            warm_delta: 7,
            hostile_delta: 11,
            ..AffinityConfig::default()
        };
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = SqliteMemory::new(":memory:").await.unwrap();
            let mut resolver =
                UserResolver::new(StoreHandle::new(Arc::new(store)), config, "friend", true);
            let mut user = resolver.resolve("my name is Pat", Utc::now()).await;
            for warmth in warmths {
                let update = resolver.record_interaction(&user, warmth).await;
                assert!(update.score >= min && update.score <= max);
                user.affinity = update.score;
            }
        });
    }
}
