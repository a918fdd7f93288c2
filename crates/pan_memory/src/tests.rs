use crate::sqlite::SqliteMemory;
use pan_core::{Headline, MemorySource, NewMemory, PersistentStore};
use uuid::Uuid;

fn memory(topic: &str, content: &str, created_at: i64) -> NewMemory {
    NewMemory {
        topic: topic.to_string(),
        content: content.to_string(),
        source: MemorySource::UserTold,
        user_id: None,
        created_at,
    }
}

#[tokio::test]
async fn test_user_upsert_is_idempotent() {
    let store = SqliteMemory::new(":memory:")
        .await
        .expect("Failed to create memory");

    let (first, created) = store.resolve_user("Alice", "Alice").await.unwrap();
    assert!(created);
    assert_eq!(first.name, "alice");
    assert_eq!(first.display_name, "Alice");

    let (second, created) = store.resolve_user("  ALICE ", "ALICE").await.unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert!(second.last_seen >= first.last_seen);
    // Display name stays as first spoken
    assert_eq!(second.display_name, "Alice");
}

#[tokio::test]
async fn test_user_preferences_persist() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    let (user, _) = store.resolve_user("bob", "Bob").await.unwrap();
    store.set_user_preference(user.id, "location", "Paris").await.unwrap();
    store.set_user_preference(user.id, "location", "Lyon").await.unwrap();

    let (user, _) = store.resolve_user("bob", "Bob").await.unwrap();
    assert_eq!(user.preference("location"), Some("Lyon"));
}

#[tokio::test]
async fn test_affinity_created_lazily_and_clamped() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    let (user, _) = store.resolve_user("carol", "Carol").await.unwrap();

    let rec = store.affinity(user.id, 3).await.unwrap();
    assert_eq!(rec.score, 3);
    // Existing record is not reset by a different initial
    assert_eq!(store.affinity(user.id, 0).await.unwrap().score, 3);

    let rec = store.adjust_affinity(user.id, 50, 0, -10, 10).await.unwrap();
    assert_eq!(rec.score, 10);
    let rec = store.adjust_affinity(user.id, -100, 0, -10, 10).await.unwrap();
    assert_eq!(rec.score, -10);
}

#[tokio::test]
async fn test_adjust_affinity_creates_missing_record() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    let (user, _) = store.resolve_user("dave", "Dave").await.unwrap();
    let rec = store.adjust_affinity(user.id, 4, 2, -10, 10).await.unwrap();
    assert_eq!(rec.score, 6);
}

#[tokio::test]
async fn test_favorites_ordering() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    for (name, score) in [("erin", 60), ("frank", 80), ("gus", 10)] {
        let (user, _) = store.resolve_user(name, name).await.unwrap();
        store.adjust_affinity(user.id, score, 0, -100, 100).await.unwrap();
    }
    let favs = store.users_with_affinity_at_least(51).await.unwrap();
    let names: Vec<_> = favs.iter().map(|(u, _)| u.name.as_str()).collect();
    assert_eq!(names, vec!["frank", "erin"]);
}

#[tokio::test]
async fn test_latest_memory_wins() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    store.insert_memory(&memory("Mars", "red planet", 1_000)).await.unwrap();
    store.insert_memory(&memory("mars", "has two moons", 2_000)).await.unwrap();

    let latest = store.latest_memory("MARS").await.unwrap().unwrap();
    assert_eq!(latest.content, "has two moons");
    assert_eq!(latest.topic, "mars");
    assert!(store.latest_memory("venus").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_timestamps_strictly_increase_per_topic() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    // Same (or older) client clock for every write
    let a = store.insert_memory(&memory("tea", "first", 5_000)).await.unwrap();
    let b = store.insert_memory(&memory("tea", "second", 5_000)).await.unwrap();
    let c = store.insert_memory(&memory("tea", "third", 10)).await.unwrap();
    assert!(b.created_at > a.created_at);
    assert!(c.created_at > b.created_at);
    assert_eq!(store.latest_memory("tea").await.unwrap().unwrap().content, "third");

    // Other topics are unaffected
    let other = store.insert_memory(&memory("coffee", "x", 10)).await.unwrap();
    assert_eq!(other.created_at, 10);
}

#[tokio::test]
async fn test_search_memories_returns_latest_per_topic() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    store.insert_memory(&memory("roman empire", "old", 1)).await.unwrap();
    store.insert_memory(&memory("roman empire", "new", 2)).await.unwrap();
    store.insert_memory(&memory("roman roads", "straight", 3)).await.unwrap();
    store.insert_memory(&memory("pasta", "tasty", 4)).await.unwrap();

    let found = store
        .search_memories(&["roman".to_string()], 5)
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].topic, "roman roads");
    assert_eq!(found[1].content, "new");
}

#[tokio::test]
async fn test_opinion_updates_in_place() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    let first = store.upsert_opinion("Coffee", "It's fine").await.unwrap();
    let second = store.upsert_opinion("coffee", "I love it").await.unwrap();
    assert!(second.updated_at > first.updated_at);

    let all = store.opinions().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(store.opinion("COFFEE").await.unwrap().unwrap().stance, "I love it");
}

#[tokio::test]
async fn test_seed_opinion_only_when_absent() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    store.upsert_opinion("ai", "Mine").await.unwrap();
    assert!(!store.seed_opinion("AI", "Seeded").await.unwrap());
    assert!(store.seed_opinion("space exploration", "Seeded").await.unwrap());
    assert_eq!(store.opinion("ai").await.unwrap().unwrap().stance, "Mine");
}

#[tokio::test]
async fn test_news_batches() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    let batch = |titles: &[&str]| -> Vec<Headline> {
        titles
            .iter()
            .map(|t| Headline {
                title: t.to_string(),
                source: "wire".to_string(),
            })
            .collect()
    };
    let first = store.archive_headlines(&batch(&["a", "b"])).await.unwrap();
    let second = store.archive_headlines(&batch(&["c", "d", "e"])).await.unwrap();
    assert!(second[0].fetched_at > first[0].fetched_at);
    assert!(second.iter().all(|e| e.fetched_at == second[0].fetched_at));

    let latest = store.latest_news_batch(10).await.unwrap();
    let titles: Vec<_> = latest.iter().map(|e| e.headline.as_str()).collect();
    assert_eq!(titles, vec!["c", "d", "e"]);

    let recent = store.recent_news(2).await.unwrap();
    assert_eq!(recent[0].headline, "e");
    assert!(store.archive_headlines(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_user_link() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    let uid = Uuid::new_v4();
    let mut m = memory("birthday", "june", 1);
    m.user_id = Some(uid);
    store.insert_memory(&m).await.unwrap();
    let got = store.latest_memory("birthday").await.unwrap().unwrap();
    assert_eq!(got.user_id, Some(uid));
}

#[tokio::test]
async fn test_memories_between_is_half_open() {
    let store = SqliteMemory::new(":memory:").await.unwrap();
    for (topic, at) in [("a", 100), ("b", 200), ("c", 300), ("d", 400)] {
        store.insert_memory(&memory(topic, "x", at)).await.unwrap();
    }
    let got = store.memories_between(200, 400).await.unwrap();
    let topics: Vec<_> = got.iter().map(|m| m.topic.as_str()).collect();
    assert_eq!(topics, vec!["b", "c"]);
    assert!(store.memories_between(500, 600).await.unwrap().is_empty());
}
