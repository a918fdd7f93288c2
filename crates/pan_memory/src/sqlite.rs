use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use pan_core::records::from_millis;
use pan_core::text::normalize_key;
use pan_core::{
    AffinityRecord, Headline, MemoryRecord, MemorySource, NewMemory, NewsArchiveEntry, Opinion,
    PersistentStore, User,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// SQLite-backed [`PersistentStore`].
///
/// Every write is a single statement whose conflict clause carries the
/// invariant: timestamps per key only move forward and affinity is clamped
/// inside the statement itself.
#[derive(Clone)]
pub struct SqliteMemory {
    pool: Pool<Sqlite>,
}

impl SqliteMemory {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().display().to_string();
        let in_memory = path == ":memory:";
        let db_url = format!("sqlite://{}?mode=rwc", path);

        // Each connection to :memory: is its own database.
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let memory = Self { pool };
        memory.migrate().await?;
        tracing::info!("Opened memory store at {}", path);
        Ok(memory)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                last_seen INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create users table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                user_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (user_id, key),
                FOREIGN KEY(user_id) REFERENCES users(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create user_preferences table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS affinity (
                user_id TEXT PRIMARY KEY,
                score INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create affinity table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                topic TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                user_id TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create memories table")?;

        // Most-recent-wins lookups by topic
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_topic_time ON memories(topic, created_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create memories topic index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS opinions (
                topic TEXT PRIMARY KEY,
                stance TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create opinions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news_archive (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                headline TEXT NOT NULL,
                source TEXT NOT NULL,
                fetched_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create news_archive table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_news_fetched ON news_archive(fetched_at)")
            .execute(&self.pool)
            .await
            .context("Failed to create news_archive index")?;

        Ok(())
    }

    async fn load_preferences(&self, user_id: Uuid) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT key, value FROM user_preferences WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to load user preferences")?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect())
    }

    fn user_from_row(row: &SqliteRow, preferences: HashMap<String, String>) -> Result<User> {
        let id: String = row.get("id");
        Ok(User {
            id: Uuid::parse_str(&id).context("Corrupt user id")?,
            name: row.get("name"),
            display_name: row.get("display_name"),
            created_at: from_millis(row.get("created_at")),
            last_seen: from_millis(row.get("last_seen")),
            preferences,
        })
    }

    fn memory_from_row(row: &SqliteRow) -> Result<MemoryRecord> {
        let id: String = row.get("id");
        let source: String = row.get("source");
        let user_id: Option<String> = row.get("user_id");
        Ok(MemoryRecord {
            id: Uuid::parse_str(&id).context("Corrupt memory id")?,
            topic: row.get("topic"),
            content: row.get("content"),
            source: MemorySource::parse(&source)
                .with_context(|| format!("Unknown memory source '{}'", source))?,
            created_at: row.get("created_at"),
            user_id: user_id.as_deref().map(Uuid::parse_str).transpose()?,
        })
    }

    fn opinion_from_row(row: &SqliteRow) -> Opinion {
        Opinion {
            topic: row.get("topic"),
            stance: row.get("stance"),
            updated_at: row.get("updated_at"),
        }
    }

    fn news_from_row(row: &SqliteRow) -> NewsArchiveEntry {
        NewsArchiveEntry {
            id: row.get("id"),
            headline: row.get("headline"),
            source: row.get("source"),
            fetched_at: row.get("fetched_at"),
        }
    }
}

#[async_trait]
impl PersistentStore for SqliteMemory {
    async fn resolve_user(&self, name: &str, display_name: &str) -> Result<(User, bool)> {
        let key = normalize_key(name);
        anyhow::ensure!(!key.is_empty(), "User name must not be empty");
        let candidate = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, display_name, created_at, last_seen)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET last_seen = MAX(users.last_seen, excluded.last_seen)
            RETURNING id, name, display_name, created_at, last_seen
            "#,
        )
        .bind(candidate.to_string())
        .bind(&key)
        .bind(display_name.trim())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert user")?;

        let id: String = row.get("id");
        let created = id == candidate.to_string();
        let preferences = if created {
            HashMap::new()
        } else {
            self.load_preferences(Uuid::parse_str(&id).context("Corrupt user id")?)
                .await?
        };
        let user = Self::user_from_row(&row, preferences)?;
        tracing::debug!("Resolved user '{}' (created: {})", user.name, created);
        Ok((user, created))
    }

    async fn set_user_preference(&self, user_id: Uuid, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, key, value) VALUES (?, ?, ?)
            ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(user_id.to_string())
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("Failed to store user preference")?;
        Ok(())
    }

    async fn affinity(&self, user_id: Uuid, initial: i64) -> Result<AffinityRecord> {
        // The no-op update makes RETURNING yield the existing row.
        let row = sqlx::query(
            r#"
            INSERT INTO affinity (user_id, score) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET score = affinity.score
            RETURNING score
            "#,
        )
        .bind(user_id.to_string())
        .bind(initial)
        .fetch_one(&self.pool)
        .await
        .context("Failed to read affinity")?;
        Ok(AffinityRecord {
            user_id,
            score: row.get("score"),
        })
    }

    async fn adjust_affinity(
        &self,
        user_id: Uuid,
        delta: i64,
        initial: i64,
        min: i64,
        max: i64,
    ) -> Result<AffinityRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO affinity (user_id, score) VALUES (?, MIN(MAX(? + ?, ?), ?))
            ON CONFLICT(user_id) DO UPDATE SET score = MIN(MAX(affinity.score + ?, ?), ?)
            RETURNING score
            "#,
        )
        .bind(user_id.to_string())
        .bind(initial)
        .bind(delta)
        .bind(min)
        .bind(max)
        .bind(delta)
        .bind(min)
        .bind(max)
        .fetch_one(&self.pool)
        .await
        .context("Failed to adjust affinity")?;
        let score: i64 = row.get("score");
        tracing::debug!("Affinity for {} adjusted by {} to {}", user_id, delta, score);
        Ok(AffinityRecord { user_id, score })
    }

    async fn users_with_affinity_at_least(&self, threshold: i64) -> Result<Vec<(User, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.display_name, u.created_at, u.last_seen, a.score
            FROM users u JOIN affinity a ON a.user_id = u.id
            WHERE a.score >= ?
            ORDER BY a.score DESC, u.name ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users by affinity")?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let preferences = self
                .load_preferences(Uuid::parse_str(&id).context("Corrupt user id")?)
                .await?;
            users.push((Self::user_from_row(&row, preferences)?, row.get("score")));
        }
        Ok(users)
    }

    async fn insert_memory(&self, memory: &NewMemory) -> Result<MemoryRecord> {
        let topic = normalize_key(&memory.topic);
        let id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO memories (id, topic, content, source, created_at, user_id)
            SELECT ?, ?, ?, ?,
                   MAX(?, COALESCE((SELECT MAX(created_at) FROM memories WHERE topic = ?), 0) + 1),
                   ?
            RETURNING created_at
            "#,
        )
        .bind(id.to_string())
        .bind(&topic)
        .bind(&memory.content)
        .bind(memory.source.as_str())
        .bind(memory.created_at)
        .bind(&topic)
        .bind(memory.user_id.map(|u| u.to_string()))
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert memory")?;

        let created_at: i64 = row.get("created_at");
        tracing::debug!("Stored {} memory on '{}'", memory.source.as_str(), topic);
        Ok(MemoryRecord {
            id,
            topic,
            content: memory.content.clone(),
            source: memory.source,
            created_at,
            user_id: memory.user_id,
        })
    }

    async fn latest_memory(&self, topic: &str) -> Result<Option<MemoryRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, topic, content, source, created_at, user_id
            FROM memories WHERE topic = ?
            ORDER BY created_at DESC LIMIT 1
            "#,
        )
        .bind(normalize_key(topic))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read memory")?;

        row.as_ref().map(Self::memory_from_row).transpose()
    }

    async fn memories_between(&self, from_ms: i64, to_ms: i64) -> Result<Vec<MemoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, topic, content, source, created_at, user_id
            FROM memories WHERE created_at >= ? AND created_at < ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read memory range")?;

        rows.iter().map(Self::memory_from_row).collect()
    }

    async fn search_memories(&self, terms: &[String], limit: usize) -> Result<Vec<MemoryRecord>> {
        let mut found: HashMap<String, MemoryRecord> = HashMap::new();
        for term in terms {
            let term = normalize_key(term);
            if term.is_empty() {
                continue;
            }
            let pattern = format!(
                "%{}%",
                term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
            );
            let rows = sqlx::query(
                r#"
                SELECT m.id, m.topic, m.content, m.source, m.created_at, m.user_id
                FROM memories m
                WHERE m.topic LIKE ? ESCAPE '\'
                  AND m.created_at = (SELECT MAX(created_at) FROM memories WHERE topic = m.topic)
                ORDER BY m.created_at DESC
                LIMIT ?
                "#,
            )
            .bind(pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to search memories")?;

            for row in &rows {
                let record = Self::memory_from_row(row)?;
                found.entry(record.topic.clone()).or_insert(record);
            }
        }

        let mut records: Vec<MemoryRecord> = found.into_values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn upsert_opinion(&self, topic: &str, stance: &str) -> Result<Opinion> {
        let row = sqlx::query(
            r#"
            INSERT INTO opinions (topic, stance, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(topic) DO UPDATE SET
                stance = excluded.stance,
                updated_at = MAX(excluded.updated_at, opinions.updated_at + 1)
            RETURNING topic, stance, updated_at
            "#,
        )
        .bind(normalize_key(topic))
        .bind(stance)
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert opinion")?;

        let opinion = Self::opinion_from_row(&row);
        tracing::debug!("Opinion on '{}' set", opinion.topic);
        Ok(opinion)
    }

    async fn seed_opinion(&self, topic: &str, stance: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO opinions (topic, stance, updated_at) VALUES (?, ?, ?) ON CONFLICT(topic) DO NOTHING",
        )
        .bind(normalize_key(topic))
        .bind(stance)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to seed opinion")?;
        Ok(result.rows_affected() == 1)
    }

    async fn opinion(&self, topic: &str) -> Result<Option<Opinion>> {
        let row = sqlx::query("SELECT topic, stance, updated_at FROM opinions WHERE topic = ?")
            .bind(normalize_key(topic))
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read opinion")?;
        Ok(row.as_ref().map(Self::opinion_from_row))
    }

    async fn opinions(&self) -> Result<Vec<Opinion>> {
        let rows = sqlx::query("SELECT topic, stance, updated_at FROM opinions ORDER BY topic ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list opinions")?;
        Ok(rows.iter().map(Self::opinion_from_row).collect())
    }

    async fn archive_headlines(&self, headlines: &[Headline]) -> Result<Vec<NewsArchiveEntry>> {
        if headlines.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self.pool.begin().await?;

        // One timestamp for the whole batch, strictly after the previous batch.
        let row = sqlx::query(
            "SELECT MAX(?, COALESCE((SELECT MAX(fetched_at) FROM news_archive), 0) + 1) AS batch_at",
        )
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to allocate news batch timestamp")?;
        let fetched_at: i64 = row.get("batch_at");

        let mut entries = Vec::with_capacity(headlines.len());
        for headline in headlines {
            let row = sqlx::query(
                "INSERT INTO news_archive (headline, source, fetched_at) VALUES (?, ?, ?) RETURNING id",
            )
            .bind(&headline.title)
            .bind(&headline.source)
            .bind(fetched_at)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to archive headline")?;
            entries.push(NewsArchiveEntry {
                id: row.get("id"),
                headline: headline.title.clone(),
                source: headline.source.clone(),
                fetched_at,
            });
        }
        tx.commit().await?;
        tracing::debug!("Archived {} headlines at {}", entries.len(), fetched_at);
        Ok(entries)
    }

    async fn latest_news_batch(&self, limit: usize) -> Result<Vec<NewsArchiveEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, headline, source, fetched_at FROM news_archive
            WHERE fetched_at = (SELECT MAX(fetched_at) FROM news_archive)
            ORDER BY id ASC LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read latest news batch")?;
        Ok(rows.iter().map(Self::news_from_row).collect())
    }

    async fn recent_news(&self, limit: usize) -> Result<Vec<NewsArchiveEntry>> {
        let rows = sqlx::query(
            "SELECT id, headline, source, fetched_at FROM news_archive ORDER BY id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read news archive")?;
        Ok(rows.iter().map(Self::news_from_row).collect())
    }
}
