use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use muse_core::{DurableStore, Memory, MemoryStatus, Pattern, PersistenceError};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::collections::BTreeSet;
use std::path::Path;
use uuid::Uuid;

/// SQLite-backed durable mirror.
#[derive(Clone)]
pub struct SqliteDurableStore {
    pool: Pool<Sqlite>,
}

impl SqliteDurableStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                kind TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                emotional_context TEXT NOT NULL,
                platform TEXT,
                importance REAL NOT NULL,
                associations TEXT NOT NULL DEFAULT '[]',
                last_accessed INTEGER,
                status TEXT NOT NULL DEFAULT 'active'
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create memories table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_status ON memories(status)")
            .execute(&self.pool)
            .await
            .context("Failed to create memories status index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                word TEXT PRIMARY KEY,
                frequency INTEGER NOT NULL,
                first_seen INTEGER NOT NULL,
                last_seen INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create patterns table")?;

        Ok(())
    }

    /// Tracked patterns, highest frequency first.
    pub async fn load_patterns(&self) -> Result<Vec<Pattern>> {
        let rows = sqlx::query(
            "SELECT word, frequency, first_seen, last_seen FROM patterns ORDER BY frequency DESC, word ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query patterns")?;

        rows.iter()
            .map(|row| {
                let frequency: i64 = row.get("frequency");
                Ok(Pattern {
                    word: row.get("word"),
                    frequency: u32::try_from(frequency).unwrap_or(u32::MAX),
                    first_seen: millis_to_utc(row.get("first_seen"))?,
                    last_seen: millis_to_utc(row.get("last_seen"))?,
                })
            })
            .collect()
    }

    pub async fn status(&self, id: Uuid) -> Result<Option<MemoryStatus>> {
        let row = sqlx::query("SELECT status FROM memories WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query memory status")?;

        Ok(row.map(|r| {
            let status: String = r.get("status");
            if status == MemoryStatus::Archived.as_str() {
                MemoryStatus::Archived
            } else {
                MemoryStatus::Active
            }
        }))
    }

    async fn insert_memory(&self, memory: &Memory) -> Result<()> {
        let associations = serde_json::to_string(&memory.associations)
            .context("Failed to serialize associations")?;

        sqlx::query(
            "INSERT INTO memories (id, content, kind, timestamp, emotional_context, platform, importance, associations, last_accessed, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active')
             ON CONFLICT(id) DO UPDATE SET importance = excluded.importance, last_accessed = excluded.last_accessed",
        )
        .bind(memory.id.to_string())
        .bind(&memory.content)
        .bind(memory.kind.as_str())
        .bind(memory.timestamp.timestamp_millis())
        .bind(memory.emotional_context.as_str())
        .bind(&memory.platform)
        .bind(memory.importance as f64)
        .bind(&associations)
        .bind(memory.last_accessed.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await
        .context("Failed to insert memory")?;

        tracing::debug!("Memory {} persisted", memory.id);
        Ok(())
    }

    async fn load_active(&self) -> Result<Vec<Memory>> {
        let rows = sqlx::query(
            "SELECT id, content, kind, timestamp, emotional_context, platform, importance, associations, last_accessed
             FROM memories WHERE status = 'active' ORDER BY timestamp ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query active memories")?;

        let mut memories = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let kind: String = row.get("kind");
            let emotional_context: String = row.get("emotional_context");
            let associations: String = row.get("associations");
            let importance: f64 = row.get("importance");
            let last_accessed: Option<i64> = row.get("last_accessed");

            memories.push(Memory {
                id: Uuid::parse_str(&id).with_context(|| format!("Bad memory id {:?}", id))?,
                content: row.get("content"),
                kind: kind.parse()?,
                timestamp: millis_to_utc(row.get("timestamp"))?,
                emotional_context: emotional_context.parse()?,
                platform: row.get("platform"),
                importance: (importance as f32).clamp(0.0, 1.0),
                associations: serde_json::from_str::<BTreeSet<String>>(&associations)
                    .context("Failed to deserialize associations")?,
                last_accessed: last_accessed.map(millis_to_utc).transpose()?,
            });
        }
        Ok(memories)
    }

    async fn set_status(&self, id: Uuid, status: MemoryStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE memories SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update memory status")?;
        Ok(result.rows_affected())
    }

    async fn save_pattern(&self, pattern: &Pattern) -> Result<()> {
        sqlx::query(
            "INSERT INTO patterns (word, frequency, first_seen, last_seen) VALUES (?, ?, ?, ?)
             ON CONFLICT(word) DO UPDATE SET frequency = excluded.frequency, last_seen = excluded.last_seen",
        )
        .bind(&pattern.word)
        .bind(pattern.frequency as i64)
        .bind(pattern.first_seen.timestamp_millis())
        .bind(pattern.last_seen.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save pattern")?;
        Ok(())
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .with_context(|| format!("Timestamp out of range: {}", ms))
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn insert(&self, memory: &Memory) -> Result<(), PersistenceError> {
        Ok(self.insert_memory(memory).await?)
    }

    async fn query_active(&self) -> Result<Vec<Memory>, PersistenceError> {
        Ok(self.load_active().await?)
    }

    async fn update_status(&self, id: Uuid, status: MemoryStatus) -> Result<(), PersistenceError> {
        match self.set_status(id, status).await? {
            0 => Err(PersistenceError::NotFound { id }),
            _ => Ok(()),
        }
    }

    async fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), PersistenceError> {
        Ok(self.save_pattern(pattern).await?)
    }

    async fn query_patterns(&self) -> Result<Vec<Pattern>, PersistenceError> {
        Ok(self.load_patterns().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_core::{EmotionalState, MemoryKind};

    #[tokio::test]
    async fn test_roundtrip_and_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteDurableStore::new(dir.path().join("muse.db")).await.unwrap();

        let memory = Memory::new(
            "Sqlite remembers things.",
            MemoryKind::Fact,
            EmotionalState::Analytical,
            Some("cli"),
        )
        .unwrap();
        store.insert(&memory).await.unwrap();

        let active = store.query_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, memory.id);
        assert_eq!(active[0].content, memory.content);
        assert_eq!(active[0].platform.as_deref(), Some("cli"));
        assert_eq!(active[0].associations, memory.associations);
        assert_eq!(
            active[0].timestamp.timestamp_millis(),
            memory.timestamp.timestamp_millis()
        );

        store
            .update_status(memory.id, MemoryStatus::Archived)
            .await
            .unwrap();
        assert!(store.query_active().await.unwrap().is_empty());
        assert_eq!(
            store.status(memory.id).await.unwrap(),
            Some(MemoryStatus::Archived)
        );
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteDurableStore::new(dir.path().join("muse.db")).await.unwrap();
        let err = store
            .update_status(Uuid::new_v4(), MemoryStatus::Archived)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_pattern_upsert() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteDurableStore::new(dir.path().join("muse.db")).await.unwrap();
        let now = Utc::now();
        let mut pattern = Pattern {
            word: "glitch".into(),
            frequency: 3,
            first_seen: now,
            last_seen: now,
        };
        store.upsert_pattern(&pattern).await.unwrap();
        pattern.frequency = 5;
        store.upsert_pattern(&pattern).await.unwrap();

        let patterns = store.load_patterns().await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].frequency, 5);
    }
}
