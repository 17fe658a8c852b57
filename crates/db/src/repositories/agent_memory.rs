use async_trait::async_trait;
use shopsense_core::chrono::{DateTime, Utc};
use shopsense_core::domain::memory::{MemoryKind, MemoryRecord};
use sqlx::{sqlite::SqliteRow, Row};

use super::{AgentMemoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAgentMemoryRepository {
    pool: DbPool,
}

impl SqlAgentMemoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentMemoryRepository for SqlAgentMemoryRepository {
    async fn store(&self, record: MemoryRecord) -> Result<(), RepositoryError> {
        let embedding = serde_json::to_string(&record.embedding).map_err(|err| {
            RepositoryError::Decode(format!("could not encode memory embedding: {err}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO agent_memory (
                agent_id, memory_kind, memory_key, memory_value, embedding, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(agent_id, memory_kind, memory_key) DO UPDATE SET
                memory_value = excluded.memory_value,
                embedding = excluded.embedding,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.agent_id)
        .bind(record.kind.as_str())
        .bind(&record.key)
        .bind(&record.value)
        .bind(embedding)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recall(
        &self,
        agent_id: &str,
        kind: MemoryKind,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT agent_id, memory_kind, memory_key, memory_value, embedding, created_at
            FROM agent_memory
            WHERE agent_id = ? AND memory_kind = ?
            ORDER BY created_at DESC, memory_key ASC
            LIMIT ?
            "#,
        )
        .bind(agent_id)
        .bind(kind.as_str())
        .bind(limit.clamp(1, 500) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(memory_from_row).collect()
    }
}

fn memory_from_row(row: &SqliteRow) -> Result<MemoryRecord, RepositoryError> {
    let kind_raw: String = row.try_get("memory_kind")?;
    let kind = MemoryKind::parse(&kind_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown memory kind '{kind_raw}'"))
    })?;
    let embedding_raw: String = row.try_get("embedding")?;
    let embedding = serde_json::from_str(&embedding_raw).map_err(|err| {
        RepositoryError::Decode(format!("invalid embedding JSON '{embedding_raw}': {err}"))
    })?;

    Ok(MemoryRecord {
        agent_id: row.try_get("agent_id")?,
        kind,
        key: row.try_get("memory_key")?,
        value: row.try_get("memory_value")?,
        embedding,
        created_at: parse_rfc3339("memory created_at", &row.try_get::<String, _>("created_at")?)?,
    })
}

fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

#[cfg(test)]
mod tests {
    use shopsense_core::chrono::{DateTime, Utc};
    use shopsense_core::domain::memory::{MemoryKind, MemoryRecord};

    use super::{AgentMemoryRepository, SqlAgentMemoryRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    type TestResult<T> = Result<T, String>;

    fn record(agent: &str, kind: MemoryKind, key: &str, value: &str, at: &str) -> TestResult<MemoryRecord> {
        Ok(MemoryRecord {
            agent_id: agent.to_string(),
            kind,
            key: key.to_string(),
            value: value.to_string(),
            embedding: vec![0.1, 0.2, 0.3],
            created_at: parse_ts(at)?,
        })
    }

    #[tokio::test]
    async fn store_upserts_on_agent_kind_and_key() -> TestResult<()> {
        let pool = setup_pool().await?;
        let repo = SqlAgentMemoryRepository::new(pool.clone());

        let first = record(
            "recommendation",
            MemoryKind::Experience,
            "C-100",
            "recommended 5 products",
            "2026-03-01T09:00:00Z",
        )?;
        repo.store(first).await.map_err(|error| format!("store memory: {error}"))?;

        let replacement = record(
            "recommendation",
            MemoryKind::Experience,
            "C-100",
            "recommended 3 products",
            "2026-03-02T09:00:00Z",
        )?;
        repo.store(replacement.clone()).await.map_err(|error| format!("re-store memory: {error}"))?;

        let recalled = repo
            .recall("recommendation", MemoryKind::Experience, 10)
            .await
            .map_err(|error| format!("recall memories: {error}"))?;
        if recalled.len() != 1 {
            return Err(format!("upsert should keep one row per key, got {}", recalled.len()));
        }
        if recalled[0] != replacement {
            return Err(format!("recalled memory mismatch: {:?}", recalled[0]));
        }

        pool.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn recall_is_scoped_by_agent_and_kind_newest_first() -> TestResult<()> {
        let pool = setup_pool().await?;
        let repo = SqlAgentMemoryRepository::new(pool.clone());

        for memory in [
            record("recommendation", MemoryKind::Experience, "old", "o", "2026-03-01T09:00:00Z")?,
            record("recommendation", MemoryKind::Experience, "new", "n", "2026-03-05T09:00:00Z")?,
            record("recommendation", MemoryKind::Reflection, "r", "r", "2026-03-06T09:00:00Z")?,
            record("coordination", MemoryKind::Experience, "x", "x", "2026-03-07T09:00:00Z")?,
        ] {
            repo.store(memory).await.map_err(|error| format!("store memory: {error}"))?;
        }

        let recalled = repo
            .recall("recommendation", MemoryKind::Experience, 10)
            .await
            .map_err(|error| format!("recall memories: {error}"))?;
        let keys: Vec<&str> = recalled.iter().map(|m| m.key.as_str()).collect();
        if keys != vec!["new", "old"] {
            return Err(format!("recall scoping or ordering mismatch: {:?}", keys));
        }

        pool.close().await;
        Ok(())
    }

    async fn setup_pool() -> TestResult<DbPool> {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .map_err(|error| format!("connect test pool: {error}"))?;
        migrations::run_pending(&pool).await.map_err(|error| format!("run migrations: {error}"))?;
        Ok(pool)
    }

    fn parse_ts(value: &str) -> TestResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|error| format!("parse rfc3339 timestamp `{value}`: {error}"))
    }
}
