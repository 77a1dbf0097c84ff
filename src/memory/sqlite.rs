/*!
SQLite memory store.

Durable [`MemoryStore`] backend keyed on the fully qualified `namespace:key`
form. Values are stored as JSON text; timestamps use the fixed-width RFC3339
encoding from [`crate::utils::timefmt`] so `updated_at` comparisons can run
in SQL.

When the `sqlite-migrations` feature is enabled (default), embedded
migrations (`sqlx::migrate!("./migrations")`) run on connect; disabling the
feature assumes external migration orchestration.
*/

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;

use super::{
    Memory, MemoryError, MemoryMetadata, MemoryQuery, MemoryStore, qualified_key,
    rank_and_truncate,
};
use crate::utils::timefmt::{encode_ts, parse_ts};

/// SQLite-backed [`MemoryStore`].
pub struct SqliteStore {
    namespace: String,
    /// Shared connection pool; cloned into subgraph engines.
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl SqliteStore {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: "sqlite://tutorgraph.db".
    #[instrument(skip(database_url))]
    pub async fn connect(
        database_url: &str,
        namespace: impl Into<String> + std::fmt::Debug,
    ) -> Result<Self, MemoryError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| MemoryError::Backend {
                message: format!("connect error: {e}"),
            })?;
        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(MemoryError::Backend {
                    message: format!("migration failure: {e}"),
                });
            }
        }
        Ok(Self {
            namespace: namespace.into(),
            pool: Arc::new(pool),
        })
    }

    /// Reuse an existing pool under a (possibly different) namespace.
    pub fn with_pool(namespace: impl Into<String>, pool: Arc<SqlitePool>) -> Self {
        Self {
            namespace: namespace.into(),
            pool,
        }
    }

    fn row_to_memory(row: &SqliteRow) -> Result<Memory, MemoryError> {
        let value_json: String = row.try_get("value_json").map_err(backend_err)?;
        let value: Value =
            serde_json::from_str(&value_json).map_err(|source| MemoryError::Serde { source })?;
        let created_at: String = row.try_get("created_at").map_err(backend_err)?;
        let updated_at: String = row.try_get("updated_at").map_err(backend_err)?;
        let last_accessed: Option<String> = row.try_get("last_accessed").map_err(backend_err)?;
        Ok(Memory {
            key: row.try_get("key").map_err(backend_err)?,
            value,
            metadata: MemoryMetadata {
                kind: row.try_get("kind").map_err(backend_err)?,
                created_at: parse_ts(&created_at).map_err(backend_err)?,
                updated_at: parse_ts(&updated_at).map_err(backend_err)?,
                access_count: row.try_get::<i64, _>("access_count").map_err(backend_err)? as u64,
                last_accessed: last_accessed
                    .as_deref()
                    .map(parse_ts)
                    .transpose()
                    .map_err(backend_err)?,
            },
        })
    }
}

fn backend_err(e: impl std::fmt::Display) -> MemoryError {
    MemoryError::Backend {
        message: e.to_string(),
    }
}

#[async_trait]
impl MemoryStore for SqliteStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    #[instrument(skip(self, value), err)]
    async fn put(&self, key: &str, value: Value, kind: Option<&str>) -> Result<(), MemoryError> {
        let full_key = qualified_key(&self.namespace, key);
        let value_json =
            serde_json::to_string(&value).map_err(|source| MemoryError::Serde { source })?;
        let now = encode_ts(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO memories (key, value_json, kind, created_at, updated_at, access_count)
            VALUES (?1, ?2, ?3, ?4, ?4, 1)
            ON CONFLICT(key) DO UPDATE SET
                value_json = excluded.value_json,
                kind = COALESCE(excluded.kind, memories.kind),
                updated_at = excluded.updated_at,
                access_count = memories.access_count + 1
            "#,
        )
        .bind(&full_key)
        .bind(&value_json)
        .bind(kind)
        .bind(&now)
        .execute(&*self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError> {
        let full_key = qualified_key(&self.namespace, key);
        let now = encode_ts(Utc::now());
        let row = sqlx::query(
            r#"
            UPDATE memories
            SET access_count = access_count + 1, last_accessed = ?2
            WHERE key = ?1
            RETURNING value_json
            "#,
        )
        .bind(&full_key)
        .bind(&now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(backend_err)?;
        row.map(|row| {
            let value_json: String = row.try_get("value_json").map_err(backend_err)?;
            serde_json::from_str(&value_json).map_err(|source| MemoryError::Serde { source })
        })
        .transpose()
    }

    #[instrument(skip(self, query), err)]
    async fn search(&self, query: MemoryQuery) -> Result<Vec<Memory>, MemoryError> {
        let prefix = format!(
            "{}:%",
            query.namespace.as_deref().unwrap_or(&self.namespace)
        );
        let since = query.since.map(encode_ts);
        let rows = sqlx::query(
            r#"
            SELECT key, value_json, kind, created_at, updated_at, access_count, last_accessed
            FROM memories
            WHERE key LIKE ?1
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR updated_at >= ?3)
            "#,
        )
        .bind(&prefix)
        .bind(query.kind.as_deref())
        .bind(since.as_deref())
        .fetch_all(&*self.pool)
        .await
        .map_err(backend_err)?;

        let mut matches = rows
            .iter()
            .map(Self::row_to_memory)
            .collect::<Result<Vec<_>, _>>()?;
        rank_and_truncate(&mut matches, query.limit);
        Ok(matches)
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, key: &str) -> Result<(), MemoryError> {
        let full_key = qualified_key(&self.namespace, key);
        sqlx::query("DELETE FROM memories WHERE key = ?1")
            .bind(&full_key)
            .execute(&*self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}
