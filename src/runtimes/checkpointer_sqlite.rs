/*!
SQLite Checkpointer

Async [`Checkpointer`] implementation over sqlx. Serialization lives in
[`crate::runtimes::persistence`]; this module is database I/O only.

## Behavior

- State is stored as one JSON column; metadata fields map to columns so
  latest-checkpoint lookups and history listings run in SQL.
- Timestamps use the fixed-width RFC3339 encoding, so `ORDER BY created_at`
  matches chronological order.
- When the `sqlite-migrations` feature is enabled (default), embedded
  migrations (`sqlx::migrate!("./migrations")`) run on connect; disabling
  the feature assumes external migration orchestration.

## Schema mapping

- `checkpoints.id` ← `checkpoint.id`
- `checkpoints.thread_id` ← `checkpoint.thread_id`
- `checkpoints.namespace` ← `metadata.namespace`
- `checkpoints.node` ← encoded `NodeKind`
- `checkpoints.step` / `interrupted` / `is_final` ← metadata flags
- `checkpoints.state_json` ← serialized `SessionState`
- `checkpoints.created_at` ← `metadata.timestamp`

## Storage growth

Complete history is kept per thread; storage grows with
`threads × nodes_per_run × state_size`. Long-running deployments should
clear finished threads via [`Checkpointer::clear`] or time-based SQL
maintenance on `created_at`.
*/

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;

use super::checkpointer::{
    Checkpoint, CheckpointSummary, Checkpointer, CheckpointerError, Result,
};
use super::persistence::{PersistedCheckpoint, state_from_json, state_to_json};
use crate::types::NodeKind;
use crate::utils::timefmt::parse_ts;

/// SQLite-backed checkpointer with full per-thread history.
pub struct SqliteCheckpointer {
    /// Shared connection pool; cloned into subgraph engines.
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointer").finish()
    }
}

fn backend_err(e: impl std::fmt::Display) -> CheckpointerError {
    CheckpointerError::Backend {
        message: e.to_string(),
    }
}

impl SqliteCheckpointer {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: "sqlite://tutorgraph.db".
    #[must_use = "checkpointer must be used to persist state"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("connect error: {e}"),
            })?;
        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(CheckpointerError::Backend {
                    message: format!("migration failure: {e}"),
                });
            }
        }
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// The underlying pool, for sharing with the SQLite memory store.
    pub fn pool(&self) -> Arc<SqlitePool> {
        Arc::clone(&self.pool)
    }

    fn row_to_checkpoint(row: &SqliteRow) -> Result<Checkpoint> {
        let state_json: String = row.try_get("state_json").map_err(backend_err)?;
        let persisted = PersistedCheckpoint {
            id: row.try_get("id").map_err(backend_err)?,
            thread_id: row.try_get("thread_id").map_err(backend_err)?,
            namespace: row.try_get("namespace").map_err(backend_err)?,
            node: row.try_get("node").map_err(backend_err)?,
            step: row.try_get::<i64, _>("step").map_err(backend_err)? as u32,
            interrupted: row.try_get("interrupted").map_err(backend_err)?,
            is_final: row.try_get("is_final").map_err(backend_err)?,
            created_at: row.try_get("created_at").map_err(backend_err)?,
            state: state_from_json(&state_json).map_err(backend_err)?,
        };
        Checkpoint::try_from(persisted).map_err(backend_err)
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    #[instrument(skip(self, checkpoint), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<String> {
        let persisted = PersistedCheckpoint::from(&checkpoint);
        let state_json = state_to_json(&checkpoint.state).map_err(backend_err)?;
        sqlx::query(
            r#"
            INSERT INTO checkpoints
                (id, thread_id, namespace, node, step, interrupted, is_final, state_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&persisted.id)
        .bind(&persisted.thread_id)
        .bind(&persisted.namespace)
        .bind(&persisted.node)
        .bind(persisted.step as i64)
        .bind(persisted.interrupted)
        .bind(persisted.is_final)
        .bind(&state_json)
        .bind(&persisted.created_at)
        .execute(&*self.pool)
        .await
        .map_err(backend_err)?;
        Ok(persisted.id)
    }

    #[instrument(skip(self), err)]
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            r#"
            SELECT id, thread_id, namespace, node, step, interrupted, is_final,
                   state_json, created_at
            FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY created_at DESC, step DESC
            LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(backend_err)?;
        row.as_ref().map(Self::row_to_checkpoint).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, node, step, interrupted, is_final, created_at
            FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY created_at ASC, step ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(backend_err)?;

        rows.iter()
            .map(|row| {
                let created_at: String = row.try_get("created_at").map_err(backend_err)?;
                let node: String = row.try_get("node").map_err(backend_err)?;
                Ok(CheckpointSummary {
                    id: row.try_get("id").map_err(backend_err)?,
                    node: NodeKind::decode(&node),
                    step: row.try_get::<i64, _>("step").map_err(backend_err)? as u32,
                    timestamp: parse_ts(&created_at).map_err(backend_err)?,
                    interrupted: row.try_get("interrupted").map_err(backend_err)?,
                    is_final: row.try_get("is_final").map_err(backend_err)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn clear(&self, thread_id: Option<&str>) -> Result<()> {
        match thread_id {
            Some(thread_id) => {
                sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?1")
                    .bind(thread_id)
                    .execute(&*self.pool)
                    .await
                    .map_err(backend_err)?;
            }
            None => {
                sqlx::query("DELETE FROM checkpoints")
                    .execute(&*self.pool)
                    .await
                    .map_err(backend_err)?;
            }
        }
        Ok(())
    }
}
