/*!
SQLite checkpoint store.

Durable [`Checkpointer`] backend over a sqlx connection pool. Embedded
migrations (`sqlx::migrate!("./migrations")`) run on connect, so a fresh
database file is ready after `SqliteCheckpointer::connect`.

## Behavior

- Each `append` runs in a single transaction: the thread row is upserted and
  the checkpoint row inserted together, so readers never observe a torn
  checkpoint.
- `UNIQUE (thread_id, step)` makes two writers racing on the same thread fail
  loudly on the second insert instead of silently forking history. Callers are
  expected to serialize passes per thread (see [`crate::session::Session`]).
- State is stored as versioned JSON via [`super::persistence`], never as an
  opaque runtime blob.
*/

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::runtimes::checkpointer::{Checkpoint, Checkpointer, CheckpointerError, Result};
use crate::runtimes::persistence::{decode_state, encode_state};
use crate::state::ConversationState;

/// SQLite-backed checkpoint store.
///
/// Storage grows with `threads x passes x nodes_per_pass x state_size`; plan
/// periodic cleanup externally (for example, delete checkpoint rows older
/// than a retention window and `VACUUM`). This crate never deletes threads.
pub struct SqliteCheckpointer {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointer").finish()
    }
}

impl SqliteCheckpointer {
    /// Connects to (or creates) the SQLite database at `database_url` and
    /// applies embedded migrations.
    ///
    /// Example URL: `sqlite://data/checkpoints.db`.
    #[must_use = "checkpointer must be used to persist state"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| CheckpointerError::Backend {
                message: format!("invalid database url: {e}"),
            })?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("connect error: {e}"),
            })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("migration failure: {e}"),
            })?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn row_to_checkpoint(row: &SqliteRow) -> Result<Checkpoint> {
        let state_json: String = row.get("state_json");
        let state = decode_state(&state_json).map_err(|e| CheckpointerError::Serde {
            message: e.to_string(),
        })?;

        let created_at_str: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let step: i64 = row.get("step");

        Ok(Checkpoint {
            id: row.get("id"),
            thread_id: row.get("thread_id"),
            parent_id: row.get("parent_id"),
            step: step as u64,
            state,
            created_at,
        })
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    #[instrument(skip(self, state), err)]
    async fn append(&self, thread_id: &str, state: &ConversationState) -> Result<String> {
        let state_json = encode_state(state).map_err(|e| CheckpointerError::Serde {
            message: e.to_string(),
        })?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("tx begin: {e}"),
            })?;

        // Implicit thread creation on first write; bump recency on every write.
        sqlx::query(
            r#"
            INSERT INTO threads (id, updated_at) VALUES (?1, ?2)
            ON CONFLICT (id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("upsert thread: {e}"),
        })?;

        let tip: Option<(String, i64)> = sqlx::query_as(
            r#"
            SELECT id, step FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY step DESC
            LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("select tip: {e}"),
        })?;

        let (parent_id, step) = match tip {
            Some((tip_id, tip_step)) => (Some(tip_id), tip_step + 1),
            None => (None, 0),
        };

        sqlx::query(
            r#"
            INSERT INTO checkpoints (id, thread_id, parent_id, step, state_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(thread_id)
        .bind(&parent_id)
        .bind(step)
        .bind(&state_json)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("insert checkpoint: {e}"),
        })?;

        tx.commit().await.map_err(|e| CheckpointerError::Backend {
            message: format!("tx commit: {e}"),
        })?;

        Ok(id)
    }

    #[instrument(skip(self), err)]
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            r#"
            SELECT id, thread_id, parent_id, step, state_json, created_at
            FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY step DESC
            LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("select latest: {e}"),
        })?;

        row.as_ref().map(Self::row_to_checkpoint).transpose()
    }

    #[instrument(skip(self), err)]
    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let rows = sqlx::query(
            r#"
            SELECT id, thread_id, parent_id, step, state_json, created_at
            FROM checkpoints
            WHERE thread_id = ?1
            ORDER BY step ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("select history: {e}"),
        })?;

        rows.iter().map(Self::row_to_checkpoint).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_threads(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM threads
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("list threads: {e}"),
        })?;

        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }
}
