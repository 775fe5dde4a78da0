//! SQLite-backed local store

use crate::mesh::{MeshMessage, NodeIdentity, HISTORY_LIMIT};
use crate::store::error::StoreResult;
use crate::store::LocalStore;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

pub struct SqliteStore {
    pool: SqlitePool,
    limit: usize,
}

impl SqliteStore {
    /// Open a store backed by the SQLite database at `db_url`
    /// (for example `sqlite://floodmesh.db?mode=rwc`)
    pub async fn new(db_url: &str) -> StoreResult<Self> {
        let pool = SqlitePool::connect(db_url).await?;
        Self::init(pool).await
    }

    /// Create a store with an in-memory database (for testing)
    pub async fn new_in_memory() -> StoreResult<Self> {
        // Every pooled connection would get its own in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identity (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                node_id TEXT NOT NULL,
                nickname TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                channel_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                body TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_channel ON messages(channel_id, timestamp)")
            .execute(&pool)
            .await?;

        Ok(Self {
            pool,
            limit: HISTORY_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    async fn try_append(&self, message: &MeshMessage) -> StoreResult<()> {
        let body = serde_json::to_string(message)?;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO messages (id, channel_id, timestamp, body) VALUES (?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.channel_id)
        .bind(message.timestamp)
        .bind(body)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() > 0 {
            // Oldest insertions go first once the log is over its bound
            sqlx::query(
                "DELETE FROM messages WHERE seq NOT IN (SELECT seq FROM messages ORDER BY seq DESC LIMIT ?)",
            )
            .bind(self.limit as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn try_load_history(&self, channel_id: &str) -> StoreResult<Vec<MeshMessage>> {
        let rows = sqlx::query(
            "SELECT id, body FROM messages WHERE channel_id = ? ORDER BY timestamp ASC, seq ASC",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let body: String = row.try_get("body")?;
            match serde_json::from_str::<MeshMessage>(&body) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    let id: String = row.try_get("id").unwrap_or_default();
                    tracing::warn!("Skipping unreadable stored message {}: {}", id, e);
                }
            }
        }

        Ok(messages)
    }

    async fn try_load_identity(&self) -> StoreResult<Option<NodeIdentity>> {
        let row = sqlx::query("SELECT node_id, nickname FROM identity WHERE slot = 0")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(NodeIdentity {
                node_id: row.try_get("node_id")?,
                nickname: row.try_get("nickname")?,
            })),
            None => Ok(None),
        }
    }

    async fn try_save_identity(&self, identity: &NodeIdentity) -> StoreResult<()> {
        sqlx::query("INSERT OR REPLACE INTO identity (slot, node_id, nickname) VALUES (0, ?, ?)")
            .bind(&identity.node_id)
            .bind(&identity.nickname)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of stored messages across all channels
    pub async fn count(&self) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM messages")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }

    /// Close database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn load_history(&self, channel_id: &str) -> Vec<MeshMessage> {
        match self.try_load_history(channel_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to load history for {}: {}", channel_id, e);
                Vec::new()
            }
        }
    }

    async fn append_message(&self, message: &MeshMessage) {
        if let Err(e) = self.try_append(message).await {
            tracing::warn!("Failed to persist message {}: {}", message.id, e);
        }
    }

    async fn load_identity(&self) -> Option<NodeIdentity> {
        match self.try_load_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("Failed to load identity: {}", e);
                None
            }
        }
    }

    async fn save_identity(&self, identity: &NodeIdentity) {
        if let Err(e) = self.try_save_identity(identity).await {
            tracing::warn!("Failed to persist identity {}: {}", identity.node_id, e);
        }
    }
}
