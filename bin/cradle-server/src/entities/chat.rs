use chrono::Utc;
use std::future::Future;

use crate::entities::{dao::ChatMessageRecord, parse_ts, SqliteStore};

pub trait ChatStore: Send + Sync + 'static {
    fn append_chat_message(
        &self,
        user_id: i64,
        baby_id: i64,
        message: &str,
        role: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Full conversation for a (user, persona) pair, oldest first.
    fn chat_history(
        &self,
        user_id: i64,
        baby_id: i64,
    ) -> impl Future<Output = Result<Vec<ChatMessageRecord>, sqlx::Error>> + Send;

    /// Lazily create the exchange counter for a pair.
    fn ensure_session(
        &self,
        user_id: i64,
        baby_id: i64,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Current exchange counter; 0 when no session row exists yet.
    fn message_count(
        &self,
        user_id: i64,
        baby_id: i64,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// Add one exchange (+2) to the counter and return the new value.
    fn bump_message_count(
        &self,
        user_id: i64,
        baby_id: i64,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
}

impl ChatStore for SqliteStore {
    async fn append_chat_message(
        &self,
        user_id: i64,
        baby_id: i64,
        message: &str,
        role: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO chat_messages (user_id, baby_id, message, role, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user_id)
        .bind(baby_id)
        .bind(message)
        .bind(role)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn chat_history(
        &self,
        user_id: i64,
        baby_id: i64,
    ) -> Result<Vec<ChatMessageRecord>, sqlx::Error> {
        let rows: Vec<(i64, i64, i64, String, String, String)> = sqlx::query_as(
            "SELECT id, user_id, baby_id, message, role, created_at \
             FROM chat_messages WHERE user_id = ?1 AND baby_id = ?2 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id)
        .bind(baby_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, user_id, baby_id, message, role, created_at)| ChatMessageRecord {
                id,
                user_id,
                baby_id,
                message,
                role,
                created_at: parse_ts(&created_at),
            })
            .collect())
    }

    async fn ensure_session(&self, user_id: i64, baby_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO chat_sessions (user_id, baby_id, message_count) \
             VALUES (?1, ?2, 0)",
        )
        .bind(user_id)
        .bind(baby_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn message_count(&self, user_id: i64, baby_id: i64) -> Result<i64, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT message_count FROM chat_sessions WHERE user_id = ?1 AND baby_id = ?2",
        )
        .bind(user_id)
        .bind(baby_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(n,)| n).unwrap_or(0))
    }

    async fn bump_message_count(&self, user_id: i64, baby_id: i64) -> Result<i64, sqlx::Error> {
        // Relative update so concurrent turns cannot lose increments; the
        // pre-flight cap check still races (documented, benign).
        sqlx::query(
            "UPDATE chat_sessions SET message_count = message_count + 2 \
             WHERE user_id = ?1 AND baby_id = ?2",
        )
        .bind(user_id)
        .bind(baby_id)
        .execute(&self.pool)
        .await?;
        self.message_count(user_id, baby_id).await
    }
}
