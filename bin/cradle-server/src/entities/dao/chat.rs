use chrono::{DateTime, Utc};

/// A single message row in the `chat_messages` table.
#[derive(Debug, Clone)]
pub struct ChatMessageRecord {
    pub id: i64,
    pub user_id: i64,
    pub baby_id: i64,
    pub message: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub created_at: DateTime<Utc>,
}
