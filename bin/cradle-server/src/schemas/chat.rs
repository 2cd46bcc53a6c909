use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{ChatMessageRecord, LifeStage};

/// One persisted turn in the history response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatHistoryMessage {
    pub message: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub timestamp: String,
}

impl ChatMessageRecord {
    pub fn to_response(&self) -> ChatHistoryMessage {
        ChatHistoryMessage {
            message: self.message.clone(),
            role: self.role.clone(),
            timestamp: self.created_at.to_rfc3339(),
        }
    }
}

/// Body of `GET /chat/{baby_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatHistoryMessage>,
    pub message_count: i64,
}

/// Body of `POST /chat/{baby_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Optional life stage; when present the persona prompt is built from
    /// its age and description instead of the persona's defaults.
    #[serde(default)]
    pub stage: Option<LifeStage>,
}

/// A successful chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    /// The persona's reply.
    pub message: String,
    pub message_count: i64,
    /// `true` once this turn consumed the last allowed exchange.
    pub limit_reached: bool,
}
