//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::llm::AnthropicClient;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent store for users, personas, questionnaires, and chats.
    pub store: Arc<SqliteStore>,
    /// Client for the upstream model API.
    pub llm: Arc<AnthropicClient>,
}
