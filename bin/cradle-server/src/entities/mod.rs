//! Persistence layer.
//!
//! [`SqliteStore`] owns the connection pool; one trait per entity
//! (`UserStore`, `BabyStore`, `QuestionnaireStore`, `ChatStore`,
//! `SettingStore`) defines the operations and is implemented for
//! `SqliteStore` in the sibling modules. To swap to another database,
//! implement the traits for a new type and change the concrete type in
//! [`crate::state::AppState`].
//!
//! All trait methods use `impl Future` in their signatures (stable since
//! Rust 1.75) so no extra `async-trait` crate is required.
//!
//! Array-ish columns (`attributes`, `image_paths`, `life_stages`) and the
//! questionnaire `answers` document are stored as JSON TEXT; timestamps are
//! RFC 3339 TEXT. The schema is created in code so that startup and the
//! `/init-db` endpoint share one path.

pub mod baby;
pub mod chat;
pub mod dao;
pub mod questionnaire;
pub mod setting;
pub mod user;

pub use dao::{
    BabyRecord, ChatMessageRecord, LifeStage, QuestionnaireOverviewRecord, QuestionnaireRecord,
    Role, UserRecord,
};

pub use baby::BabyStore;
pub use chat::ChatStore;
pub use questionnaire::QuestionnaireStore;
pub use setting::SettingStore;
pub use user::UserStore;

use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::{Sqlite, SqlitePool};

/// SQLite-backed store for every entity in the system.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url`.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://cradle.db"`. The schema is NOT created here; call
    /// [`SqliteStore::init_schema`] once after connecting.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        if !url.contains("memory") && !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }
        let pool = SqlitePool::connect(url).await?;
        Ok(Self { pool })
    }

    /// The underlying pool, for test fixtures that need raw SQL.
    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// A private in-memory database for tests.
    ///
    /// The pool is capped at a single connection because every connection
    /// to `sqlite::memory:` gets its own database.
    #[cfg(test)]
    pub async fn connect_in_memory() -> Result<Self, sqlx::Error> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create all tables if absent and seed the settings row.
    ///
    /// Idempotent; invoked at startup and from `GET /init-db`.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                selected_baby_id INTEGER,
                partner TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS questionnaires (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER UNIQUE NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                answers TEXT NOT NULL DEFAULT '{}',
                image_paths TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS babies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age TEXT NOT NULL,
                attributes TEXT NOT NULL DEFAULT '[]',
                image_path TEXT,
                is_visible INTEGER NOT NULL DEFAULT 0,
                life_stages TEXT NOT NULL DEFAULT '[]',
                user_id INTEGER REFERENCES users(id),
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                baby_id INTEGER NOT NULL REFERENCES babies(id) ON DELETE CASCADE,
                message TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                baby_id INTEGER NOT NULL REFERENCES babies(id) ON DELETE CASCADE,
                message_count INTEGER NOT NULL DEFAULT 0,
                UNIQUE(user_id, baby_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // The questionnaire lock starts open.
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES ('questionnaires_locked', 0)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ── column codecs shared by the entity impls ─────────────────────────────────

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

pub(crate) fn parse_json_list<T: serde::de::DeserializeOwned>(raw: &str) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored JSON list; using empty");
        Vec::new()
    })
}

pub(crate) fn parse_answers(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored answers; using empty object");
        serde_json::json!({})
    })
}

pub(crate) fn to_json_text<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_owned())
}
