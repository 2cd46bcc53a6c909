use std::future::Future;

use crate::entities::SqliteStore;

/// Key of the flag that freezes questionnaire editing for everyone.
pub const QUESTIONNAIRES_LOCKED: &str = "questionnaires_locked";

pub trait SettingStore: Send + Sync + 'static {
    /// The full key → flag mapping.
    fn settings_map(
        &self,
    ) -> impl Future<Output = Result<Vec<(String, bool)>, sqlx::Error>> + Send;

    fn setting(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<bool>, sqlx::Error>> + Send;

    fn set_setting(
        &self,
        key: &str,
        value: bool,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl SettingStore for SqliteStore {
    async fn settings_map(&self) -> Result<Vec<(String, bool)>, sqlx::Error> {
        let rows: Vec<(String, bool)> =
            sqlx::query_as("SELECT key, value FROM settings ORDER BY key")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn setting(&self, key: &str) -> Result<Option<bool>, sqlx::Error> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn set_setting(&self, key: &str, value: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = ?2",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
