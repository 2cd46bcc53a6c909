use chrono::Utc;
use std::future::Future;

use crate::entities::{dao::Role, dao::UserRecord, parse_ts, SqliteStore};

const USER_COLUMNS: &str =
    "id, email, password_hash, role, selected_baby_id, partner, created_at";

pub trait UserStore: Send + Sync + 'static {
    /// Create a user together with its empty questionnaire row, in one
    /// transaction. Returns the new user id.
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;

    fn find_user_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;

    fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn update_partner(
        &self,
        user_id: i64,
        partner: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn set_selected_baby(
        &self,
        user_id: i64,
        baby_id: i64,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// All users, newest first.
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserRecord>, sqlx::Error>> + Send;
}

type UserRow = (
    i64,
    String,
    String,
    String,
    Option<i64>,
    Option<String>,
    String,
);

fn row_to_user(row: UserRow) -> UserRecord {
    let (id, email, password_hash, role, selected_baby_id, partner, created_at) = row;
    UserRecord {
        id,
        email,
        password_hash,
        role: role.parse().unwrap_or_else(|e| {
            tracing::warn!(raw = %role, error = %e, "unknown role in users table; treating as user");
            Role::User
        }),
        selected_baby_id,
        partner,
        created_at: parse_ts(&created_at),
    }
}

impl UserStore for SqliteStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let user_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO questionnaires (user_id, answers, image_paths, updated_at) \
             VALUES (?1, '{}', '[]', ?2)",
        )
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user_id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(row_to_user))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(row_to_user))
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_partner(&self, user_id: i64, partner: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET partner = ?1 WHERE id = ?2")
            .bind(partner)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_selected_baby(&self, user_id: i64, baby_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET selected_baby_id = ?1 WHERE id = ?2")
            .bind(baby_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_user).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::QuestionnaireStore;

    #[tokio::test]
    async fn create_user_also_creates_questionnaire() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let id = store
            .create_user("a@example.com", "hash", Role::User)
            .await
            .unwrap();

        let q = store.questionnaire_for_user(id).await.unwrap().unwrap();
        assert_eq!(q.answers, serde_json::json!({}));
        assert!(q.image_paths.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_by_unique_constraint() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store
            .create_user("a@example.com", "hash", Role::User)
            .await
            .unwrap();
        assert!(store
            .create_user("a@example.com", "hash", Role::User)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn find_and_update_fields() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let id = store
            .create_user("a@example.com", "hash", Role::Admin)
            .await
            .unwrap();

        let user = store.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.selected_baby_id, None);
        assert_eq!(user.partner, None);

        store.update_partner(id, "b@example.com").await.unwrap();
        store.update_password(id, "hash2").await.unwrap();
        let user = store.find_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.partner.as_deref(), Some("b@example.com"));
        assert_eq!(user.password_hash, "hash2");

        assert!(store.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_users_is_newest_first() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.create_user("first@example.com", "h", Role::User).await.unwrap();
        store.create_user("second@example.com", "h", Role::User).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        // Same-timestamp rows fall back to id order, newest first.
        assert_eq!(users[0].email, "second@example.com");
    }
}
