use chrono::Utc;
use std::future::Future;

use crate::entities::{
    dao::{QuestionnaireOverviewRecord, QuestionnaireRecord},
    parse_answers, parse_json_list, parse_ts, to_json_text, SqliteStore,
};

pub trait QuestionnaireStore: Send + Sync + 'static {
    fn questionnaire_for_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<QuestionnaireRecord>, sqlx::Error>> + Send;

    /// Replace the answer document wholesale, creating the row if the
    /// registration-time insert is somehow missing.
    fn save_answers(
        &self,
        user_id: i64,
        answers: &serde_json::Value,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Append an uploaded filename to the user's image list.
    fn append_image_path(
        &self,
        user_id: i64,
        filename: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Admin overview: every plain user left-joined against their
    /// questionnaire, most recently updated first.
    fn list_questionnaires(
        &self,
    ) -> impl Future<Output = Result<Vec<QuestionnaireOverviewRecord>, sqlx::Error>> + Send;
}

impl QuestionnaireStore for SqliteStore {
    async fn questionnaire_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<QuestionnaireRecord>, sqlx::Error> {
        let row: Option<(i64, i64, String, String, String)> = sqlx::query_as(
            "SELECT id, user_id, answers, image_paths, updated_at \
             FROM questionnaires WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, user_id, answers, image_paths, updated_at)| QuestionnaireRecord {
            id,
            user_id,
            answers: parse_answers(&answers),
            image_paths: parse_json_list(&image_paths),
            updated_at: parse_ts(&updated_at),
        }))
    }

    async fn save_answers(
        &self,
        user_id: i64,
        answers: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO questionnaires (user_id, answers, image_paths, updated_at) \
             VALUES (?1, ?2, '[]', ?3) \
             ON CONFLICT(user_id) DO UPDATE SET answers = ?2, updated_at = ?3",
        )
        .bind(user_id)
        .bind(answers.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_image_path(&self, user_id: i64, filename: &str) -> Result<(), sqlx::Error> {
        let current: Option<(String,)> =
            sqlx::query_as("SELECT image_paths FROM questionnaires WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let mut paths: Vec<String> = current
            .map(|(raw,)| parse_json_list(&raw))
            .unwrap_or_default();
        paths.push(filename.to_owned());

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO questionnaires (user_id, answers, image_paths, updated_at) \
             VALUES (?1, '{}', ?2, ?3) \
             ON CONFLICT(user_id) DO UPDATE SET image_paths = ?2, updated_at = ?3",
        )
        .bind(user_id)
        .bind(to_json_text(&paths))
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_questionnaires(
        &self,
    ) -> Result<Vec<QuestionnaireOverviewRecord>, sqlx::Error> {
        let rows: Vec<(i64, String, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT u.id, u.email, q.answers, q.image_paths, q.updated_at \
                 FROM users u \
                 LEFT JOIN questionnaires q ON u.id = q.user_id \
                 WHERE u.role = 'user' \
                 ORDER BY q.updated_at DESC",
            )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(user_id, email, answers, image_paths, updated_at)| {
                QuestionnaireOverviewRecord {
                    user_id,
                    email,
                    answers: answers.map(|raw| parse_answers(&raw)),
                    image_paths: image_paths.map(|raw| parse_json_list(&raw)),
                    updated_at: updated_at.map(|raw| parse_ts(&raw)),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{Role, UserStore};
    use serde_json::json;

    #[tokio::test]
    async fn save_replaces_answers_wholesale() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let user = store.create_user("a@example.com", "h", Role::User).await.unwrap();

        store
            .save_answers(user, &json!({"q1": "yes", "q2": "no"}))
            .await
            .unwrap();
        store.save_answers(user, &json!({"q3": "maybe"})).await.unwrap();

        let q = store.questionnaire_for_user(user).await.unwrap().unwrap();
        assert_eq!(q.answers, json!({"q3": "maybe"}));
    }

    #[tokio::test]
    async fn exactly_one_row_per_user() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let user = store.create_user("a@example.com", "h", Role::User).await.unwrap();

        store.save_answers(user, &json!({"a": 1})).await.unwrap();
        store.save_answers(user, &json!({"a": 2})).await.unwrap();

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM questionnaires WHERE user_id = ?1")
                .bind(user)
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn image_paths_append_in_order() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let user = store.create_user("a@example.com", "h", Role::User).await.unwrap();

        store.append_image_path(user, "1_first.png").await.unwrap();
        store.append_image_path(user, "1_second.jpg").await.unwrap();

        let q = store.questionnaire_for_user(user).await.unwrap().unwrap();
        assert_eq!(q.image_paths, vec!["1_first.png", "1_second.jpg"]);
    }

    #[tokio::test]
    async fn overview_keeps_users_without_questionnaire() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.create_user("admin@example.com", "h", Role::Admin).await.unwrap();
        let user = store.create_user("a@example.com", "h", Role::User).await.unwrap();

        // Simulate a user whose questionnaire row is missing entirely.
        sqlx::query("DELETE FROM questionnaires WHERE user_id = ?1")
            .bind(user)
            .execute(&store.pool)
            .await
            .unwrap();

        let overview = store.list_questionnaires().await.unwrap();
        // Admins are excluded; the plain user still appears with null fields.
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].email, "a@example.com");
        assert!(overview[0].answers.is_none());
        assert!(overview[0].updated_at.is_none());
    }
}
