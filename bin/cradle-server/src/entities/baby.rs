use chrono::Utc;
use std::future::Future;

use crate::entities::{
    dao::{BabyRecord, LifeStage},
    parse_json_list, parse_ts, to_json_text, SqliteStore,
};

const BABY_COLUMNS: &str =
    "id, name, age, attributes, image_path, is_visible, life_stages, user_id, created_at";

pub trait BabyStore: Send + Sync + 'static {
    /// Every persona, admin view.
    fn list_babies(&self) -> impl Future<Output = Result<Vec<BabyRecord>, sqlx::Error>> + Send;

    /// Personas assigned to `user_id` that are currently visible.
    fn list_visible_assigned(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<BabyRecord>, sqlx::Error>> + Send;

    fn find_baby(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<BabyRecord>, sqlx::Error>> + Send;

    /// The catalog-wide visibility toggle: one statement over every row.
    fn set_all_visibility(
        &self,
        visible: bool,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Create a persona (initially invisible). Returns the new id.
    fn create_baby(
        &self,
        name: &str,
        age: &str,
        attributes: &[String],
        image_path: Option<&str>,
        owner_id: Option<i64>,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    fn assign_baby(
        &self,
        baby_id: i64,
        user_id: i64,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Union of the user's selected persona and any persona with chat
    /// history for them, restricted to visible rows.
    fn my_babies(
        &self,
        user_id: i64,
        selected_baby_id: Option<i64>,
    ) -> impl Future<Output = Result<Vec<BabyRecord>, sqlx::Error>> + Send;

    /// Insert the demo personas unless rows with the same names exist.
    fn seed_demo_babies(&self) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

type BabyRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    bool,
    String,
    Option<i64>,
    String,
);

fn row_to_baby(row: BabyRow) -> BabyRecord {
    let (id, name, age, attributes, image_path, is_visible, life_stages, user_id, created_at) = row;
    BabyRecord {
        id,
        name,
        age,
        attributes: parse_json_list(&attributes),
        image_path,
        is_visible,
        life_stages: parse_json_list::<LifeStage>(&life_stages),
        user_id,
        created_at: parse_ts(&created_at),
    }
}

impl BabyStore for SqliteStore {
    async fn list_babies(&self) -> Result<Vec<BabyRecord>, sqlx::Error> {
        let rows: Vec<BabyRow> =
            sqlx::query_as(&format!("SELECT {BABY_COLUMNS} FROM babies ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(row_to_baby).collect())
    }

    async fn list_visible_assigned(&self, user_id: i64) -> Result<Vec<BabyRecord>, sqlx::Error> {
        let rows: Vec<BabyRow> = sqlx::query_as(&format!(
            "SELECT {BABY_COLUMNS} FROM babies \
             WHERE user_id = ?1 AND is_visible = 1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_baby).collect())
    }

    async fn find_baby(&self, id: i64) -> Result<Option<BabyRecord>, sqlx::Error> {
        let row: Option<BabyRow> =
            sqlx::query_as(&format!("SELECT {BABY_COLUMNS} FROM babies WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(row_to_baby))
    }

    async fn set_all_visibility(&self, visible: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE babies SET is_visible = ?1")
            .bind(visible)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_baby(
        &self,
        name: &str,
        age: &str,
        attributes: &[String],
        image_path: Option<&str>,
        owner_id: Option<i64>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO babies (name, age, attributes, image_path, is_visible, user_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
        )
        .bind(name)
        .bind(age)
        .bind(to_json_text(&attributes))
        .bind(image_path)
        .bind(owner_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn assign_baby(&self, baby_id: i64, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE babies SET user_id = ?1 WHERE id = ?2")
            .bind(user_id)
            .bind(baby_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn my_babies(
        &self,
        user_id: i64,
        selected_baby_id: Option<i64>,
    ) -> Result<Vec<BabyRecord>, sqlx::Error> {
        let rows: Vec<BabyRow> = sqlx::query_as(
            "SELECT DISTINCT b.id, b.name, b.age, b.attributes, b.image_path, b.is_visible, \
                    b.life_stages, b.user_id, b.created_at \
             FROM babies b \
             LEFT JOIN chat_sessions cs ON b.id = cs.baby_id AND cs.user_id = ?1 \
             WHERE b.is_visible = 1 AND (cs.baby_id IS NOT NULL OR b.id = ?2) \
             ORDER BY b.id",
        )
        .bind(user_id)
        .bind(selected_baby_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_baby).collect())
    }

    async fn seed_demo_babies(&self) -> Result<u64, sqlx::Error> {
        let demos: [(&str, &str, &[&str], &str); 3] = [
            (
                "Lily",
                "6 months",
                &["smart", "curious", "giggly"],
                "https://images.unsplash.com/photo-1515488042361-ee00e0ddd4e4?w=400",
            ),
            (
                "Max",
                "8 months",
                &["funny", "playful", "energetic"],
                "https://images.unsplash.com/photo-1503454537195-1dcabb73ffb9?w=400",
            ),
            (
                "Emma",
                "5 months",
                &["sweet", "calm", "loving"],
                "https://images.unsplash.com/photo-1544642899-f0d6e5f6ed6f?w=400",
            ),
        ];

        let mut inserted = 0;
        for (name, age, attributes, image_path) in demos {
            let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM babies WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
            if existing.is_some() {
                continue;
            }
            let attributes: Vec<String> = attributes.iter().map(|s| s.to_string()).collect();
            self.create_baby(name, age, &attributes, Some(image_path), None)
                .await?;
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{ChatStore, Role, UserStore};

    #[tokio::test]
    async fn create_starts_invisible_and_visibility_is_global() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let attrs = vec!["curious".to_string()];
        let a = store.create_baby("Lily", "6 months", &attrs, None, None).await.unwrap();
        let b = store.create_baby("Max", "8 months", &attrs, None, None).await.unwrap();

        assert!(!store.find_baby(a).await.unwrap().unwrap().is_visible);

        store.set_all_visibility(true).await.unwrap();
        assert!(store.find_baby(a).await.unwrap().unwrap().is_visible);
        assert!(store.find_baby(b).await.unwrap().unwrap().is_visible);

        store.set_all_visibility(false).await.unwrap();
        assert!(!store.find_baby(b).await.unwrap().unwrap().is_visible);
    }

    #[tokio::test]
    async fn assigned_listing_filters_on_owner_and_visibility() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let user = store.create_user("a@example.com", "h", Role::User).await.unwrap();
        let attrs = vec!["calm".to_string()];
        let mine = store.create_baby("Emma", "5 months", &attrs, None, Some(user)).await.unwrap();
        store.create_baby("Other", "7 months", &attrs, None, None).await.unwrap();

        // Invisible: nothing listed even though assigned.
        assert!(store.list_visible_assigned(user).await.unwrap().is_empty());

        store.set_all_visibility(true).await.unwrap();
        let listed = store.list_visible_assigned(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine);

        // Admin view sees everything regardless.
        assert_eq!(store.list_babies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn attributes_and_life_stages_roundtrip_json() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let attrs = vec!["smart".to_string(), "giggly".to_string()];
        let id = store.create_baby("Lily", "6 months", &attrs, Some("lily.png"), None).await.unwrap();

        let baby = store.find_baby(id).await.unwrap().unwrap();
        assert_eq!(baby.attributes, attrs);
        assert_eq!(baby.image_path.as_deref(), Some("lily.png"));
        assert!(baby.life_stages.is_empty());
    }

    #[tokio::test]
    async fn my_babies_unions_selection_and_chat_history() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let user = store.create_user("a@example.com", "h", Role::User).await.unwrap();
        let attrs = vec!["calm".to_string()];
        let selected = store.create_baby("Emma", "5 months", &attrs, None, None).await.unwrap();
        let chatted = store.create_baby("Max", "8 months", &attrs, None, None).await.unwrap();
        let untouched = store.create_baby("Lily", "6 months", &attrs, None, None).await.unwrap();
        store.set_all_visibility(true).await.unwrap();

        store.ensure_session(user, chatted).await.unwrap();

        let mine = store.my_babies(user, Some(selected)).await.unwrap();
        let ids: Vec<i64> = mine.iter().map(|b| b.id).collect();
        assert!(ids.contains(&selected));
        assert!(ids.contains(&chatted));
        assert!(!ids.contains(&untouched));

        // Hidden personas never appear, selected or not.
        store.set_all_visibility(false).await.unwrap();
        assert!(store.my_babies(user, Some(selected)).await.unwrap().is_empty());

        // No selection: only chat-history personas qualify.
        store.set_all_visibility(true).await.unwrap();
        let mine = store.my_babies(user, None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, chatted);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        assert_eq!(store.seed_demo_babies().await.unwrap(), 3);
        assert_eq!(store.seed_demo_babies().await.unwrap(), 0);
        assert_eq!(store.list_babies().await.unwrap().len(), 3);
    }
}
