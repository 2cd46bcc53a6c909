use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One stage in a persona's timeline, stored inside the `life_stages`
/// JSON column and echoed verbatim in API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LifeStage {
    pub age: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// A row in the `babies` table.
///
/// `attributes` and `life_stages` are JSON TEXT columns; the store handles
/// the (de)serialization.
#[derive(Debug, Clone)]
pub struct BabyRecord {
    pub id: i64,
    pub name: String,
    pub age: String,
    pub attributes: Vec<String>,
    pub image_path: Option<String>,
    pub is_visible: bool,
    pub life_stages: Vec<LifeStage>,
    /// Assigned owner, if any.
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
