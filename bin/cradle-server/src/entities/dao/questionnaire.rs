use chrono::{DateTime, Utc};

/// A row in the `questionnaires` table. Exactly one per user.
#[derive(Debug, Clone)]
pub struct QuestionnaireRecord {
    pub id: i64,
    pub user_id: i64,
    /// Opaque answer document; the server never inspects its keys.
    pub answers: serde_json::Value,
    pub image_paths: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the admin overview: every plain user left-joined against
/// their questionnaire, so users without one still appear.
#[derive(Debug, Clone)]
pub struct QuestionnaireOverviewRecord {
    pub user_id: i64,
    pub email: String,
    pub answers: Option<serde_json::Value>,
    pub image_paths: Option<Vec<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}
