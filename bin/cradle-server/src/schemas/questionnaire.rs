use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::QuestionnaireOverviewRecord;

/// Body of `GET /questionnaire`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionnaireResponse {
    /// Opaque answer document; defaults to `{}`.
    pub answers: serde_json::Value,
    pub image_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveQuestionnaireRequest {
    #[serde(default)]
    pub answers: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

/// One row of `GET /questionnaires/all` (admin).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionnaireOverview {
    pub user_id: i64,
    pub email: String,
    pub answers: serde_json::Value,
    pub image_paths: Vec<String>,
    pub updated_at: Option<String>,
}

impl QuestionnaireOverviewRecord {
    pub fn to_response(&self) -> QuestionnaireOverview {
        QuestionnaireOverview {
            user_id: self.user_id,
            email: self.email.clone(),
            answers: self
                .answers
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            image_paths: self.image_paths.clone().unwrap_or_default(),
            updated_at: self.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}
