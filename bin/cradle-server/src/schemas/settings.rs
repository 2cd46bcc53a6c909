use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /settings/questionnaires-lock`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionnairesLockRequest {
    #[serde(default)]
    pub is_locked: bool,
}
