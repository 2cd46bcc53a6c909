use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{BabyRecord, LifeStage};

/// A persona as returned by every babies endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BabyResponse {
    pub id: i64,
    pub name: String,
    pub age: String,
    pub attributes: Vec<String>,
    pub image_path: Option<String>,
    pub is_visible: bool,
    pub life_stages: Vec<LifeStage>,
    pub user_id: Option<i64>,
}

impl BabyRecord {
    pub fn to_response(&self) -> BabyResponse {
        BabyResponse {
            id: self.id,
            name: self.name.clone(),
            age: self.age.clone(),
            attributes: self.attributes.clone(),
            image_path: self.image_path.clone(),
            is_visible: self.is_visible,
            life_stages: self.life_stages.clone(),
            user_id: self.user_id,
        }
    }
}

/// Body of `POST /babies/visibility` — the catalog-wide toggle.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisibilityRequest {
    #[serde(default)]
    pub is_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectBabyRequest {
    #[serde(default)]
    pub baby_id: Option<i64>,
}

/// Body of `GET /babies/selected`; `selected_baby` is `null` when nothing
/// is selected or the selected persona no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectedBabyResponse {
    pub selected_baby: Option<BabyResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBabyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    /// Optional owner to assign the new persona to.
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignBabyRequest {
    #[serde(default)]
    pub baby_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}
