use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{Role, UserRecord};

/// Body of `POST /auth/register` and `POST /auth/login`.
///
/// Fields are optional so that missing input surfaces as the API's own
/// 400 response instead of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Token payload answered by register and login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    pub email: String,
}

/// Body of `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub selected_baby_id: Option<i64>,
    pub partner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PartnerRequest {
    #[serde(default)]
    pub partner: Option<String>,
}

/// One row of the admin user listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub selected_baby_id: Option<i64>,
    pub partner: Option<String>,
    pub created_at: String,
}

impl UserRecord {
    pub fn to_me_response(&self) -> MeResponse {
        MeResponse {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            selected_baby_id: self.selected_baby_id,
            partner: self.partner.clone(),
        }
    }

    pub fn to_summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            selected_baby_id: self.selected_baby_id,
            partner: self.partner.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
