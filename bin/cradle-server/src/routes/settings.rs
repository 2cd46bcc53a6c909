//! Settings routes: the key → flag store behind admin toggles.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;

use crate::entities::setting::QUESTIONNAIRES_LOCKED;
use crate::entities::SettingStore;
use crate::error::ServerError;
use crate::middleware::auth::AuthIdentity;
use crate::routes::{current_user, require_admin};
use crate::schemas::settings::QuestionnairesLockRequest;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_settings, set_questionnaires_lock),
    components(schemas(QuestionnairesLockRequest))
)]
pub struct SettingsApi;

/// Register settings routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings", get(get_settings))
        .route("/settings/questionnaires-lock", post(set_questionnaires_lock))
}

/// The full flag mapping (`GET /api/settings`); any authenticated caller.
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Key → flag mapping", body = Value)
    )
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ServerError> {
    let mut map = Map::new();
    for (key, value) in state.store.settings_map().await? {
        map.insert(key, Value::Bool(value));
    }
    Ok(Json(Value::Object(map)))
}

/// Toggle the questionnaire lock
/// (`POST /api/settings/questionnaires-lock`, admin only).
#[utoipa::path(
    post,
    path = "/api/settings/questionnaires-lock",
    tag = "settings",
    request_body = QuestionnairesLockRequest,
    responses(
        (status = 200, description = "Lock updated", body = Value),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn set_questionnaires_lock(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<QuestionnairesLockRequest>,
) -> Result<Json<Value>, ServerError> {
    let user = current_user(&state, &identity).await?;
    require_admin(&user)?;

    state
        .store
        .set_setting(QUESTIONNAIRES_LOCKED, req.is_locked)
        .await?;
    Ok(Json(json!({
        "message": "Questionnaire lock updated",
        "is_locked": req.is_locked,
    })))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::Role;
    use crate::routes::test_util::{register_user, test_state};

    #[tokio::test]
    async fn settings_map_is_readable_by_anyone() {
        let state = test_state().await;
        let Json(body) = get_settings(State(state)).await.unwrap();
        assert_eq!(body["questionnaires_locked"], false);
    }

    #[tokio::test]
    async fn lock_toggle_is_admin_only() {
        let state = test_state().await;
        let (_, admin) = register_user(&state, "admin@example.com", Role::Admin).await;
        let (_, user) = register_user(&state, "a@example.com", Role::User).await;

        let err = set_questionnaires_lock(
            State(state.clone()),
            Extension(user),
            Json(QuestionnairesLockRequest { is_locked: true }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        set_questionnaires_lock(
            State(state.clone()),
            Extension(admin),
            Json(QuestionnairesLockRequest { is_locked: true }),
        )
        .await
        .unwrap();

        let Json(body) = get_settings(State(state)).await.unwrap();
        assert_eq!(body["questionnaires_locked"], true);
    }
}
