//! Persona catalog routes.
//!
//! Visibility is a single catalog-wide flag: the admin toggle flips every
//! row in one statement, there is no per-persona switch.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;

use crate::entities::{BabyStore, Role, UserStore};
use crate::error::ServerError;
use crate::middleware::auth::AuthIdentity;
use crate::routes::{current_user, require_admin};
use crate::schemas::babies::{
    AssignBabyRequest, BabyResponse, CreateBabyRequest, SelectBabyRequest, SelectedBabyResponse,
    VisibilityRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_babies,
        set_visibility,
        select_baby,
        get_selected,
        my_babies,
        create_baby,
        assign_baby
    ),
    components(schemas(
        BabyResponse,
        VisibilityRequest,
        SelectBabyRequest,
        SelectedBabyResponse,
        CreateBabyRequest,
        AssignBabyRequest
    ))
)]
pub struct BabiesApi;

/// Register persona routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/babies", get(list_babies).post(create_baby))
        .route("/babies/visibility", post(set_visibility))
        .route("/babies/selected", post(select_baby).get(get_selected))
        .route("/babies/my-babies", get(my_babies))
        .route("/babies/{baby_id}/assign", post(assign_baby))
}

/// List personas (`GET /api/babies`).
///
/// Admins see every row; users see only visible personas assigned to them.
#[utoipa::path(
    get,
    path = "/api/babies",
    tag = "babies",
    responses(
        (status = 200, description = "Persona list", body = Vec<BabyResponse>),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn list_babies(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<BabyResponse>>, ServerError> {
    let user = current_user(&state, &identity).await?;

    let babies = match user.role {
        Role::Admin => state.store.list_babies().await?,
        Role::User => state.store.list_visible_assigned(user.id).await?,
    };
    Ok(Json(babies.iter().map(|b| b.to_response()).collect()))
}

/// Flip visibility for the whole catalog
/// (`POST /api/babies/visibility`, admin only).
#[utoipa::path(
    post,
    path = "/api/babies/visibility",
    tag = "babies",
    request_body = VisibilityRequest,
    responses(
        (status = 200, description = "Visibility updated", body = Value),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn set_visibility(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<VisibilityRequest>,
) -> Result<Json<Value>, ServerError> {
    let user = current_user(&state, &identity).await?;
    require_admin(&user)?;

    state.store.set_all_visibility(req.is_visible).await?;
    Ok(Json(json!({
        "message": "Baby visibility updated",
        "is_visible": req.is_visible,
    })))
}

/// Select a persona for the caller (`POST /api/babies/selected`).
#[utoipa::path(
    post,
    path = "/api/babies/selected",
    tag = "babies",
    request_body = SelectBabyRequest,
    responses(
        (status = 200, description = "Selection stored", body = Value),
        (status = 400, description = "Missing baby id"),
        (status = 404, description = "Persona does not exist"),
    )
)]
pub async fn select_baby(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<SelectBabyRequest>,
) -> Result<Json<Value>, ServerError> {
    let baby_id = req
        .baby_id
        .ok_or_else(|| ServerError::BadRequest("Baby ID required".into()))?;

    let user = current_user(&state, &identity).await?;

    if state.store.find_baby(baby_id).await?.is_none() {
        return Err(ServerError::NotFound("Baby not found".into()));
    }

    state.store.set_selected_baby(user.id, baby_id).await?;
    Ok(Json(json!({
        "message": "Baby selected successfully",
        "baby_id": baby_id,
    })))
}

/// The caller's selected persona (`GET /api/babies/selected`).
///
/// `selected_baby` is `null` both when nothing was ever selected and when
/// the selected row no longer exists.
#[utoipa::path(
    get,
    path = "/api/babies/selected",
    tag = "babies",
    responses(
        (status = 200, description = "Current selection", body = SelectedBabyResponse),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn get_selected(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<SelectedBabyResponse>, ServerError> {
    let user = current_user(&state, &identity).await?;

    let selected_baby = match user.selected_baby_id {
        Some(id) => state.store.find_baby(id).await?.map(|b| b.to_response()),
        None => None,
    };
    Ok(Json(SelectedBabyResponse { selected_baby }))
}

/// Personas the caller has a relationship with
/// (`GET /api/babies/my-babies`): the current selection plus anything with
/// chat history, visible rows only.
#[utoipa::path(
    get,
    path = "/api/babies/my-babies",
    tag = "babies",
    responses(
        (status = 200, description = "Persona list", body = Vec<BabyResponse>),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn my_babies(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<BabyResponse>>, ServerError> {
    let user = current_user(&state, &identity).await?;

    let babies = state
        .store
        .my_babies(user.id, user.selected_baby_id)
        .await?;
    Ok(Json(babies.iter().map(|b| b.to_response()).collect()))
}

/// Create a persona (`POST /api/babies`, admin only). New personas start
/// invisible until the catalog toggle reveals them.
#[utoipa::path(
    post,
    path = "/api/babies",
    tag = "babies",
    request_body = CreateBabyRequest,
    responses(
        (status = 201, description = "Persona created", body = Value),
        (status = 400, description = "Missing name or age"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Assigned owner does not exist"),
    )
)]
pub async fn create_baby(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CreateBabyRequest>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let user = current_user(&state, &identity).await?;
    require_admin(&user)?;

    let name = req.name.unwrap_or_default();
    let age = req.age.unwrap_or_default();
    if name.is_empty() || age.is_empty() {
        return Err(ServerError::BadRequest("Name and age required".into()));
    }

    if let Some(owner_id) = req.user_id {
        if state.store.find_user_by_id(owner_id).await?.is_none() {
            return Err(ServerError::NotFound("User not found".into()));
        }
    }

    let id = state
        .store
        .create_baby(
            &name,
            &age,
            &req.attributes,
            req.image_path.as_deref(),
            req.user_id,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Baby created", "id": id })),
    ))
}

/// Assign a persona to a user (`POST /api/babies/{baby_id}/assign`, admin
/// only). Both ids come from the body; the path id is kept for URL
/// compatibility.
#[utoipa::path(
    post,
    path = "/api/babies/{baby_id}/assign",
    tag = "babies",
    request_body = AssignBabyRequest,
    params(("baby_id" = i64, Path, description = "Persona id (informational)")),
    responses(
        (status = 200, description = "Persona assigned", body = Value),
        (status = 400, description = "Missing ids"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Persona or user does not exist"),
    )
)]
pub async fn assign_baby(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(_baby_id): Path<i64>,
    Json(req): Json<AssignBabyRequest>,
) -> Result<Json<Value>, ServerError> {
    let user = current_user(&state, &identity).await?;
    require_admin(&user)?;

    let (baby_id, owner_id) = match (req.baby_id, req.user_id) {
        (Some(b), Some(u)) => (b, u),
        _ => {
            return Err(ServerError::BadRequest(
                "Baby ID and User ID required".into(),
            ))
        }
    };

    if state.store.find_baby(baby_id).await?.is_none() {
        return Err(ServerError::NotFound("Baby not found".into()));
    }
    if state.store.find_user_by_id(owner_id).await?.is_none() {
        return Err(ServerError::NotFound("User not found".into()));
    }

    state.store.assign_baby(baby_id, owner_id).await?;
    Ok(Json(json!({ "message": "Baby assigned to user successfully" })))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
