//! Questionnaire routes: the per-user answer document and image uploads.
//!
//! Saving and uploading are both gated by the catalog-wide
//! `questionnaires_locked` flag.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;

use crate::entities::setting::QUESTIONNAIRES_LOCKED;
use crate::entities::{QuestionnaireStore, SettingStore};
use crate::error::ServerError;
use crate::middleware::auth::AuthIdentity;
use crate::routes::{current_user, require_admin};
use crate::schemas::questionnaire::{
    QuestionnaireOverview, QuestionnaireResponse, SaveQuestionnaireRequest, UploadResponse,
};
use crate::state::AppState;

/// Upload cap for questionnaire images.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024; // 1 MiB

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(OpenApi)]
#[openapi(
    paths(get_questionnaire, save_questionnaire, upload_image, list_questionnaires),
    components(schemas(
        QuestionnaireResponse,
        SaveQuestionnaireRequest,
        UploadResponse,
        QuestionnaireOverview
    ))
)]
pub struct QuestionnaireApi;

/// Register questionnaire routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/questionnaire",
            get(get_questionnaire).post(save_questionnaire),
        )
        .route("/questionnaire/upload", post(upload_image))
        .route("/questionnaires/all", get(list_questionnaires))
}

/// The caller's questionnaire (`GET /api/questionnaire`).
///
/// Answers default to `{}` and the image list to `[]`; nothing is created
/// on read.
#[utoipa::path(
    get,
    path = "/api/questionnaire",
    tag = "questionnaire",
    responses(
        (status = 200, description = "Questionnaire", body = QuestionnaireResponse),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn get_questionnaire(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<QuestionnaireResponse>, ServerError> {
    let user = current_user(&state, &identity).await?;

    let response = match state.store.questionnaire_for_user(user.id).await? {
        Some(q) => QuestionnaireResponse {
            answers: q.answers,
            image_paths: q.image_paths,
        },
        None => QuestionnaireResponse {
            answers: json!({}),
            image_paths: Vec::new(),
        },
    };
    Ok(Json(response))
}

/// Replace the answer document (`POST /api/questionnaire`).
#[utoipa::path(
    post,
    path = "/api/questionnaire",
    tag = "questionnaire",
    request_body = SaveQuestionnaireRequest,
    responses(
        (status = 200, description = "Saved", body = Value),
        (status = 403, description = "Questionnaires are locked"),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn save_questionnaire(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<SaveQuestionnaireRequest>,
) -> Result<Json<Value>, ServerError> {
    ensure_unlocked(&state).await?;

    let user = current_user(&state, &identity).await?;
    let answers = req.answers.unwrap_or_else(|| json!({}));
    state.store.save_answers(user.id, &answers).await?;
    Ok(Json(json!({ "message": "Questionnaire saved successfully" })))
}

/// Attach an image (`POST /api/questionnaire/upload`, multipart field
/// `image`).
///
/// The file lands in the upload directory as
/// `<user_id>_<sanitized original name>`; re-uploading the same name
/// overwrites the earlier file, which is expected.
#[utoipa::path(
    post,
    path = "/api/questionnaire/upload",
    tag = "questionnaire",
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing file, bad extension, or too large"),
        (status = 403, description = "Questionnaires are locked"),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let mut file_name = String::new();
    let mut file_bytes: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ServerError::BadRequest(format!("Failed to read multipart field: {e}"))
    })? {
        if field.name() == Some("image") {
            file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(|e| {
                ServerError::BadRequest(format!("Failed to read uploaded file: {e}"))
            })?;
            file_bytes = Some(data);
        }
    }

    let data = file_bytes.ok_or_else(|| ServerError::BadRequest("No image provided".into()))?;
    if file_name.is_empty() {
        return Err(ServerError::BadRequest("No file selected".into()));
    }
    if !allowed_file(&file_name) {
        return Err(ServerError::BadRequest("Invalid file type".into()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ServerError::BadRequest("File too large (max 1MB)".into()));
    }

    ensure_unlocked(&state).await?;
    let user = current_user(&state, &identity).await?;

    let upload_dir = PathBuf::from(&state.config.upload_dir);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| ServerError::Internal(format!("failed to create upload dir: {e}")))?;

    let filename = format!("{}_{}", user.id, sanitize_filename(&file_name));
    tokio::fs::write(upload_dir.join(&filename), &data)
        .await
        .map_err(|e| ServerError::Internal(format!("failed to store upload: {e}")))?;

    state.store.append_image_path(user.id, &filename).await?;
    Ok(Json(UploadResponse {
        message: "Image uploaded successfully".into(),
        filename,
    }))
}

/// Admin overview of every user's questionnaire
/// (`GET /api/questionnaires/all`).
#[utoipa::path(
    get,
    path = "/api/questionnaires/all",
    tag = "questionnaire",
    responses(
        (status = 200, description = "All questionnaires", body = Vec<QuestionnaireOverview>),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn list_questionnaires(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<QuestionnaireOverview>>, ServerError> {
    let user = current_user(&state, &identity).await?;
    require_admin(&user)?;

    let rows = state.store.list_questionnaires().await?;
    Ok(Json(rows.iter().map(|r| r.to_response()).collect()))
}

// ── helpers ──────────────────────────────────────────────────────────────────

async fn ensure_unlocked(state: &AppState) -> Result<(), ServerError> {
    if state
        .store
        .setting(QUESTIONNAIRES_LOCKED)
        .await?
        .unwrap_or(false)
    {
        return Err(ServerError::Forbidden(
            "Questionnaires are currently locked by admin".into(),
        ));
    }
    Ok(())
}

fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Strip anything that could escape the upload directory.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
