//! Registration, login, and account routes.
//!
//! The bearer token carries the email; every handler re-reads the user row,
//! so role changes and deletions take effect immediately.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;

use crate::entities::{Role, UserStore};
use crate::error::ServerError;
use crate::middleware::auth::AuthIdentity;
use crate::routes::{current_user, require_admin};
use crate::schemas::auth::{
    AuthResponse, ChangePasswordRequest, CredentialsRequest, MeResponse, PartnerRequest,
    UserSummary,
};
use crate::security::password::{hash_password, verify_password};
use crate::security::token::issue_token;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(register, login, me, change_password, update_partner, list_users),
    components(schemas(
        CredentialsRequest,
        AuthResponse,
        MeResponse,
        ChangePasswordRequest,
        PartnerRequest,
        UserSummary
    ))
)]
pub struct AuthApi;

/// Routes reachable without a token.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes behind bearer authentication.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/change-password", post(change_password))
        .route("/auth/partner", post(update_partner))
        .route("/auth/users", get(list_users))
}

/// Create an account (`POST /api/auth/register`).
///
/// The configured admin email registers with the admin role; everyone else
/// is a plain user. An empty questionnaire row is created alongside.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing input or email already registered"),
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ServerError::BadRequest("Email and password required".into()));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ServerError::BadRequest("Email already registered".into()));
    }

    let role = if email == state.config.admin_email {
        Role::Admin
    } else {
        Role::User
    };

    let password_hash = hash_password(&password)
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))?;
    state.store.create_user(&email, &password_hash, role).await?;

    let token = issue_token(&email, &state.config.jwt_secret)
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, role, email })))
}

/// Exchange credentials for a fresh token (`POST /api/auth/login`).
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Missing input"),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ServerError::BadRequest("Email and password required".into()));
    }

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&password, &user.password_hash) {
        return Err(ServerError::Unauthorized("Invalid credentials".into()));
    }

    let token = issue_token(&user.email, &state.config.jwt_secret)
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(AuthResponse {
        token,
        role: user.role,
        email: user.email,
    }))
}

/// Who am I (`GET /api/auth/me`).
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<MeResponse>, ServerError> {
    let user = current_user(&state, &identity).await?;
    Ok(Json(user.to_me_response()))
}

/// Rotate the password after checking the current one
/// (`POST /api/auth/change-password`).
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = Value),
        (status = 400, description = "Missing input"),
        (status = 401, description = "Current password incorrect"),
    )
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ServerError> {
    let current = req.current_password.unwrap_or_default();
    let new = req.new_password.unwrap_or_default();
    if current.is_empty() || new.is_empty() {
        return Err(ServerError::BadRequest(
            "Current and new password required".into(),
        ));
    }

    let user = current_user(&state, &identity).await?;
    if !verify_password(&current, &user.password_hash) {
        return Err(ServerError::Unauthorized(
            "Current password is incorrect".into(),
        ));
    }

    let password_hash = hash_password(&new)
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))?;
    state.store.update_password(user.id, &password_hash).await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// Overwrite the partner field (`POST /api/auth/partner`).
#[utoipa::path(
    post,
    path = "/api/auth/partner",
    tag = "auth",
    request_body = PartnerRequest,
    responses(
        (status = 200, description = "Partner updated", body = Value),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn update_partner(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<PartnerRequest>,
) -> Result<Json<Value>, ServerError> {
    let user = current_user(&state, &identity).await?;
    state
        .store
        .update_partner(user.id, &req.partner.unwrap_or_default())
        .await?;
    Ok(Json(json!({ "message": "Partner updated" })))
}

/// All users, newest first (`GET /api/auth/users`, admin only).
#[utoipa::path(
    get,
    path = "/api/auth/users",
    tag = "auth",
    responses(
        (status = 200, description = "User list", body = Vec<UserSummary>),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<UserSummary>>, ServerError> {
    let user = current_user(&state, &identity).await?;
    require_admin(&user)?;

    let users = state.store.list_users().await?;
    Ok(Json(users.iter().map(|u| u.to_summary()).collect()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::routes::test_util::{register_user, test_state};

    fn credentials(email: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn admin_email_registers_as_admin() {
        let state = test_state().await;
        let (status, Json(body)) = register(
            State(state.clone()),
            Json(credentials("admin@example.com", "pw")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.role, Role::Admin);

        let (_, Json(body)) = register(
            State(state),
            Json(credentials("someone@example.com", "pw")),
        )
        .await
        .unwrap();
        assert_eq!(body.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_registration_fails_both_times() {
        let state = test_state().await;
        register(State(state.clone()), Json(credentials("a@example.com", "pw")))
            .await
            .unwrap();

        for _ in 0..2 {
            let err = register(State(state.clone()), Json(credentials("a@example.com", "pw")))
                .await
                .unwrap_err();
            assert!(matches!(err, ServerError::BadRequest(_)));
        }
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let state = test_state().await;
        let req = CredentialsRequest {
            email: Some("a@example.com".into()),
            password: None,
        };
        assert!(matches!(
            register(State(state.clone()), Json(req.clone())).await.unwrap_err(),
            ServerError::BadRequest(_)
        ));
        assert!(matches!(
            login(State(state), Json(req)).await.unwrap_err(),
            ServerError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn register_then_login_roundtrips() {
        let state = test_state().await;
        register(State(state.clone()), Json(credentials("a@example.com", "pw")))
            .await
            .unwrap();

        let Json(body) = login(State(state.clone()), Json(credentials("a@example.com", "pw")))
            .await
            .unwrap();
        assert_eq!(body.email, "a@example.com");
        assert!(!body.token.is_empty());

        let err = login(State(state), Json(credentials("a@example.com", "wrong")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn me_reflects_the_user_row() {
        let state = test_state().await;
        let (id, identity) = register_user(&state, "a@example.com", Role::User).await;

        let Json(body) = me(State(state.clone()), Extension(identity.clone()))
            .await
            .unwrap();
        assert_eq!(body.id, id);
        assert_eq!(body.email, "a@example.com");
        assert_eq!(body.selected_baby_id, None);

        // Token for a vanished row resolves to 404.
        let ghost = AuthIdentity {
            email: "ghost@example.com".into(),
        };
        assert!(matches!(
            me(State(state), Extension(ghost)).await.unwrap_err(),
            ServerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn change_password_checks_the_current_one() {
        let state = test_state().await;
        let (_, identity) = register_user(&state, "a@example.com", Role::User).await;

        let err = change_password(
            State(state.clone()),
            Extension(identity.clone()),
            Json(ChangePasswordRequest {
                current_password: Some("wrong".into()),
                new_password: Some("new".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));

        change_password(
            State(state.clone()),
            Extension(identity),
            Json(ChangePasswordRequest {
                current_password: Some("password".into()),
                new_password: Some("new".into()),
            }),
        )
        .await
        .unwrap();

        let Json(body) = login(State(state), Json(credentials("a@example.com", "new")))
            .await
            .unwrap();
        assert!(!body.token.is_empty());
    }

    #[tokio::test]
    async fn partner_is_overwritten_unconditionally() {
        let state = test_state().await;
        let (_, identity) = register_user(&state, "a@example.com", Role::User).await;

        update_partner(
            State(state.clone()),
            Extension(identity.clone()),
            Json(PartnerRequest {
                partner: Some("b@example.com".into()),
            }),
        )
        .await
        .unwrap();

        let Json(body) = me(State(state), Extension(identity)).await.unwrap();
        assert_eq!(body.partner.as_deref(), Some("b@example.com"));
    }

    #[tokio::test]
    async fn user_listing_is_admin_only() {
        let state = test_state().await;
        let (_, admin) = register_user(&state, "admin@example.com", Role::Admin).await;
        let (_, user) = register_user(&state, "a@example.com", Role::User).await;

        let err = list_users(State(state.clone()), Extension(user))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));

        let Json(users) = list_users(State(state), Extension(admin)).await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
