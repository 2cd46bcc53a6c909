//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `CRADLE_ENABLE_SWAGGER=false`)
//! - Public routes (health, init-db, register, login, uploaded files)
//! - Bearer-token protected routes for everything else

pub mod auth;
pub mod babies;
pub mod chat;
pub mod doc;
pub mod health;
pub mod questionnaire;
pub mod settings;

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::services::ServeDir;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{Role, UserRecord, UserStore};
use crate::error::ServerError;
use crate::middleware::auth::AuthIdentity;
use crate::middleware::{auth as auth_middleware, cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .merge(health::router())
        .merge(auth::public_router());

    let protected = Router::new()
        .merge(auth::router())
        .merge(babies::router())
        .merge(questionnaire::router())
        .merge(chat::router())
        .merge(settings::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    let api = Router::new()
        .merge(public)
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir));

    let mut app = Router::new().nest("/api", api);

    // ── Swagger UI ────────────────────────────────────────────────────────────
    // Enabled by default; disable with CRADLE_ENABLE_SWAGGER=false in
    // production to avoid exposing the API structure.
    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(state.clone()))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Shared handler helpers ────────────────────────────────────────────────────

/// Resolve the bearer identity to its user row; 404 when the row vanished.
pub(crate) async fn current_user(
    state: &AppState,
    identity: &AuthIdentity,
) -> Result<UserRecord, ServerError> {
    state
        .store
        .find_user_by_email(&identity.email)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".into()))
}

/// Gate an operation on the admin role.
pub(crate) fn require_admin(user: &UserRecord) -> Result<(), ServerError> {
    match user.role {
        Role::Admin => Ok(()),
        Role::User => Err(ServerError::Forbidden("Unauthorized".into())),
    }
}

// ── Test support ──────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::config::Config;
    use crate::entities::SqliteStore;
    use crate::llm::AnthropicClient;

    /// An `AppState` over a fresh in-memory database.
    pub(crate) async fn test_state() -> Arc<AppState> {
        let store = SqliteStore::connect_in_memory()
            .await
            .expect("in-memory store");
        let config = Config {
            bind_address: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            jwt_secret: "test-secret".into(),
            admin_email: "admin@example.com".into(),
            anthropic_api_key: String::new(),
            anthropic_model: "claude-3-5-sonnet-20241022".into(),
            upload_dir: std::env::temp_dir()
                .join(format!("cradle_test_{}", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            log_level: "info".into(),
            log_json: false,
            cors_allowed_origins: None,
            enable_swagger: false,
            seed_demo_babies: false,
        };
        let llm = AnthropicClient::new("", &config.anthropic_model).expect("client");
        Arc::new(AppState {
            config: Arc::new(config),
            store: Arc::new(store),
            llm: Arc::new(llm),
        })
    }

    /// Register a user through the store and hand back its identity.
    pub(crate) async fn register_user(
        state: &AppState,
        email: &str,
        role: Role,
    ) -> (i64, AuthIdentity) {
        let hash = crate::security::password::hash_password("password").expect("hash");
        let id = state
            .store
            .create_user(email, &hash, role)
            .await
            .expect("create user");
        (
            id,
            AuthIdentity {
                email: email.to_owned(),
            },
        )
    }

    #[tokio::test]
    async fn build_produces_a_router() {
        let state = test_state().await;
        let _router: Router = build(state);
    }
}
