//! Health / heartbeat and schema-initialization endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health, init_db))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(get_health))
        .route("/init-db", get(init_db))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "ok", "version": "..."}` with HTTP 200.
/// Load-balancers and monitoring systems should poll this endpoint.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health() -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Create all tables if absent and seed defaults.
///
/// Idempotent; also runs at startup, so this endpoint mostly matters for
/// fresh deployments pointed at an empty database.
#[utoipa::path(
    get,
    path = "/api/init-db",
    tag = "system",
    responses(
        (status = 200, description = "Schema ready", body = Value),
        (status = 500, description = "Initialization failed"),
    )
)]
pub async fn init_db(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ServerError> {
    state.store.init_schema().await?;
    Ok(Json(json!({ "message": "Database initialized successfully" })))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::routes::test_util::test_state;

    #[tokio::test]
    async fn health_response_has_ok_status() {
        let Json(body) = get_health().await;
        assert_eq!(body["status"], "ok");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn init_db_is_idempotent_over_http() {
        let state = test_state().await;
        let Json(body) = init_db(State(state.clone())).await.unwrap();
        assert_eq!(body["message"], "Database initialized successfully");
        init_db(State(state)).await.unwrap();
    }
}
