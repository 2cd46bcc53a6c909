//! Bearer-token authentication middleware.
//!
//! Verifies the `Authorization: Bearer <jwt>` header and injects the token
//! identity as an [`AuthIdentity`] request extension. Role checks happen in
//! the handlers, which re-read the user row on every request.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::security::{verify_token, TokenError};
use crate::state::AppState;

/// The authenticated caller, as asserted by the bearer token.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub email: String,
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let token = match provided {
        Some(token) => token,
        None => return unauthorized("Missing bearer token"),
    };

    match verify_token(token, &state.config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthIdentity { email: claims.sub });
            next.run(req).await
        }
        Err(TokenError::Expired) => unauthorized("Token expired"),
        Err(TokenError::Invalid(_)) => unauthorized("Invalid token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
