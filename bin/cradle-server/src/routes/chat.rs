//! Chat routes: history retrieval and the model-relay turn.
//!
//! Each (user, persona) pair has an exchange counter capped at
//! [`MESSAGE_CAP`]; every successful turn stores the user message, forwards
//! the full history to the model with a persona system prompt, stores the
//! reply, and advances the counter by two.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;
use tracing::info;
use utoipa::OpenApi;

use crate::entities::{BabyRecord, BabyStore, ChatStore, LifeStage};
use crate::error::ServerError;
use crate::llm::{Turn, TurnRole};
use crate::middleware::auth::AuthIdentity;
use crate::routes::current_user;
use crate::schemas::chat::{
    ChatHistoryMessage, ChatHistoryResponse, SendMessageRequest, SendMessageResponse,
};
use crate::state::AppState;

/// 10 back-and-forths: one user message plus one reply per exchange.
const MESSAGE_CAP: i64 = 20;

#[derive(OpenApi)]
#[openapi(
    paths(get_chat_history, send_message),
    components(schemas(
        ChatHistoryMessage,
        ChatHistoryResponse,
        SendMessageRequest,
        SendMessageResponse
    ))
)]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/{baby_id}", get(get_chat_history).post(send_message))
}

/// Conversation so far with one persona (`GET /api/chat/{baby_id}`).
#[utoipa::path(
    get,
    path = "/api/chat/{baby_id}",
    tag = "chat",
    params(("baby_id" = i64, Path, description = "Persona id")),
    responses(
        (status = 200, description = "History and counter", body = ChatHistoryResponse),
        (status = 404, description = "User row no longer exists"),
    )
)]
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(baby_id): Path<i64>,
) -> Result<Json<ChatHistoryResponse>, ServerError> {
    let user = current_user(&state, &identity).await?;

    let messages = state.store.chat_history(user.id, baby_id).await?;
    let message_count = state.store.message_count(user.id, baby_id).await?;

    Ok(Json(ChatHistoryResponse {
        messages: messages.iter().map(|m| m.to_response()).collect(),
        message_count,
    }))
}

/// One chat turn (`POST /api/chat/{baby_id}`).
///
/// At the cap, the turn is refused with a `limit_reached` body and nothing
/// is written. Otherwise the user message is persisted first; if the model
/// call then fails, that message stays committed and the wrapped failure
/// comes back as a server error.
#[utoipa::path(
    post,
    path = "/api/chat/{baby_id}",
    tag = "chat",
    params(("baby_id" = i64, Path, description = "Persona id")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Reply generated", body = SendMessageResponse),
        (status = 400, description = "Missing message or limit reached"),
        (status = 404, description = "Persona does not exist"),
        (status = 500, description = "Model call failed"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthIdentity>,
    Path(baby_id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, ServerError> {
    let user_message = req.message.unwrap_or_default();
    if user_message.is_empty() {
        return Err(ServerError::BadRequest("Message required".into()));
    }

    let user = current_user(&state, &identity).await?;

    let baby = state
        .store
        .find_baby(baby_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Baby not found".into()))?;

    state.store.ensure_session(user.id, baby_id).await?;
    let message_count = state.store.message_count(user.id, baby_id).await?;
    if message_count >= MESSAGE_CAP {
        // Terminal state: refuse the turn, write nothing.
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Message limit reached",
                "limit_reached": true,
            })),
        )
            .into_response());
    }

    state
        .store
        .append_chat_message(user.id, baby_id, &user_message, "user")
        .await?;

    // Full ordered history, including the message just stored.
    let history = state.store.chat_history(user.id, baby_id).await?;
    let turns: Vec<Turn> = history
        .into_iter()
        .map(|m| Turn {
            role: if m.role == "user" {
                TurnRole::User
            } else {
                TurnRole::Assistant
            },
            content: m.message,
        })
        .collect();

    let system_prompt = persona_prompt(&baby, req.stage.as_ref());
    let reply = state.llm.create_message(&system_prompt, &turns).await?;

    state
        .store
        .append_chat_message(user.id, baby_id, &reply, "assistant")
        .await?;
    let new_count = state.store.bump_message_count(user.id, baby_id).await?;

    info!(
        baby_id,
        message_count = new_count,
        reply_len = reply.len(),
        "chat turn completed"
    );

    Ok(Json(SendMessageResponse {
        message: reply,
        message_count: new_count,
        limit_reached: new_count >= MESSAGE_CAP,
    })
    .into_response())
}

/// Build the persona system prompt, optionally anchored to a life stage.
fn persona_prompt(baby: &BabyRecord, stage: Option<&LifeStage>) -> String {
    let traits = baby.attributes.join(", ");

    match stage {
        Some(stage) => format!(
            "You are {name} at {age}. {description}\n\n\
             Your core traits: {traits}.\n\n\
             Respond as {name} at {age} would - with appropriate language, personality, and behavior for this age.\n\
             Be genuine, stay in character, and keep responses concise and engaging.",
            name = baby.name,
            age = stage.age,
            description = stage.description,
        ),
        None => format!(
            "You are {name}, a {age} baby with the following traits: {traits}.\n\n\
             Respond as this baby would - with appropriate language, personality, and behavior for their age and attributes.\n\
             Be playful, genuine, and stay in character. Keep responses concise and engaging.",
            name = baby.name,
            age = baby.age,
        ),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::Role;
    use crate::routes::test_util::{register_user, test_state};
    use chrono::Utc;

    fn lily() -> BabyRecord {
        BabyRecord {
            id: 1,
            name: "Lily".into(),
            age: "6 months".into(),
            attributes: vec!["smart".into(), "curious".into(), "giggly".into()],
            image_path: None,
            is_visible: true,
            life_stages: Vec::new(),
            user_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn default_prompt_uses_persona_fields() {
        let prompt = persona_prompt(&lily(), None);
        assert!(prompt.starts_with("You are Lily, a 6 months baby"));
        assert!(prompt.contains("smart, curious, giggly"));
        assert!(prompt.contains("Be playful"));
    }

    #[test]
    fn stage_prompt_overrides_age_and_description() {
        let stage = LifeStage {
            age: "5 years".into(),
            description: "Starting school, full of questions.".into(),
            image_path: None,
        };
        let prompt = persona_prompt(&lily(), Some(&stage));
        assert!(prompt.starts_with("You are Lily at 5 years."));
        assert!(prompt.contains("Starting school, full of questions."));
        assert!(prompt.contains("smart, curious, giggly"));
        assert!(!prompt.contains("6 months"));
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let state = test_state().await;
        let (_, user) = register_user(&state, "a@example.com", Role::User).await;

        let err = send_message(
            State(state),
            Extension(user),
            Path(1),
            Json(SendMessageRequest {
                message: None,
                stage: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unknown_persona_is_rejected() {
        let state = test_state().await;
        let (_, user) = register_user(&state, "a@example.com", Role::User).await;

        let err = send_message(
            State(state),
            Extension(user),
            Path(999),
            Json(SendMessageRequest {
                message: Some("hello".into()),
                stage: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn capped_session_refuses_the_turn_without_writes() {
        let state = test_state().await;
        let (user_id, user) = register_user(&state, "a@example.com", Role::User).await;
        let attrs = vec!["curious".to_string()];
        let baby = state
            .store
            .create_baby("Lily", "6 months", &attrs, None, None)
            .await
            .unwrap();

        state.store.ensure_session(user_id, baby).await.unwrap();
        for _ in 0..10 {
            state.store.bump_message_count(user_id, baby).await.unwrap();
        }

        let response = send_message(
            State(state.clone()),
            Extension(user),
            Path(baby),
            Json(SendMessageRequest {
                message: Some("one more?".into()),
                stage: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // No message rows were written and the counter stands still.
        assert!(state.store.chat_history(user_id, baby).await.unwrap().is_empty());
        assert_eq!(state.store.message_count(user_id, baby).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn history_starts_empty_with_zero_count() {
        let state = test_state().await;
        let (_, user) = register_user(&state, "a@example.com", Role::User).await;

        let Json(body) = get_chat_history(State(state), Extension(user), Path(42))
            .await
            .unwrap();
        assert!(body.messages.is_empty());
        assert_eq!(body.message_count, 0);
    }
}
