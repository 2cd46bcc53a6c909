//! Minimal client for the Anthropic Messages API.
//!
//! Only the request/response subset this server uses is modeled. The call
//! is a single blocking round-trip awaited inside the request handler; no
//! retries, no streaming.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Tokens the model may generate per reply.
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("api key is not a valid header value")]
    InvalidApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx answer from the API; `body` carries the service's error JSON.
    #[error("api returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response contained no text content")]
    EmptyResponse,
}

/// Author of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single turn sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Turn],
}

/// The subset of the response body we read.
#[derive(Debug, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Client holding the authenticated `reqwest` connection pool.
#[derive(Debug)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            api_key.parse().map_err(|_| LlmError::InvalidApiKey)?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            api_base: ANTHROPIC_API_BASE.to_owned(),
            model: model.to_owned(),
        })
    }

    /// One completion round-trip: send the system prompt and the full turn
    /// history, return the first text block of the reply.
    pub async fn create_message(
        &self,
        system: &str,
        messages: &[Turn],
    ) -> Result<String, LlmError> {
        let request = CreateMessageRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: Some(system),
            messages,
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CreateMessageResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_to_the_messages_shape() {
        let turns = vec![
            Turn {
                role: TurnRole::User,
                content: "hello".into(),
            },
            Turn {
                role: TurnRole::Assistant,
                content: "goo goo".into(),
            },
        ];
        let request = CreateMessageRequest {
            model: "claude-3-5-sonnet-20241022",
            max_tokens: MAX_TOKENS,
            system: Some("You are Lily"),
            messages: &turns,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["system"], "You are Lily");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][1]["role"], "assistant");
    }

    #[test]
    fn system_is_omitted_when_absent() {
        let request = CreateMessageRequest {
            model: "m",
            max_tokens: 1,
            system: None,
            messages: &[],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("system").is_none());
    }

    #[test]
    fn response_text_is_extracted_from_first_text_block() {
        let raw = json!({
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "gah!"},
                {"type": "text", "text": "ignored"}
            ]
        });
        let parsed: CreateMessageResponse = serde_json::from_value(raw).unwrap();
        let text = parsed
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .map(|b| b.text)
            .unwrap();
        assert_eq!(text, "gah!");
    }

    #[test]
    fn client_builds_with_empty_key() {
        // An unset key should not panic at startup; the API will reject it.
        assert!(AnthropicClient::new("", "claude-3-5-sonnet-20241022").is_ok());
    }
}
