//! The completion-service collaborator.
//!
//! [`ChatClient`] is the narrow interface the evaluate/rewrite/generate steps
//! depend on; [`OpenAiChatClient`] implements it against any OpenAI-compatible
//! chat-completions endpoint. Non-streaming single responses only.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::message::{Message, Role};

/// Default request timeout for completion calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// A single completion response: plain text or a structured tool call.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatResponse {
    /// Ordinary assistant text.
    Text(String),
    /// The model requested a tool invocation instead of answering.
    ToolCall(ToolCallRequest),
}

impl ChatResponse {
    /// Returns the text content, or `None` for tool calls.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            ChatResponse::Text(text) => Some(text),
            ChatResponse::ToolCall(_) => None,
        }
    }
}

/// A structured tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRequest {
    /// Name of the tool the model wants to invoke.
    pub name: String,
    /// JSON arguments as supplied by the model.
    pub arguments: Value,
}

/// Errors from the completion collaborator.
///
/// All of these are recoverable at the node boundary: nodes degrade per their
/// failure policy instead of letting a completion error abort the pass.
#[derive(Debug, Error, Diagnostic)]
pub enum ChatError {
    /// Transport-level failure, including timeouts.
    #[error("chat request failed: {0}")]
    #[diagnostic(
        code(ragloom::chat::http),
        help("Check network reachability and the configured base URL.")
    )]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status (rate limits included).
    #[error("chat API error (status {status}): {message}")]
    #[diagnostic(code(ragloom::chat::api))]
    Api { status: u16, message: String },

    /// The endpoint answered 2xx but the body did not match the expected shape.
    #[error("malformed chat response: {0}")]
    #[diagnostic(code(ragloom::chat::malformed))]
    MalformedResponse(String),
}

/// The completion service as consumed by the workflow.
///
/// Message roles map onto the provider's wire roles (`human` -> `user`,
/// `ai` -> `assistant`, `system` -> `system`).
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<ChatResponse, ChatError>;
}

/* ---------- wire types ---------- */

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::Human => "user",
            Role::Ai => "assistant",
            Role::System => "system",
        };
        WireMessage {
            role,
            content: msg.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

/* ---------- reqwest implementation ---------- */

/// [`ChatClient`] for OpenAI-compatible chat-completions endpoints.
///
/// Requests are non-streaming with temperature 0, and carry a client-side
/// timeout so a hung endpoint cannot stall a pass indefinitely.
#[derive(Clone, Debug)]
pub struct OpenAiChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    /// Builds a client against `base_url` (no trailing slash required).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Builds a client from `OPENAI_API_KEY`, `OPENAI_MODEL` and
    /// `OPENAI_BASE_URL`, loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ChatError> {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(base_url, api_key, model)
    }

    /// The model identifier sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, messages: &[Message]) -> Result<ChatResponse, ChatError> {
        let request = WireRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: 0.0,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::MalformedResponse("no choices in response".into()))?;

        if let Some(mut tool_calls) = choice.message.tool_calls {
            if !tool_calls.is_empty() {
                let call = tool_calls.remove(0);
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments));
                return Ok(ChatResponse::ToolCall(ToolCallRequest {
                    name: call.function.name,
                    arguments,
                }));
            }
        }

        match choice.message.content {
            Some(content) => Ok(ChatResponse::Text(content)),
            None => Err(ChatError::MalformedResponse(
                "choice carries neither content nor tool calls".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_to_wire_names() {
        assert_eq!(WireMessage::from(&Message::human("q")).role, "user");
        assert_eq!(WireMessage::from(&Message::ai("a")).role, "assistant");
        assert_eq!(WireMessage::from(&Message::system("s")).role, "system");
    }

    #[test]
    fn into_text_only_for_text_responses() {
        assert_eq!(
            ChatResponse::Text("hi".into()).into_text(),
            Some("hi".into())
        );
        let call = ChatResponse::ToolCall(ToolCallRequest {
            name: "search".into(),
            arguments: Value::Null,
        });
        assert_eq!(call.into_text(), None);
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = OpenAiChatClient::new("http://localhost:1234/", "key", "model").unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
    }
}
