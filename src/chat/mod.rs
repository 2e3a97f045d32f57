//! AI estimate assistant - request/response types and the HTTP client
//!
//! The assistant is a remote chat-completion service. It receives the user's
//! message, the conversation so far and a summary of the estimate being
//! discussed, and answers with text, follow-up suggestions and optional
//! structured actions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::ChatConfig;
use crate::cost::rollup::{category_breakdown, CategoryTotal};
use crate::entities::conversation::{ChatMessage, Conversation};
use crate::entities::estimate::Estimate;

#[derive(Debug, Error, miette::Diagnostic)]
pub enum ChatError {
    #[error("no chat endpoint configured")]
    #[diagnostic(
        code(dce::chat::not_configured),
        help("Set chat.endpoint in .dce/config.yaml or DCE_CHAT_ENDPOINT.")
    )]
    NotConfigured,

    #[error("chat service returned HTTP {status}: {body}")]
    #[diagnostic(code(dce::chat::http))]
    Http { status: u16, body: String },

    #[error("could not reach chat service: {0}")]
    #[diagnostic(code(dce::chat::transport))]
    Transport(String),

    #[error("unexpected chat response: {0}")]
    #[diagnostic(code(dce::chat::decode))]
    Decode(String),
}

/// Compact description of the estimate a conversation is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateContext {
    pub id: String,
    pub name: String,
    pub shape: String,
    pub total_cost: f64,
    pub total_labor_hours: f64,
    pub line_count: usize,
    #[serde(default)]
    pub categories: Vec<CategoryTotal>,
}

impl EstimateContext {
    pub fn from_estimate(estimate: &Estimate) -> Self {
        Self {
            id: estimate.id.to_string(),
            name: estimate.name.clone(),
            shape: estimate.body.shape().to_string(),
            total_cost: estimate.total_cost,
            total_labor_hours: estimate.total_labor_hours,
            line_count: estimate.body.line_count(),
            categories: category_breakdown(estimate),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_context: Option<EstimateContext>,
}

/// A structured action proposed by the assistant
///
/// Only `type` is interpreted here; everything else is carried as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub actions: Vec<ChatAction>,
    #[serde(default)]
    pub action_results: Vec<serde_json::Value>,
}

/// Anything that can answer a chat request
pub trait ChatBackend {
    fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;
}

/// Blocking HTTP client for the chat endpoint
pub struct HttpChatClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpChatClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: std::time::Duration) -> Result<Self, ChatError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ChatError::NotConfigured)?;
        Self::new(endpoint, config.api_key.clone(), config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatBackend for HttpChatClient {
    fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            history = request.conversation_history.len(),
            "sending chat request"
        );

        let response = builder
            .send()
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat request failed");
            return Err(ChatError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        tracing::debug!(
            suggestions = reply.suggestions.len(),
            actions = reply.actions.len(),
            "chat reply received"
        );
        Ok(reply)
    }
}

/// Send one message in a conversation and record both sides of the exchange
///
/// The history sent is the conversation before this message. Nothing is
/// recorded when the backend fails.
pub fn converse<B: ChatBackend + ?Sized>(
    backend: &B,
    conversation: &mut Conversation,
    message: &str,
    estimate_context: Option<EstimateContext>,
) -> Result<ChatResponse, ChatError> {
    let request = ChatRequest {
        message: message.to_string(),
        conversation_history: conversation.messages.clone(),
        estimate_context,
    };
    let reply = backend.send(&request)?;

    conversation.push(ChatMessage::user(message));
    conversation.push(ChatMessage::assistant(
        reply.response.clone(),
        reply.suggestions.clone(),
    ));
    Ok(reply)
}
