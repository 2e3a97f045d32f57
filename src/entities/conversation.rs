//! Conversation entity - AI estimate-builder chat history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::impl_entity;
use crate::core::identity::{EntityId, EntityPrefix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation; also the wire shape of history entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,

    pub content: String,

    pub timestamp: DateTime<Utc>,

    /// Follow-up prompts offered with an assistant reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            suggestions: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            suggestions,
        }
    }
}

/// A persisted chat with the estimate assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier (CONV-...)
    pub id: EntityId,

    pub title: String,

    /// Estimate used as context for the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_id: Option<EntityId>,

    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    pub owner: String,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,
}

impl_entity!(Conversation, EntityPrefix::Conv, title);

impl Conversation {
    /// Start a conversation titled after its first message
    pub fn start(first_message: &str, estimate_id: Option<EntityId>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Conv),
            title: title_from(first_message),
            estimate_id,
            messages: Vec::new(),
            owner: owner.into(),
            created: now,
            updated: now,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.updated = message.timestamp;
        self.messages.push(message);
    }

    pub fn last_assistant_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
    }
}

fn title_from(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("").trim();
    if first_line.chars().count() > 60 {
        let cut: String = first_line.chars().take(57).collect();
        format!("{}...", cut)
    } else if first_line.is_empty() {
        "Untitled conversation".to_string()
    } else {
        first_line.to_string()
    }
}
