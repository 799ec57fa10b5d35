//! Chat session and message types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shoppy_core::{ChatMessageId, ChatRole, ChatSessionId, UserId};

use crate::pipeline::ShownOption;
use crate::shopify::Product;

/// A persisted conversation.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: ChatSessionId,
    pub user_id: Option<UserId>,
    pub title: String,
    /// Inactive sessions are soft-deleted.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A session as listed in the sidebar.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionSummary {
    pub id: ChatSessionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
    pub last_message: Option<String>,
}

/// One append-only message of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub session_id: ChatSessionId,
    pub role: ChatRole,
    pub content: String,
    /// Products attached to an assistant reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopify_products: Option<Vec<Product>>,
    /// The numbered options this message showed, in display order.
    #[serde(skip)]
    pub shown_options: Vec<ShownOption>,
    pub timestamp: DateTime<Utc>,
}

/// Input for appending a message.
#[derive(Debug, Clone)]
pub struct NewChatMessage<'a> {
    pub session_id: ChatSessionId,
    pub role: ChatRole,
    pub content: &'a str,
    pub shopify_products: Option<&'a [Product]>,
    pub shown_options: &'a [ShownOption],
}
