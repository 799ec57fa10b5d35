//! Database operations for chat sessions and messages.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use shoppy_core::{ChatMessageId, ChatRole, ChatSessionId, UserId};

use super::RepositoryError;
use crate::models::{ChatMessage, ChatSession, ChatSessionSummary, NewChatMessage};
use crate::pipeline::ShownOption;
use crate::shopify::Product;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for chat message queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: ChatMessageId,
    session_id: ChatSessionId,
    role: ChatRole,
    content: String,
    shopify_products: Option<Json<Vec<Product>>>,
    shown_options: Json<Vec<ShownOption>>,
    created_at: DateTime<Utc>,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            role: row.role,
            content: row.content,
            shopify_products: row.shopify_products.map(|Json(products)| products),
            shown_options: row.shown_options.0,
            timestamp: row.created_at,
        }
    }
}

const SESSION_COLUMNS: &str = "id, user_id, title, is_active, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, session_id, role, content, shopify_products, shown_options, created_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for chat database operations.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Create a new active session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn create_session(
        &self,
        user_id: UserId,
        title: &str,
    ) -> Result<ChatSession, RepositoryError> {
        let session = sqlx::query_as(&format!(
            "INSERT INTO chat_sessions (user_id, title) VALUES ($1, $2) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(title)
        .fetch_one(self.pool)
        .await?;

        Ok(session)
    }

    /// Get a session by ID, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_session(
        &self,
        id: ChatSessionId,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        let session = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// A user's active sessions, most recently updated first, with message
    /// counts and the latest message text.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sessions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ChatSessionSummary>, RepositoryError> {
        let sessions = sqlx::query_as(
            r"
            SELECT s.id, s.title, s.created_at, s.updated_at,
                   (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id)
                       AS message_count,
                   (SELECT m.content FROM chat_messages m WHERE m.session_id = s.id
                    ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_message
            FROM chat_sessions s
            WHERE s.user_id = $1 AND s.is_active
            ORDER BY s.updated_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(sessions)
    }

    /// Bump a session's `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_session(&self, id: ChatSessionId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Soft-delete one of the user's active sessions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no active session with this ID
    /// belongs to the user.
    #[instrument(skip(self), fields(user_id = %user_id, session_id = %id))]
    pub async fn deactivate_session(
        &self,
        user_id: UserId,
        id: ChatSessionId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_active",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Append a message to a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_message(
        &self,
        message: &NewChatMessage<'_>,
    ) -> Result<ChatMessage, RepositoryError> {
        let row: ChatMessageRow = sqlx::query_as(&format!(
            r"
            INSERT INTO chat_messages (session_id, role, content, shopify_products, shown_options)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(message.session_id)
        .bind(message.role)
        .bind(message.content)
        .bind(message.shopify_products.map(Json))
        .bind(Json(message.shown_options))
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// The latest `limit` messages of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_messages(
        &self,
        session_id: ChatSessionId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows: Vec<ChatMessageRow> = sqlx::query_as(&format!(
            r"
            SELECT {MESSAGE_COLUMNS} FROM (
                SELECT {MESSAGE_COLUMNS} FROM chat_messages
                WHERE session_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            ) latest
            ORDER BY created_at, id
            "
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    /// The latest `limit` messages across all of a user's active sessions,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_messages_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows: Vec<ChatMessageRow> = sqlx::query_as(&format!(
            r"
            SELECT {MESSAGE_COLUMNS} FROM (
                SELECT m.id, m.session_id, m.role, m.content, m.shopify_products,
                       m.shown_options, m.created_at
                FROM chat_messages m
                JOIN chat_sessions s ON s.id = m.session_id
                WHERE s.user_id = $1 AND s.is_active
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT $2
            ) latest
            ORDER BY created_at, id
            "
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    /// Options listed by the most recent assistant message of the session
    /// that listed any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn last_shown_options(
        &self,
        session_id: ChatSessionId,
    ) -> Result<Vec<ShownOption>, RepositoryError> {
        let options: Option<Json<Vec<ShownOption>>> = sqlx::query_scalar(
            r"
            SELECT shown_options FROM chat_messages
            WHERE session_id = $1
              AND role = 'assistant'
              AND jsonb_array_length(shown_options) > 0
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(options.map(|Json(options)| options).unwrap_or_default())
    }
}
