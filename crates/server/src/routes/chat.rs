//! Chat route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shoppy_core::{ChatSessionId, UserId};

use crate::error::{ApiResponse, Result};
use crate::middleware::RequireAuth;
use crate::models::{ChatMessage, ChatSession, ChatSessionSummary};
use crate::services::chat::{ChatError, ChatReply, ChatTurn, SessionRef};
use crate::state::AppState;

/// Default and upper bound for `GET /api/chat/history?limit=`.
const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 200;

/// Chat message form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
    pub session_id: Option<SessionRef>,
    #[serde(default)]
    pub is_new_chat: bool,
}

/// History query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub session_id: Option<String>,
}

/// Body of `GET /api/chat/history`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub history: Vec<ChatMessage>,
    pub user_authenticated: bool,
    pub user_id: UserId,
    pub session_id: Option<ChatSessionId>,
}

/// A session with its messages.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

/// `POST /api/chat/send`
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn send(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<SendMessageRequest>,
) -> Result<ApiResponse<ChatReply>> {
    let reply = state
        .chat()
        .send(
            &user,
            ChatTurn {
                message: &form.message,
                session: form.session_id.as_ref(),
                new_chat: form.is_new_chat,
            },
        )
        .await?;
    Ok(ApiResponse::ok(reply))
}

/// `GET /api/chat/history`
///
/// An unknown session is reported as forbidden so ids of other users'
/// sessions cannot be enumerated.
pub async fn history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<ApiResponse<HistoryResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let session_id = match query.session_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<ChatSessionId>()
                .map_err(|_| ChatError::SessionForbidden)?,
        ),
    };

    let history = state
        .chat()
        .history(user.id, session_id, limit)
        .await
        .map_err(|e| match e {
            ChatError::SessionNotFound => ChatError::SessionForbidden,
            other => other,
        })?;

    Ok(ApiResponse::ok(HistoryResponse {
        history,
        user_authenticated: true,
        user_id: user.id,
        session_id,
    }))
}

/// `GET /api/chat/sessions`
pub async fn list_sessions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<ChatSessionSummary>>> {
    let sessions = state.chat().list_sessions(user.id).await?;
    Ok(ApiResponse::ok(sessions))
}

/// `POST /api/chat/sessions`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<ChatSession>> {
    let session = state.chat().create_session(user.id).await?;
    Ok(ApiResponse::with_message(
        session,
        "Chat session created successfully",
    ))
}

/// `GET /api/chat/sessions/{id}`
pub async fn get_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<ChatSessionId>,
) -> Result<ApiResponse<SessionDetail>> {
    let (session, messages) = state
        .chat()
        .session_with_messages(user.id, session_id)
        .await?;
    Ok(ApiResponse::ok(SessionDetail { session, messages }))
}

/// `DELETE /api/chat/sessions/{id}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<ChatSessionId>,
) -> Result<ApiResponse<()>> {
    state.chat().delete_session(user.id, session_id).await?;
    Ok(ApiResponse::with_message((), "Chat session deleted"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_variants() {
        let form: SendMessageRequest =
            serde_json::from_str(r#"{"message":"hi","sessionId":12}"#).unwrap();
        assert_eq!(form.session_id, Some(SessionRef::Id(12)));
        assert!(!form.is_new_chat);

        let form: SendMessageRequest =
            serde_json::from_str(r#"{"message":"hi","sessionId":"new-chat","isNewChat":true}"#)
                .unwrap();
        assert_eq!(form.session_id, Some(SessionRef::Text("new-chat".to_string())));
        assert!(form.is_new_chat);

        let form: SendMessageRequest = serde_json::from_str(r#"{"sessionId":null}"#).unwrap();
        assert!(form.message.is_empty());
        assert!(form.session_id.is_none());
    }
}
