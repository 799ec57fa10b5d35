//! Unified error handling and the JSON response envelope.
//!
//! Every response body is `{ success, data?, message?, error?, timestamp }`.
//! Handlers return `Result<ApiResponse<T>, AppError>`; errors are captured
//! to Sentry before responding when they indicate a server-side fault.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::sensay::SensayError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::chat::ChatError;
use crate::shopify::ShopifyError;

/// Whether internal error messages are returned verbatim (development only).
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Enable or disable raw internal error messages in responses.
///
/// Called once at startup from the configured environment.
pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Conversational AI operation failed.
    #[error("Sensay error: {0}")]
    Sensay(#[from] SensayError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated user may not access the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Request conflicts with existing state.
    #[error("{0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Too many requests, please try again later")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(_) | Self::Sensay(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername(_)
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenEncoding => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        let status = self.status();
        if status.is_server_error() && !matches!(self, Self::Shopify(_) | Self::Sensay(_)) {
            if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
                return self.to_string();
            }
            return "Internal server error".to_string();
        }

        match self {
            Self::Shopify(_) | Self::Sensay(_) => "External service error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::InvalidToken | AuthError::TokenExpired => {
                    "Invalid or expired token".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "User already exists with this email or username".to_string()
                }
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidUsername(e) => format!("Invalid username: {e}"),
                AuthError::WeakPassword(msg) => msg.clone(),
                _ => "Authentication error".to_string(),
            },
            _ => self.to_string(),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Invalid(msg) => Self::BadRequest(msg),
            CartError::Empty => Self::BadRequest(err.to_string()),
            CartError::ItemNotFound => Self::NotFound(err.to_string()),
            CartError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => Self::BadRequest(err.to_string()),
            ChatError::SessionNotFound => Self::NotFound(err.to_string()),
            ChatError::SessionForbidden => Self::Forbidden(err.to_string()),
            ChatError::Repository(e) => Self::Database(e),
        }
    }
}

/// Error body: `{ success: false, error, timestamp }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    /// Build an error body stamped with the current time.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = ErrorBody::new(self.client_message());
        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimited { retry_after_secs } = self
            && let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}

/// Success envelope: `{ success: true, data?, message?, timestamp }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// Successful response carrying `data` and a human-readable message.
    #[must_use]
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
