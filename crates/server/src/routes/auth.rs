//! Authentication route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ApiResponse, AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::{AuthService, AuthSession};
use crate::state::AppState;

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email_or_username: String,
    #[serde(default)]
    pub password: String,
}

/// Body of `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
}

/// `POST /api/auth/register`
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterRequest>,
) -> Result<ApiResponse<AuthSession>> {
    if form.email.trim().is_empty() || form.username.trim().is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email, username, and password are required".to_string(),
        ));
    }

    let session = AuthService::new(state.pool(), state.token_keys())
        .register(&form.email, &form.username, &form.password)
        .await?;

    Ok(ApiResponse::with_message(session, "User registered successfully"))
}

/// `POST /api/auth/login`
#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginRequest>,
) -> Result<ApiResponse<AuthSession>> {
    if form.email_or_username.trim().is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email/username and password are required".to_string(),
        ));
    }

    let session = AuthService::new(state.pool(), state.token_keys())
        .login(form.email_or_username.trim(), &form.password)
        .await?;

    tracing::info!(user_id = %session.user.id, "User logged in");
    Ok(ApiResponse::with_message(session, "Login successful"))
}

/// `GET /api/auth/me`
pub async fn me(RequireAuth(user): RequireAuth) -> ApiResponse<MeResponse> {
    ApiResponse::ok(MeResponse { user })
}
