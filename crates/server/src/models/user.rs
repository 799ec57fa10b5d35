//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shoppy_core::{Email, UserId, Username};

/// A registered shopper (domain type).
///
/// Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Lowercased username.
    pub username: Username,
    /// Identity at the conversational AI service, created on first chat.
    #[serde(skip)]
    pub sensay_user_id: Option<String>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
