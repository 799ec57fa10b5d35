//! Database operations for the chat-commerce `PostgreSQL` database.
//!
//! Shopify is the source of truth for products and orders; this database
//! holds shopper-local state only.
//!
//! ## Tables
//!
//! - `users` - Shopper accounts and their conversational AI identity
//! - `chat_sessions` - Conversations (soft-deleted via `is_active`)
//! - `chat_messages` - Append-only messages with attached products
//! - `cart_items` - One row per `(user_id, product_id)`
//! - `purchase_history` - Cart lines snapshotted at checkout
//! - `api_usage` - Log of conversational AI calls
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p shoppy-cli -- migrate
//! ```

pub mod api_usage;
pub mod cart;
pub mod chat;
pub mod purchases;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use api_usage::{ApiUsageEntry, ApiUsageRepository};
pub use cart::CartRepository;
pub use chat::ChatRepository;
pub use purchases::PurchaseRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Whether `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
