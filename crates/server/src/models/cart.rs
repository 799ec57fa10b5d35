//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shoppy_core::{CartItemId, UserId};

/// One product line in a user's cart.
///
/// At most one row exists per `(user_id, product_id)`; `total` is always
/// `price * quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    /// Storefront product GID.
    pub product_id: String,
    pub product_name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a product to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
}

/// Live aggregate over a user's cart rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CartTotals {
    /// Number of distinct rows.
    pub count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Outcome of an add-or-increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartUpsert {
    pub item: CartItem,
    /// Whether an existing row was incremented rather than inserted.
    pub is_update: bool,
    /// Totals computed in the same transaction as the write.
    pub totals: CartTotals,
}
