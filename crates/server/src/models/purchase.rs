//! Purchase history types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shoppy_core::{PurchaseId, PurchaseStatus, UserId};

/// A cart line snapshotted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
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
    /// Shared by every row checked out together.
    pub order_id: String,
    pub status: PurchaseStatus,
    pub purchased_at: DateTime<Utc>,
}

/// Result of a completed checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub purchases: Vec<Purchase>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub order_id: String,
}
