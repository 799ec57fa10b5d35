//! Domain types for Shopify API responses.
//!
//! These types provide a flat, ergonomic shape separate from the raw
//! GraphQL connection/edge structures in `storefront::queries`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Money Types
// =============================================================================

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Decimal amount.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    /// Money in US dollars.
    #[must_use]
    pub fn usd(amount: Decimal) -> Self {
        Self {
            amount,
            currency_code: "USD".to_string(),
        }
    }
}

// =============================================================================
// Product Types
// =============================================================================

/// A product variant (specific combination of options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    /// Variant ID.
    pub id: String,
    /// Variant title (combination of option values).
    pub title: String,
    /// Current price.
    pub price: Money,
    /// Whether this variant is available for sale.
    pub available_for_sale: bool,
}

/// A product in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product GID.
    pub id: String,
    /// Product title.
    pub title: String,
    /// URL handle.
    pub handle: String,
    /// Plain text description.
    pub description: String,
    /// Units in stock across variants, when inventory is tracked.
    pub total_inventory: Option<i64>,
    /// Minimum price among all variants.
    pub price: Money,
    /// First product image.
    pub image_url: Option<String>,
    /// Up to three variants.
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Whether the storefront reports stock on hand.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.total_inventory.is_some_and(|n| n > 0)
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// A line item of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    /// Line item title.
    pub title: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price of the ordered variant, if the variant still exists.
    pub price: Option<Money>,
}

/// Status of an order as reported by the Admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order GID.
    pub id: String,
    /// Order name (e.g., "#1001").
    pub name: String,
    /// Fulfillment status (e.g., "FULFILLED").
    pub fulfillment_status: Option<String>,
    /// Financial status (e.g., "PAID").
    pub financial_status: Option<String>,
    /// Order total.
    pub total_price: Option<Money>,
    /// Up to five line items.
    pub line_items: Vec<OrderLineItem>,
}

// =============================================================================
// Sort Keys
// =============================================================================

/// Sort keys for product queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductSortKey {
    /// Sort by best selling.
    BestSelling,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_money_amount_is_a_string_on_the_wire() {
        let money = Money::usd(Decimal::from_str("19.99").unwrap());
        let json = serde_json::to_value(&money).unwrap();
        assert_eq!(json["amount"], "19.99");
        assert_eq!(json["currencyCode"], "USD");
    }

    #[test]
    fn test_sort_key_serialization() {
        assert_eq!(
            serde_json::to_value(ProductSortKey::BestSelling).unwrap(),
            "BEST_SELLING"
        );
    }
}
