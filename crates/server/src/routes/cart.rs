//! Cart route handlers.
//!
//! Every handler requires a bearer token; items are always scoped to the
//! authenticated user.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shoppy_core::CartItemId;

use crate::error::{ApiResponse, AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CartItem, CartTotals, NewCartItem};
use crate::services::cart::{CartContents, CartService};
use crate::state::AppState;

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub description: Option<String>,
    /// A JSON number or a decimal string.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
}

const fn default_quantity() -> i32 {
    1
}

/// Quantity update form data.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: Option<i32>,
}

/// A written item with the cart aggregates after the write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub item: CartItem,
    #[serde(with = "rust_decimal::serde::float")]
    pub cart_total: Decimal,
    pub cart_count: i64,
}

/// Cart aggregates after a removal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotalsResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub cart_total: Decimal,
    pub cart_count: i64,
}

impl From<CartTotals> for CartTotalsResponse {
    fn from(totals: CartTotals) -> Self {
        Self {
            cart_total: totals.total,
            cart_count: totals.count,
        }
    }
}

/// Body of `GET /api/cart/count`.
#[derive(Debug, Serialize)]
pub struct CartCountResponse {
    pub count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub cached: bool,
}

/// `GET /api/cart`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CartContents>> {
    let contents = CartService::new(state.pool(), state.cart_cache())
        .contents(user.id)
        .await?;
    Ok(ApiResponse::ok(contents))
}

/// `POST /api/cart` and `POST /api/cart/add`
#[instrument(skip(state, user, form), fields(user_id = %user.id, product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<AddToCartRequest>,
) -> Result<ApiResponse<CartItemResponse>> {
    let item = NewCartItem {
        product_id: form.product_id,
        product_name: form.product_name,
        description: form.description,
        price: form.price.unwrap_or_default(),
        quantity: form.quantity,
        image_url: form.image_url,
        product_url: form.product_url,
    };

    let upsert = CartService::new(state.pool(), state.cart_cache())
        .add(user.id, item)
        .await?;

    let message = if upsert.is_update {
        "Item quantity updated in cart"
    } else {
        "Item added to cart"
    };
    Ok(ApiResponse::with_message(
        CartItemResponse {
            item: upsert.item,
            cart_total: upsert.totals.total,
            cart_count: upsert.totals.count,
        },
        message,
    ))
}

/// `PUT /api/cart/{itemId}`
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
    Json(form): Json<UpdateQuantityRequest>,
) -> Result<ApiResponse<CartItemResponse>> {
    let quantity = form
        .quantity
        .ok_or_else(|| AppError::BadRequest("Valid quantity is required".to_string()))?;

    let (item, totals) = CartService::new(state.pool(), state.cart_cache())
        .update_quantity(user.id, item_id, quantity)
        .await?;

    Ok(ApiResponse::with_message(
        CartItemResponse {
            item,
            cart_total: totals.total,
            cart_count: totals.count,
        },
        "Cart item updated",
    ))
}

/// `DELETE /api/cart/{itemId}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<ApiResponse<CartTotalsResponse>> {
    let totals = CartService::new(state.pool(), state.cart_cache())
        .remove(user.id, item_id)
        .await?;
    Ok(ApiResponse::with_message(totals.into(), "Item removed from cart"))
}

/// `DELETE /api/cart`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<()>> {
    let removed = CartService::new(state.pool(), state.cart_cache())
        .clear(user.id)
        .await?;
    tracing::debug!(removed, "Cart cleared");
    Ok(ApiResponse::with_message((), "Cart cleared"))
}

/// `GET /api/cart/count`
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CartCountResponse>> {
    let (totals, cached) = CartService::new(state.pool(), state.cart_cache())
        .totals(user.id)
        .await?;
    Ok(ApiResponse::ok(CartCountResponse {
        count: totals.count,
        total: totals.total,
        cached,
    }))
}
