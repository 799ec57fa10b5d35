//! Checkout and purchase history handlers.

use axum::extract::State;
use tracing::instrument;

use crate::db::PurchaseRepository;
use crate::error::{ApiResponse, Result};
use crate::middleware::RequireAuth;
use crate::models::{CheckoutReceipt, Purchase};
use crate::services::checkout::checkout as checkout_cart;
use crate::state::AppState;

/// `POST /api/checkout`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<CheckoutReceipt>> {
    let receipt = checkout_cart(state.pool(), state.cart_cache(), user.id).await?;
    Ok(ApiResponse::with_message(
        receipt,
        "Checkout completed successfully",
    ))
}

/// `GET /api/purchases`
pub async fn purchases(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<Purchase>>> {
    let purchases = PurchaseRepository::new(state.pool()).list(user.id).await?;
    Ok(ApiResponse::ok(purchases))
}
