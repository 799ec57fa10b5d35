//! Checkout: move the cart into purchase history.

use sqlx::PgPool;

use shoppy_core::UserId;

use super::cart::{CartCountCache, CartError};
use crate::db::PurchaseRepository;
use crate::models::CheckoutReceipt;

/// Check out the user's cart.
///
/// # Errors
///
/// Returns `CartError::Empty` when there is nothing to buy, or
/// `CartError::Repository` if the transaction fails (the cart is left
/// untouched then).
pub async fn checkout(
    pool: &PgPool,
    cache: &CartCountCache,
    user_id: UserId,
) -> Result<CheckoutReceipt, CartError> {
    let receipt = PurchaseRepository::new(pool)
        .checkout(user_id)
        .await?
        .ok_or(CartError::Empty)?;

    cache.invalidate(user_id).await;
    Ok(receipt)
}
