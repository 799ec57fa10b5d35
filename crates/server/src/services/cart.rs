//! Cart operations with a short-lived count cache.
//!
//! Every mutation invalidates the user's cached totals after the
//! database write has committed.

use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use shoppy_core::{CartItemId, UserId};

use crate::db::{CartRepository, RepositoryError};
use crate::models::{CartItem, CartTotals, CartUpsert, NewCartItem};
use crate::pipeline::CartStore;

/// How long a cached count may be served.
const COUNT_TTL: Duration = Duration::from_secs(30);

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Request failed validation.
    #[error("{0}")]
    Invalid(String),

    /// The item does not exist or belongs to another user.
    #[error("Cart item not found")]
    ItemNotFound,

    /// Checkout was requested with nothing in the cart.
    #[error("Cart is empty")]
    Empty,

    /// Repository/database error.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::ItemNotFound,
            other => Self::Repository(other),
        }
    }
}

/// Per-user cart totals cached for [`COUNT_TTL`].
#[derive(Clone)]
pub struct CartCountCache {
    inner: Cache<UserId, CartTotals>,
}

impl Default for CartCountCache {
    fn default() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(COUNT_TTL)
                .build(),
        }
    }
}

impl CartCountCache {
    /// Drop the cached totals for a user.
    pub async fn invalidate(&self, user_id: UserId) {
        self.inner.invalidate(&user_id).await;
    }
}

/// A user's cart with its totals.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CartContents {
    pub items: Vec<CartItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub count: i64,
}

/// Cart service.
pub struct CartService<'a> {
    repo: CartRepository<'a>,
    cache: &'a CartCountCache,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CartCountCache) -> Self {
        Self {
            repo: CartRepository::new(pool),
            cache,
        }
    }

    /// Every item, newest first, with totals.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn contents(&self, user_id: UserId) -> Result<CartContents, CartError> {
        let items = self.repo.list(user_id).await?;
        let total = items.iter().map(|item| item.total).sum();
        let count = i64::try_from(items.len()).unwrap_or(i64::MAX);
        Ok(CartContents {
            items,
            total,
            count,
        })
    }

    /// Totals, served from cache when fresh. The flag is `true` on a hit.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn totals(&self, user_id: UserId) -> Result<(CartTotals, bool), CartError> {
        if let Some(totals) = self.cache.inner.get(&user_id).await {
            debug!(user_id = %user_id, "Cache hit for cart totals");
            return Ok((totals, true));
        }

        let totals = self.repo.totals(user_id).await?;
        // A write that invalidates between the query and this insert leaves
        // stale totals cached until the TTL (30s) expires.
        self.cache.inner.insert(user_id, totals).await;
        Ok((totals, false))
    }

    /// Add a product or increase its quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Invalid` for a missing id/name, a non-positive
    /// price or a quantity below 1.
    pub async fn add(&self, user_id: UserId, item: NewCartItem) -> Result<CartUpsert, CartError> {
        validate_new_item(&item)?;
        let upsert = self.repo.upsert(user_id, &item).await?;
        self.cache.invalidate(user_id).await;
        Ok(upsert)
    }

    /// Set the quantity of an item.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Invalid` for a quantity below 1 and
    /// `CartError::ItemNotFound` if the item is not the user's.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(CartItem, CartTotals), CartError> {
        if quantity < 1 {
            return Err(CartError::Invalid("Valid quantity is required".to_string()));
        }
        let updated = self.repo.update_quantity(user_id, item_id, quantity).await?;
        self.cache.invalidate(user_id).await;
        Ok(updated)
    }

    /// Remove an item.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the item is not the user's.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<CartTotals, CartError> {
        let totals = self.repo.remove(user_id, item_id).await?;
        self.cache.invalidate(user_id).await;
        Ok(totals)
    }

    /// Remove everything.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, CartError> {
        let removed = self.repo.clear(user_id).await?;
        self.cache.invalidate(user_id).await;
        Ok(removed)
    }
}

impl CartStore for CartService<'_> {
    async fn upsert_item(
        &self,
        user_id: UserId,
        item: NewCartItem,
    ) -> Result<CartUpsert, RepositoryError> {
        let upsert = self.repo.upsert(user_id, &item).await?;
        self.cache.invalidate(user_id).await;
        Ok(upsert)
    }
}

fn validate_new_item(item: &NewCartItem) -> Result<(), CartError> {
    if item.product_id.trim().is_empty()
        || item.product_name.trim().is_empty()
        || item.price <= Decimal::ZERO
    {
        return Err(CartError::Invalid(
            "Product ID, name, and price are required".to_string(),
        ));
    }
    if item.quantity < 1 {
        return Err(CartError::Invalid("Quantity must be at least 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item() -> NewCartItem {
        NewCartItem {
            product_id: "gid://shopify/Product/1".to_string(),
            product_name: "Burgundy V-Neck Tee".to_string(),
            description: None,
            price: Decimal::new(1999, 2),
            quantity: 1,
            image_url: None,
            product_url: None,
        }
    }

    #[test]
    fn test_validate_new_item() {
        assert!(validate_new_item(&item()).is_ok());

        let missing_name = NewCartItem {
            product_name: "  ".to_string(),
            ..item()
        };
        assert!(matches!(
            validate_new_item(&missing_name),
            Err(CartError::Invalid(msg)) if msg == "Product ID, name, and price are required"
        ));

        let free = NewCartItem {
            price: Decimal::ZERO,
            ..item()
        };
        assert!(validate_new_item(&free).is_err());

        let none = NewCartItem {
            quantity: 0,
            ..item()
        };
        assert!(matches!(
            validate_new_item(&none),
            Err(CartError::Invalid(msg)) if msg == "Quantity must be at least 1"
        ));
    }

    #[test]
    fn test_not_found_maps_to_item_not_found() {
        assert!(matches!(
            CartError::from(RepositoryError::NotFound),
            CartError::ItemNotFound
        ));
        assert_eq!(CartError::ItemNotFound.to_string(), "Cart item not found");
    }

    #[tokio::test]
    async fn test_count_cache_invalidation() {
        let cache = CartCountCache::default();
        let user = UserId::new(9);
        let totals = CartTotals {
            count: 2,
            total: Decimal::new(3998, 2),
        };
        cache.inner.insert(user, totals).await;
        assert_eq!(cache.inner.get(&user).await, Some(totals));

        cache.invalidate(user).await;
        assert_eq!(cache.inner.get(&user).await, None);
    }
}
