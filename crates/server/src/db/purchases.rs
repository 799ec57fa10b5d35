//! Purchase history repository and the checkout transaction.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use shoppy_core::{PurchaseStatus, UserId};

use super::RepositoryError;
use super::cart::{lock_cart, sum_totals};
use crate::models::{CheckoutReceipt, Purchase};

const PURCHASE_COLUMNS: &str = "id, user_id, product_id, product_name, description, price, \
                                quantity, total, image_url, product_url, order_id, status, \
                                purchased_at";

/// Order identifier shared by every row of one checkout.
#[must_use]
pub fn order_id(user_id: UserId, unix_millis: i64) -> String {
    format!("ORDER_{unix_millis}_{user_id}")
}

/// Repository for purchase history operations.
pub struct PurchaseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PurchaseRepository<'a> {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Move the user's cart into purchase history in one transaction.
    ///
    /// Returns `Ok(None)` when the cart is empty; nothing is written then.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails; no
    /// rows are written or deleted in that case.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn checkout(&self, user_id: UserId) -> Result<Option<CheckoutReceipt>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let items = lock_cart(&mut tx, user_id).await?;
        if items.is_empty() {
            return Ok(None);
        }

        let order_id = order_id(user_id, Utc::now().timestamp_millis());
        let mut purchases: Vec<Purchase> = Vec::with_capacity(items.len());

        for item in &items {
            let purchase = sqlx::query_as(&format!(
                r"
                INSERT INTO purchase_history
                    (user_id, product_id, product_name, description, price, quantity, total,
                     image_url, product_url, order_id, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING {PURCHASE_COLUMNS}
                "
            ))
            .bind(user_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.description.as_deref())
            .bind(item.price)
            .bind(item.quantity)
            .bind(item.total)
            .bind(item.image_url.as_deref())
            .bind(item.product_url.as_deref())
            .bind(&order_id)
            .bind(PurchaseStatus::Completed)
            .fetch_one(&mut *tx)
            .await?;

            purchases.push(purchase);
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let total_amount = sum_totals(&items);
        info!(order_id = %order_id, items = purchases.len(), total = %total_amount, "Checkout committed");

        Ok(Some(CheckoutReceipt {
            purchases,
            total_amount,
            order_id,
        }))
    }

    /// A user's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Purchase>, RepositoryError> {
        let purchases = sqlx::query_as(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchase_history WHERE user_id = $1 \
             ORDER BY purchased_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(purchases)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_format() {
        assert_eq!(
            order_id(UserId::new(42), 1_718_000_000_123),
            "ORDER_1718000000123_42"
        );
    }
}
