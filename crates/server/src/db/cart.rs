//! Cart repository.
//!
//! Every row satisfies `total = price * quantity` and
//! `(user_id, product_id)` is unique; writes keep both true inside one
//! statement or transaction.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use shoppy_core::money::line_total;
use shoppy_core::{CartItemId, UserId};

use super::RepositoryError;
use crate::models::{CartItem, CartTotals, CartUpsert, NewCartItem};

const CART_COLUMNS: &str = "id, user_id, product_id, product_name, description, price, quantity, \
                            total, image_url, product_url, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    item: CartItem,
    inserted: bool,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All of a user's cart rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Row count and summed totals of a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self, user_id: UserId) -> Result<CartTotals, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        totals_on(&mut conn, user_id).await
    }

    /// Add a product, or increase the quantity of the existing row.
    ///
    /// The stored unit price is refreshed to the one supplied so the row
    /// total stays `price * quantity`. Totals are read in the same
    /// transaction as the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    #[instrument(skip(self, item), fields(user_id = %user_id, product_id = %item.product_id))]
    pub async fn upsert(
        &self,
        user_id: UserId,
        item: &NewCartItem,
    ) -> Result<CartUpsert, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: UpsertRow = sqlx::query_as(&format!(
            r"
            INSERT INTO cart_items
                (user_id, product_id, product_name, description, price, quantity, total,
                 image_url, product_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, product_id) DO UPDATE SET
                quantity = cart_items.quantity + EXCLUDED.quantity,
                price = EXCLUDED.price,
                total = ROUND(EXCLUDED.price * (cart_items.quantity + EXCLUDED.quantity), 2),
                updated_at = NOW()
            RETURNING {CART_COLUMNS}, (xmax = 0) AS inserted
            "
        ))
        .bind(user_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.description.as_deref())
        .bind(item.price)
        .bind(item.quantity)
        .bind(line_total(item.price, item.quantity))
        .bind(item.image_url.as_deref())
        .bind(item.product_url.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let totals = totals_on(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(CartUpsert {
            item: row.item,
            is_update: !row.inserted,
            totals,
        })
    }

    /// Set the quantity of one of the user's rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row does not exist or
    /// belongs to another user.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(CartItem, CartTotals), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let item: Option<CartItem> = sqlx::query_as(&format!(
            r"
            UPDATE cart_items
            SET quantity = $3, total = ROUND(price * $3, 2), updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(item_id)
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let item = item.ok_or(RepositoryError::NotFound)?;
        let totals = totals_on(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok((item, totals))
    }

    /// Delete one of the user's rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row does not exist or
    /// belongs to another user.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn remove(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<CartTotals, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let totals = totals_on(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(totals)
    }

    /// Delete every row of the user's cart, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Totals over the user's rows on an open connection or transaction.
async fn totals_on(
    conn: &mut sqlx::PgConnection,
    user_id: UserId,
) -> Result<CartTotals, RepositoryError> {
    let totals = sqlx::query_as(
        "SELECT COUNT(*) AS count, COALESCE(SUM(total), 0) AS total \
         FROM cart_items WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;

    Ok(totals)
}

/// Rows of a cart read inside an open transaction, locked for update.
pub(crate) async fn lock_cart(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<Vec<CartItem>, RepositoryError> {
    let items = sqlx::query_as(&format!(
        "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 \
         ORDER BY created_at, id FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(items)
}

/// Sum of the row totals of `items`.
#[must_use]
pub fn sum_totals(items: &[CartItem]) -> Decimal {
    items.iter().map(|item| item.total).sum()
}
