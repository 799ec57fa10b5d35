//! Match a candidate product to the live catalog and upsert it into a cart.
//!
//! The storefront and the cart store are reached through [`ProductSearch`]
//! and [`CartStore`] so the matching rules can be exercised without I/O.

use std::future::Future;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use shoppy_core::UserId;
use shoppy_core::money::within_tolerance;

use super::extract::CandidateProduct;
use super::lexicon::Lexicon;
use crate::db::RepositoryError;
use crate::models::{CartItem, CartUpsert, NewCartItem};
use crate::shopify::Product;

/// Results requested for a candidate name.
const NAME_SEARCH_LIMIT: usize = 3;
/// Results requested when falling back to color words.
const COLOR_SEARCH_LIMIT: usize = 5;
/// Longest product description copied into a cart row.
const DESCRIPTION_MAX_CHARS: usize = 200;

/// Catalog lookup used by reconciliation and recommendations.
pub trait ProductSearch {
    /// Products matching free `text`, at most `limit`.
    ///
    /// Upstream failures yield an empty list.
    fn search_multiple(
        &self,
        text: &str,
        limit: usize,
    ) -> impl Future<Output = Vec<Product>> + Send;

    /// Public storefront URL for a product handle.
    fn product_url(&self, handle: &str) -> String;
}

/// Transactional cart writes.
pub trait CartStore {
    /// Insert a row or increment the existing `(user, product)` row, returning
    /// totals computed in the same transaction.
    fn upsert_item(
        &self,
        user_id: UserId,
        item: NewCartItem,
    ) -> impl Future<Output = Result<CartUpsert, RepositoryError>> + Send;
}

/// Why a candidate could not be added.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Neither the name nor its color words matched a live product.
    #[error("No matching product found for \"{0}\"")]
    NoMatchingProduct(String),

    /// The cart write failed.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// A candidate that was matched and written to the cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddition {
    pub product: Product,
    pub item: CartItem,
    pub is_update: bool,
    pub cart_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub cart_total: Decimal,
}

/// Resolve `candidate` against the catalog and add one unit to the cart.
///
/// Adding the same resolved product twice increments the existing row.
///
/// # Errors
///
/// Returns [`ReconcileError::NoMatchingProduct`] when no search finds a
/// product, or [`ReconcileError::Store`] when the cart write fails.
#[tracing::instrument(skip_all, fields(user_id = %user_id, candidate = %candidate.name))]
pub async fn add_best_match<S, C>(
    lexicon: &Lexicon,
    search: &S,
    store: &C,
    user_id: UserId,
    candidate: &CandidateProduct,
    original_message: &str,
) -> Result<CartAddition, ReconcileError>
where
    S: ProductSearch + Sync,
    C: CartStore + Sync,
{
    let query = if candidate.name.trim().is_empty() {
        lexicon.product_keywords(original_message).join(" ")
    } else {
        candidate.name.clone()
    };

    let mut products = search.search_multiple(&query, NAME_SEARCH_LIMIT).await;
    if products.is_empty() {
        let colors = lexicon.colors_in(&candidate.name);
        if !colors.is_empty() {
            tracing::debug!(?colors, "Name search empty, retrying with color words");
            products = search.search_multiple(&colors.join(" "), COLOR_SEARCH_LIMIT).await;
        }
    }

    let product = pick_best(products, candidate)
        .ok_or_else(|| ReconcileError::NoMatchingProduct(candidate.name.clone()))?;

    let description: String = product.description.chars().take(DESCRIPTION_MAX_CHARS).collect();
    let new_item = NewCartItem {
        product_id: product.id.clone(),
        product_name: product.title.clone(),
        description: (!description.is_empty()).then_some(description),
        price: product.price.amount,
        quantity: 1,
        image_url: product.image_url.clone(),
        product_url: Some(search.product_url(&product.handle)),
    };

    let upsert = store.upsert_item(user_id, new_item).await?;
    tracing::info!(
        product_id = %product.id,
        is_update = upsert.is_update,
        cart_count = upsert.totals.count,
        "Candidate added to cart"
    );

    Ok(CartAddition {
        product,
        item: upsert.item,
        is_update: upsert.is_update,
        cart_count: upsert.totals.count,
        cart_total: upsert.totals.total,
    })
}

/// A product titled exactly like the candidate, else one within tolerance
/// of a nonzero price hint, else the first result.
fn pick_best(products: Vec<Product>, candidate: &CandidateProduct) -> Option<Product> {
    let name = candidate.name.trim();
    let index = products
        .iter()
        .position(|p| !name.is_empty() && p.title.trim().eq_ignore_ascii_case(name))
        .or_else(|| {
            (candidate.price > Decimal::ZERO)
                .then(|| {
                    products
                        .iter()
                        .position(|p| within_tolerance(p.price.amount, candidate.price))
                })
                .flatten()
        })
        .unwrap_or(0);
    products.into_iter().nth(index)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Mutex;

    use chrono::Utc;
    use shoppy_core::CartItemId;
    use shoppy_core::money::line_total;

    use crate::models::CartTotals;
    use crate::shopify::Money;

    fn product(id: &str, title: &str, price: &str) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            handle: title.to_lowercase().replace(' ', "-"),
            description: "Soft cotton.".to_string(),
            total_inventory: Some(4),
            price: Money::usd(Decimal::from_str(price).unwrap()),
            image_url: None,
            variants: vec![],
        }
    }

    /// Catalog fake: returns every product whose title contains any query word.
    struct FakeCatalog {
        products: Vec<Product>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn new(products: Vec<Product>) -> Self {
            Self {
                products,
                queries: Mutex::new(vec![]),
            }
        }
    }

    impl ProductSearch for FakeCatalog {
        async fn search_multiple(&self, text: &str, limit: usize) -> Vec<Product> {
            self.queries.lock().unwrap().push(text.to_string());
            let words: Vec<String> = text.to_lowercase().split_whitespace().map(String::from).collect();
            self.products
                .iter()
                .filter(|p| {
                    let title = p.title.to_lowercase();
                    words.iter().any(|w| title.contains(w.as_str()))
                })
                .take(limit)
                .cloned()
                .collect()
        }

        fn product_url(&self, handle: &str) -> String {
            format!("https://shop.example/products/{handle}")
        }
    }

    /// In-memory cart keyed by `(user, product)`.
    #[derive(Default)]
    struct MemoryCart {
        rows: Mutex<Vec<CartItem>>,
    }

    impl CartStore for MemoryCart {
        async fn upsert_item(
            &self,
            user_id: UserId,
            item: NewCartItem,
        ) -> Result<CartUpsert, RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let now = Utc::now();
            let existing = rows
                .iter()
                .position(|r| r.user_id == user_id && r.product_id == item.product_id);

            let (row, is_update) = if let Some(row) = existing.and_then(|i| rows.get_mut(i)) {
                row.quantity += item.quantity;
                row.price = item.price;
                row.total = line_total(row.price, row.quantity);
                (row.clone(), true)
            } else {
                let row = CartItem {
                    id: CartItemId::new(i32::try_from(rows.len()).unwrap() + 1),
                    user_id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    description: item.description,
                    price: item.price,
                    quantity: item.quantity,
                    total: line_total(item.price, item.quantity),
                    image_url: item.image_url,
                    product_url: item.product_url,
                    created_at: now,
                    updated_at: now,
                };
                rows.push(row.clone());
                (row, false)
            };

            let mine = rows.iter().filter(|r| r.user_id == user_id);
            let totals = CartTotals {
                count: i64::try_from(mine.clone().count()).unwrap(),
                total: mine.map(|r| r.total).sum(),
            };
            Ok(CartUpsert {
                item: row,
                is_update,
                totals,
            })
        }
    }

    fn candidate(name: &str, price: &str) -> CandidateProduct {
        CandidateProduct {
            name: name.to_string(),
            price: Decimal::from_str(price).unwrap(),
            origin: String::new(),
        }
    }

    #[tokio::test]
    async fn test_new_item_is_inserted_with_live_price() {
        let lexicon = Lexicon::default();
        let catalog = FakeCatalog::new(vec![product("gid://p/1", "Burgundy V-Neck Tee", "19.99")]);
        let cart = MemoryCart::default();

        let added = add_best_match(
            &lexicon,
            &catalog,
            &cart,
            UserId::new(7),
            &candidate("Burgundy Tee", "0"),
            "I want 1 burgundy tee",
        )
        .await
        .unwrap();

        assert!(!added.is_update);
        assert_eq!(added.item.quantity, 1);
        assert_eq!(added.item.total, Decimal::from_str("19.99").unwrap());
        assert_eq!(added.cart_count, 1);
        assert_eq!(
            added.item.product_url.as_deref(),
            Some("https://shop.example/products/burgundy-v-neck-tee")
        );
    }

    #[tokio::test]
    async fn test_repeated_add_increments_single_row() {
        let lexicon = Lexicon::default();
        let catalog = FakeCatalog::new(vec![product("gid://p/1", "Burgundy V-Neck Tee", "19.99")]);
        let cart = MemoryCart::default();
        let user = UserId::new(7);
        let wanted = candidate("Burgundy V-Neck Tee", "0");

        add_best_match(&lexicon, &catalog, &cart, user, &wanted, "")
            .await
            .unwrap();
        let second = add_best_match(&lexicon, &catalog, &cart, user, &wanted, "")
            .await
            .unwrap();

        assert!(second.is_update);
        assert_eq!(second.item.quantity, 2);
        assert_eq!(second.item.total, Decimal::from_str("39.98").unwrap());
        assert_eq!(second.cart_count, 1);
        assert_eq!(cart.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_hint_prefers_close_product() {
        let lexicon = Lexicon::default();
        let catalog = FakeCatalog::new(vec![
            product("gid://p/1", "Navy Tee Premium", "59.00"),
            product("gid://p/2", "Navy Tee Basic", "21.00"),
        ]);
        let cart = MemoryCart::default();

        let added = add_best_match(
            &lexicon,
            &catalog,
            &cart,
            UserId::new(1),
            &candidate("Navy Tee", "19.99"),
            "",
        )
        .await
        .unwrap();

        assert_eq!(added.product.id, "gid://p/2");
    }

    #[tokio::test]
    async fn test_exact_title_beats_price_hint() {
        let lexicon = Lexicon::default();
        let catalog = FakeCatalog::new(vec![
            product("gid://p/1", "Navy Tee Basic", "19.99"),
            product("gid://p/2", "Navy Tee", "35.00"),
        ]);
        let cart = MemoryCart::default();

        let added = add_best_match(
            &lexicon,
            &catalog,
            &cart,
            UserId::new(1),
            &candidate("navy tee", "19.99"),
            "",
        )
        .await
        .unwrap();

        assert_eq!(added.product.id, "gid://p/2");
        assert_eq!(added.item.price, Decimal::from_str("35.00").unwrap());
    }

    #[tokio::test]
    async fn test_falls_back_to_color_words() {
        let lexicon = Lexicon::default();
        let catalog = FakeCatalog::new(vec![product("gid://p/9", "Olive Utility Jacket", "80.00")]);
        let cart = MemoryCart::default();

        let added = add_best_match(
            &lexicon,
            &catalog,
            &cart,
            UserId::new(2),
            &candidate("Olive-Parka", "0"),
            "",
        )
        .await
        .unwrap();

        let queries = catalog.queries.lock().unwrap();
        assert_eq!(*queries, vec!["Olive-Parka".to_string(), "olive".to_string()]);
        assert_eq!(added.product.id, "gid://p/9");
    }

    #[tokio::test]
    async fn test_no_match_writes_nothing() {
        let lexicon = Lexicon::default();
        let catalog = FakeCatalog::new(vec![]);
        let cart = MemoryCart::default();

        let err = add_best_match(
            &lexicon,
            &catalog,
            &cart,
            UserId::new(1),
            &candidate("Red Dress", "0"),
            "",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ReconcileError::NoMatchingProduct(name) if name == "Red Dress"));
        assert!(cart.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_searches_message_keywords() {
        let lexicon = Lexicon::default();
        let catalog = FakeCatalog::new(vec![product("gid://p/3", "Denim Jacket", "70.00")]);
        let cart = MemoryCart::default();

        add_best_match(
            &lexicon,
            &catalog,
            &cart,
            UserId::new(1),
            &candidate("", "0"),
            "I need a jacket for winter",
        )
        .await
        .unwrap();

        assert_eq!(catalog.queries.lock().unwrap().first().unwrap(), "jacket");
    }
}
