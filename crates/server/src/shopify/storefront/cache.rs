//! Cache types for Storefront API responses.

use crate::shopify::types::Product;

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

/// Cache key for one product handle.
pub fn product_key(handle: &str) -> String {
    format!("product:{handle}")
}

/// Cache key for one search sub-query page.
pub fn search_key(query: &str, first: usize) -> String {
    format!("search:{first}:{query}")
}

/// Cache key for the best-seller list.
pub fn featured_key(limit: usize) -> String {
    format!("featured:{limit}")
}
