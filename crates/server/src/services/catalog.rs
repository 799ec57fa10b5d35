//! Storefront search bound to the active lexicon.

use crate::pipeline::{Lexicon, ProductSearch};
use crate::shopify::{Product, StorefrontClient};

/// The storefront as seen by the pipeline.
#[derive(Clone, Copy)]
pub struct Catalog<'a> {
    storefront: &'a StorefrontClient,
    lexicon: &'a Lexicon,
}

impl<'a> Catalog<'a> {
    #[must_use]
    pub const fn new(storefront: &'a StorefrontClient, lexicon: &'a Lexicon) -> Self {
        Self {
            storefront,
            lexicon,
        }
    }
}

impl ProductSearch for Catalog<'_> {
    async fn search_multiple(&self, text: &str, limit: usize) -> Vec<Product> {
        self.storefront
            .search_multiple(self.lexicon, text, limit)
            .await
    }

    fn product_url(&self, handle: &str) -> String {
        self.storefront.product_url(handle)
    }
}
