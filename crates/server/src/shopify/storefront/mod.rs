//! Shopify Storefront API client implementation.
//!
//! Uses `graphql_client` request/response envelopes with `reqwest` 0.13 for
//! HTTP. Caches products, best sellers and individual search pages using
//! `moka` (5-minute TTL).

mod cache;
mod conversions;
pub mod queries;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::QueryBody;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use crate::config::ShopifyConfig;
use crate::pipeline::Lexicon;
use crate::retry::{RetryConfig, with_backoff};
use crate::shopify::types::{Product, ProductSortKey};
use crate::shopify::{ShopifyError, post_graphql};

use cache::{CacheValue, featured_key, product_key, search_key};
use conversions::convert_product;
use queries::{
    GET_PRODUCT_BY_HANDLE, PRODUCT_BY_HANDLE_QUERY, ProductByHandleData, ProductByHandleVariables,
    SEARCH_PRODUCTS, SEARCH_PRODUCTS_QUERY, SearchProductsData, SearchProductsVariables,
};
use search::{build_search_queries, per_query_limit};

/// Request timeout for Storefront calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Cheap to clone; all clones share one HTTP pool and cache.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    store_domain: String,
    access_token: SecretString,
    retry: RetryConfig,
    cache: Cache<String, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ShopifyConfig, retry: RetryConfig) -> Result<Self, ShopifyError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(StorefrontClientInner {
                client,
                endpoint: config.storefront_endpoint(),
                store_domain: config.store_domain(),
                access_token: config.storefront_token.clone(),
                retry,
                cache,
            }),
        })
    }

    /// The `*.myshopify.com` domain this client talks to.
    #[must_use]
    pub fn store_domain(&self) -> &str {
        &self.inner.store_domain
    }

    /// Public URL of a product page.
    #[must_use]
    pub fn product_url(&self, handle: &str) -> String {
        format!("https://{}/products/{handle}", self.inner.store_domain)
    }

    /// Execute a GraphQL operation, retrying transient failures.
    async fn execute<V, T>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<T, ShopifyError>
    where
        V: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = QueryBody {
            variables,
            query,
            operation_name,
        };
        let token = self.inner.access_token.expose_secret();

        with_backoff(&self.inner.retry, operation_name, || {
            post_graphql(
                &self.inner.client,
                &self.inner.endpoint,
                ("X-Shopify-Storefront-Access-Token", token),
                &body,
            )
        })
        .await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Run one raw search query (`title:*tee* OR tag:tee`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str, first: usize) -> Result<Vec<Product>, ShopifyError> {
        let cache_key = search_key(query, first);
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for search");
            return Ok(products);
        }

        let variables = SearchProductsVariables {
            query: Some(query.to_string()),
            first: i64::try_from(first).unwrap_or(i64::MAX),
            sort_key: None,
        };
        let data: SearchProductsData = self
            .execute(SEARCH_PRODUCTS, SEARCH_PRODUCTS_QUERY, variables)
            .await?;

        let products: Vec<Product> = data
            .products
            .edges
            .into_iter()
            .map(|edge| convert_product(edge.node))
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Search with several alternative queries built from free `text`.
    ///
    /// Results are merged in query order, de-duplicated by product id, and
    /// truncated to `limit`. A failing query is logged and skipped, so the
    /// worst case is an empty list.
    #[instrument(skip(self, lexicon), fields(text = %text))]
    pub async fn search_multiple(&self, lexicon: &Lexicon, text: &str, limit: usize) -> Vec<Product> {
        let queries = build_search_queries(lexicon, text);
        let first = per_query_limit(limit, queries.len());
        let mut found: Vec<Product> = Vec::with_capacity(limit);

        for query in &queries {
            match self.search(query, first).await {
                Ok(products) => {
                    for product in products {
                        if !found.iter().any(|p| p.id == product.id) {
                            found.push(product);
                        }
                    }
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "Search query failed, skipping");
                }
            }
            if found.len() >= limit {
                break;
            }
        }

        found.truncate(limit);
        debug!(count = found.len(), queries = queries.len(), "Search finished");
        found
    }

    /// Best-selling products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured(&self, limit: usize) -> Result<Vec<Product>, ShopifyError> {
        let cache_key = featured_key(limit);
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let variables = SearchProductsVariables {
            query: None,
            first: i64::try_from(limit).unwrap_or(i64::MAX),
            sort_key: Some(ProductSortKey::BestSelling),
        };
        let data: SearchProductsData = self
            .execute(SEARCH_PRODUCTS, SEARCH_PRODUCTS_QUERY, variables)
            .await?;

        let products: Vec<Product> = data
            .products
            .edges
            .into_iter()
            .map(|edge| convert_product(edge.node))
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if no product has this handle, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = product_key(handle);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let variables = ProductByHandleVariables {
            handle: handle.to_string(),
        };
        let data: ProductByHandleData = self
            .execute(GET_PRODUCT_BY_HANDLE, PRODUCT_BY_HANDLE_QUERY, variables)
            .await?;

        let product = data
            .product
            .map(convert_product)
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }
}
