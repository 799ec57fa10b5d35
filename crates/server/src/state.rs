//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::middleware::RateLimiter;
use crate::pipeline::{Lexicon, Pipeline};
use crate::sensay::{SensayClient, SensayError};
use crate::services::auth::TokenKeys;
use crate::services::cart::CartCountCache;
use crate::services::chat::ChatService;
use crate::shopify::{AdminClient, ShopifyError, StorefrontClient};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("storefront client: {0}")]
    Shopify(#[from] ShopifyError),
    #[error("conversational AI client: {0}")]
    Sensay(#[from] SensayError),
    #[error("lexicon pattern: {0}")]
    Lexicon(#[from] regex::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    storefront: StorefrontClient,
    admin: Option<AdminClient>,
    sensay: SensayClient,
    pipeline: Pipeline,
    token_keys: TokenKeys,
    cart_cache: CartCountCache,
    rate_limiter: RateLimiter,
}

impl AppState {
    /// Build the clients and the pipeline for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or a lexicon
    /// pattern fails to compile.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let storefront = StorefrontClient::new(&config.shopify, config.retry.clone())?;
        let admin = AdminClient::from_config(&config.shopify, config.retry.clone())?;
        let sensay = SensayClient::new(&config.sensay, config.retry.clone())?;
        let pipeline = Pipeline::new(Lexicon::default())?;
        let token_keys = TokenKeys::new(&config.jwt_secret);

        tracing::info!(
            lexicon_version = pipeline.lexicon().version,
            admin_api = admin.is_some(),
            "Application state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storefront,
                admin,
                sensay,
                pipeline,
                token_keys,
                cart_cache: CartCountCache::default(),
                rate_limiter: RateLimiter::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }

    /// The Admin API client, when an admin token is configured.
    #[must_use]
    pub fn admin(&self) -> Option<&AdminClient> {
        self.inner.admin.as_ref()
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    #[must_use]
    pub fn token_keys(&self) -> &TokenKeys {
        &self.inner.token_keys
    }

    #[must_use]
    pub fn cart_cache(&self) -> &CartCountCache {
        &self.inner.cart_cache
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    /// The chat orchestrator bound to this state.
    #[must_use]
    pub fn chat(&self) -> ChatService<'_> {
        ChatService::new(
            &self.inner.pool,
            &self.inner.sensay,
            &self.inner.storefront,
            &self.inner.pipeline,
            &self.inner.cart_cache,
        )
    }
}
