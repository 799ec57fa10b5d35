//! Storefront route handlers.
//!
//! Search, featured and product lookups require a bearer token; the health
//! check does not.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ApiResponse, AppError, Result};
use crate::middleware::RequireAuth;
use crate::shopify::format::format_products_for_chat;
use crate::shopify::{Order, Product, ShopifyError};
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 5;
const DEFAULT_FEATURED_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

/// Search form data.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

/// Featured query parameters.
#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<usize>,
}

/// A product list with its chat rendering.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub count: usize,
    pub formatted_response: String,
}

impl ProductListResponse {
    fn new(state: &AppState, products: Vec<Product>) -> Self {
        let storefront = state.storefront();
        let formatted_response = format_products_for_chat(&products, |handle| storefront.product_url(handle));
        Self {
            count: products.len(),
            products,
            formatted_response,
        }
    }
}

/// Body of `GET /api/shopify/health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<&'static str>,
    pub config: ConfigStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub store_name: String,
    pub has_storefront_token: bool,
    pub has_admin_token: bool,
    pub storefront_url: String,
    pub admin_url: String,
}

/// `POST /api/shopify/search`
#[instrument(skip(state, _user, form), fields(query = %form.query))]
pub async fn search(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(form): Json<SearchRequest>,
) -> Result<ApiResponse<ProductListResponse>> {
    let query = form.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    }
    let limit = form.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_LIMIT);

    let products = state
        .storefront()
        .search_multiple(state.pipeline().lexicon(), query, limit)
        .await;
    Ok(ApiResponse::ok(ProductListResponse::new(&state, products)))
}

/// `GET /api/shopify/featured`
pub async fn featured(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<FeaturedQuery>,
) -> Result<ApiResponse<ProductListResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_FEATURED_LIMIT).clamp(1, MAX_LIMIT);
    let products = state.storefront().featured(limit).await?;
    Ok(ApiResponse::ok(ProductListResponse::new(&state, products)))
}

/// `GET /api/shopify/product/{handle}`
pub async fn product(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(handle): Path<String>,
) -> Result<ApiResponse<Product>> {
    let product = state
        .storefront()
        .product_by_handle(&handle)
        .await
        .map_err(|e| match e {
            ShopifyError::NotFound(_) => AppError::NotFound("Product not found".to_string()),
            other => AppError::Shopify(other),
        })?;
    Ok(ApiResponse::ok(product))
}

/// `GET /api/shopify/orders/{name}`
///
/// Accepts the order name with or without its leading `#`.
pub async fn order_status(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(name): Path<String>,
) -> Result<ApiResponse<Order>> {
    let admin = state
        .admin()
        .ok_or_else(|| AppError::NotFound("Order lookup is not available".to_string()))?;

    let name = if name.starts_with('#') {
        name
    } else {
        format!("#{name}")
    };
    let order = admin.order_status(&name).await.map_err(|e| match e {
        ShopifyError::NotFound(_) => AppError::NotFound("Order not found".to_string()),
        other => AppError::Shopify(other),
    })?;
    Ok(ApiResponse::ok(order))
}

/// `GET /api/shopify/health`
pub async fn health(State(state): State<AppState>) -> Response {
    let shopify = &state.config().shopify;
    let config = ConfigStatus {
        store_name: shopify.store_name.clone(),
        has_storefront_token: !shopify.storefront_token.expose_secret().is_empty(),
        has_admin_token: shopify.admin_token.is_some(),
        storefront_url: shopify.storefront_endpoint(),
        admin_url: shopify.admin_endpoint(),
    };

    let mut missing = Vec::new();
    if config.store_name.trim().is_empty() {
        missing.push("SHOPIFY_STORE_NAME");
    }
    if !config.has_storefront_token {
        missing.push("SHOPIFY_STOREFRONT_TOKEN");
    }

    if missing.is_empty() {
        Json(HealthStatus {
            status: "healthy",
            message: "Shopify service is properly configured",
            missing,
            config,
        })
        .into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthStatus {
                status: "error",
                message: "Missing Shopify configuration",
                missing,
                config,
            }),
        )
            .into_response()
    }
}
