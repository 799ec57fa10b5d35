//! Shopify Storefront and Admin API clients.
//!
//! # Architecture
//!
//! - GraphQL documents are plain strings sent as `graphql_client::QueryBody`
//!   and decoded as `graphql_client::Response`
//! - Shopify is source of truth - NO local sync, direct API calls
//! - In-memory caching via `moka` for API responses (5 minute TTL)
//! - Transient failures (connect/timeout, 5xx, 429) are retried per
//!   [`RetryConfig`](crate::retry::RetryConfig)
//!
//! # APIs
//!
//! ## Storefront API
//! - Product search across several heuristic queries
//! - Best sellers and product detail
//!
//! ## Admin API
//! - Order status lookup (only when an admin token is configured)

mod admin;
pub mod format;
mod storefront;
pub mod types;

pub use admin::AdminClient;
pub use storefront::StorefrontClient;
pub use storefront::search::build_search_queries;
pub use types::*;

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::retry::{Transient, is_transient_transport};

/// Errors that can occur when interacting with Shopify APIs.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Shopify answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The Admin API is not configured.
    #[error("Admin API is not configured")]
    AdminUnavailable,
}

impl Transient for ShopifyError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => is_transient_transport(err),
            Self::Status { status, .. } => status.is_server_error(),
            Self::RateLimited(_) => true,
            Self::GraphQL(_) | Self::Parse(_) | Self::NotFound(_) | Self::AdminUnavailable => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(secs) => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(e: graphql_client::Error) -> Self {
        Self {
            message: e.message,
            locations: e.locations.map_or_else(Vec::new, |locs| {
                locs.into_iter()
                    .map(|l| GraphQLErrorLocation {
                        line: i64::from(l.line),
                        column: i64::from(l.column),
                    })
                    .collect()
            }),
            path: e.path.map_or_else(Vec::new, |p| {
                p.into_iter()
                    .map(|fragment| match fragment {
                        graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                        graphql_client::PathFragment::Index(i) => {
                            serde_json::Value::Number(i.into())
                        }
                    })
                    .collect()
            }),
        }
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// POST one GraphQL operation and decode its `data`.
///
/// `token_header` carries the API-specific access token.
async fn post_graphql<V, T>(
    client: &reqwest::Client,
    endpoint: &str,
    token_header: (&str, &str),
    body: &graphql_client::QueryBody<V>,
) -> Result<T, ShopifyError>
where
    V: Serialize,
    T: DeserializeOwned,
{
    let response = client
        .post(endpoint)
        .header(token_header.0, token_header.1)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ShopifyError::RateLimited(retry_after));
    }

    // Read as text first so failures can be logged with the body
    let response_text = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            operation = body.operation_name,
            body = %response_text.chars().take(500).collect::<String>(),
            "Shopify API returned non-success status"
        );
        return Err(ShopifyError::Status {
            status,
            body: response_text.chars().take(200).collect(),
        });
    }

    let response: graphql_client::Response<T> = serde_json::from_str(&response_text)
        .inspect_err(|e| {
            tracing::error!(
                error = %e,
                operation = body.operation_name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Shopify GraphQL response"
            );
        })?;

    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        tracing::debug!(errors = ?errors, "GraphQL errors in response");
        return Err(ShopifyError::GraphQL(
            errors.into_iter().map(GraphQLError::from).collect(),
        ));
    }

    response.data.ok_or_else(|| {
        ShopifyError::GraphQL(vec![GraphQLError {
            message: "No data in response".to_string(),
            locations: vec![],
            path: vec![],
        }])
    })
}
