//! API index handler.

use axum::extract::State;
use serde::Serialize;

use crate::error::ApiResponse;
use crate::middleware::OptionalAuth;
use crate::models::User;
use crate::state::AppState;

/// Public endpoint overview.
const ENDPOINTS: &[&str] = &[
    "POST /api/auth/register",
    "POST /api/auth/login",
    "GET /api/auth/me",
    "POST /api/chat/send",
    "GET /api/chat/history",
    "GET|POST /api/chat/sessions",
    "GET|DELETE /api/chat/sessions/{id}",
    "GET|POST|DELETE /api/cart",
    "POST /api/cart/add",
    "PUT|DELETE /api/cart/{itemId}",
    "GET /api/cart/count",
    "POST /api/checkout",
    "GET /api/purchases",
    "POST /api/shopify/search",
    "GET /api/shopify/featured",
    "GET /api/shopify/product/{handle}",
    "GET /api/shopify/orders/{name}",
    "GET /api/shopify/health",
];

/// Body of `GET /api`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub user_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub order_lookup: bool,
    pub endpoints: &'static [&'static str],
}

impl ApiInfo {
    fn new(user: Option<User>, order_lookup: bool) -> Self {
        Self {
            name: "shoppy",
            version: env!("CARGO_PKG_VERSION"),
            status: "running",
            user_authenticated: user.is_some(),
            user,
            order_lookup,
            endpoints: ENDPOINTS,
        }
    }
}

/// `GET /api`
///
/// A valid bearer token adds the caller to the response; an invalid one is
/// ignored.
pub async fn info(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> ApiResponse<ApiInfo> {
    ApiResponse::ok(ApiInfo::new(user, state.admin().is_some()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_info_omits_user() {
        let body = serde_json::to_value(ApiInfo::new(None, false)).unwrap();
        assert_eq!(body["userAuthenticated"], false);
        assert!(body.get("user").is_none());
        assert_eq!(body["status"], "running");
        assert!(
            body["endpoints"]
                .as_array()
                .unwrap()
                .iter()
                .any(|e| e == "POST /api/chat/send")
        );
    }
}
