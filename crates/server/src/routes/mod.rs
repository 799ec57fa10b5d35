//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /api                        - Endpoint overview (optional auth)
//!
//! # Auth
//! POST   /api/auth/register          - Create an account, returns a token
//! POST   /api/auth/login             - Exchange credentials for a token
//! GET    /api/auth/me                - Current user
//!
//! # Chat
//! POST   /api/chat/send              - One chat turn
//! GET    /api/chat/history           - Recent messages (?limit, ?sessionId)
//! GET    /api/chat/sessions          - Active sessions
//! POST   /api/chat/sessions          - New empty session
//! GET    /api/chat/sessions/{id}     - Session with messages
//! DELETE /api/chat/sessions/{id}     - Soft delete
//!
//! # Cart
//! GET    /api/cart                   - Items with totals
//! POST   /api/cart, /api/cart/add    - Add or increment
//! DELETE /api/cart                   - Clear
//! GET    /api/cart/count             - Cached count and total
//! PUT    /api/cart/{itemId}          - Set quantity
//! DELETE /api/cart/{itemId}          - Remove
//!
//! # Checkout
//! POST   /api/checkout               - Move the cart into purchase history
//! GET    /api/purchases              - Purchase history
//!
//! # Storefront
//! POST   /api/shopify/search         - Multi-query product search
//! GET    /api/shopify/featured       - Best sellers
//! GET    /api/shopify/product/{handle}
//! GET    /api/shopify/orders/{name}  - Order status (admin token only)
//! GET    /api/shopify/health         - Configuration status
//! ```
//!
//! Everything under `/api` is rate limited per client IP.

pub mod auth;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod index;
pub mod shopify;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::middleware::rate_limit_middleware;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the chat routes router.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/send", post(chat::send))
        .route("/history", get(chat::history))
        .route(
            "/sessions",
            get(chat::list_sessions).post(chat::create_session),
        )
        .route(
            "/sessions/{id}",
            get(chat::get_session).delete(chat::delete_session),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/add", post(cart::add))
        .route("/count", get(cart::count))
        .route("/{item_id}", put(cart::update).delete(cart::remove))
}

/// Create the storefront routes router.
pub fn shopify_routes() -> Router<AppState> {
    Router::new()
        .route("/search", post(shopify::search))
        .route("/featured", get(shopify::featured))
        .route("/product/{handle}", get(shopify::product))
        .route("/orders/{name}", get(shopify::order_status))
        .route("/health", get(shopify::health))
}

/// All `/api` routes, rate limited.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(index::info))
        .nest("/auth", auth_routes())
        .nest("/chat", chat_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .route("/purchases", get(checkout::purchases))
        .nest("/shopify", shopify_routes())
        .layer(middleware::from_fn_with_state(
            state.rate_limiter().clone(),
            rate_limit_middleware,
        ))
}

/// Create all routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api", api_routes(state))
}
