//! Business logic services.
//!
//! - `auth` - Registration, login and bearer tokens
//! - `cart` - Cart operations and the cached cart count
//! - `catalog` - Storefront search as the pipeline sees it
//! - `chat` - The chat turn orchestrator and session history
//! - `checkout` - Moving a cart into purchase history

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod checkout;
